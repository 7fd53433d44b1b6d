//! Quality KPIs from buyer reviews — counts, average rating, and the
//! rating histogram. Change on the average is computed from the unrounded
//! means; only the reported values are rounded to one decimal.

use crate::period::{calculate_change, Change};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vecivendo_core::types::Review;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityKpis {
    pub total_reviews: usize,
    pub total_reviews_previous: usize,
    pub total_reviews_change: Change,
    pub avg_rating: f64,
    pub avg_rating_previous: f64,
    pub avg_rating_change: Change,
    /// Rating value -> review count.
    pub rating_distribution: HashMap<i64, usize>,
}

fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    reviews.iter().map(|r| r.puntuacion as f64).sum::<f64>() / reviews.len() as f64
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn calculate_quality_kpis(reviews: &[Review], previous_reviews: &[Review]) -> QualityKpis {
    let avg = mean_rating(reviews);
    let previous_avg = mean_rating(previous_reviews);

    let mut rating_distribution: HashMap<i64, usize> = HashMap::new();
    for review in reviews {
        *rating_distribution.entry(review.puntuacion).or_insert(0) += 1;
    }

    QualityKpis {
        total_reviews: reviews.len(),
        total_reviews_previous: previous_reviews.len(),
        total_reviews_change: calculate_change(
            reviews.len() as f64,
            previous_reviews.len() as f64,
        ),
        avg_rating: round_one_decimal(avg),
        avg_rating_previous: round_one_decimal(previous_avg),
        avg_rating_change: calculate_change(avg, previous_avg),
        rating_distribution,
    }
}
