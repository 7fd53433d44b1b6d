//! Engagement KPIs — views, clicks, unique sessions, CTR, and the device
//! breakdown. Inputs are already date-filtered by the caller.

use crate::period::{calculate_change, Change};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use vecivendo_core::types::{EngagementLog, LOG_TYPE_CLICK, LOG_TYPE_VIEW};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementKpis {
    pub total_views: usize,
    pub total_views_previous: usize,
    pub total_views_change: Change,
    pub unique_views: usize,
    pub unique_views_previous: usize,
    pub unique_views_change: Change,
    pub total_clicks: usize,
    pub total_clicks_previous: usize,
    pub total_clicks_change: Change,
    pub ctr: f64,
    pub ctr_previous: f64,
    pub ctr_change: Change,
    /// Device type -> event count over the full current log set.
    pub device_breakdown: HashMap<String, usize>,
}

fn distinct_sessions<'a>(logs: impl Iterator<Item = &'a EngagementLog>) -> usize {
    logs.map(|log| log.session_id.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

fn click_through_rate(clicks: usize, views: usize) -> f64 {
    if views > 0 {
        clicks as f64 / views as f64 * 100.0
    } else {
        0.0
    }
}

pub fn calculate_engagement_kpis(
    logs: &[EngagementLog],
    previous_logs: &[EngagementLog],
) -> EngagementKpis {
    let views: Vec<&EngagementLog> = logs.iter().filter(|l| l.kind == LOG_TYPE_VIEW).collect();
    let clicks = logs.iter().filter(|l| l.kind == LOG_TYPE_CLICK).count();
    let previous_views: Vec<&EngagementLog> = previous_logs
        .iter()
        .filter(|l| l.kind == LOG_TYPE_VIEW)
        .collect();
    let previous_clicks = previous_logs
        .iter()
        .filter(|l| l.kind == LOG_TYPE_CLICK)
        .count();

    let unique_views = distinct_sessions(views.iter().copied());
    let previous_unique_views = distinct_sessions(previous_views.iter().copied());

    let ctr = click_through_rate(clicks, views.len());
    let previous_ctr = click_through_rate(previous_clicks, previous_views.len());

    let mut device_breakdown: HashMap<String, usize> = HashMap::new();
    for log in logs {
        let device = log.device_type.clone().unwrap_or_else(|| "unknown".to_string());
        *device_breakdown.entry(device).or_insert(0) += 1;
    }

    EngagementKpis {
        total_views: views.len(),
        total_views_previous: previous_views.len(),
        total_views_change: calculate_change(views.len() as f64, previous_views.len() as f64),
        unique_views,
        unique_views_previous: previous_unique_views,
        unique_views_change: calculate_change(unique_views as f64, previous_unique_views as f64),
        total_clicks: clicks,
        total_clicks_previous: previous_clicks,
        total_clicks_change: calculate_change(clicks as f64, previous_clicks as f64),
        ctr,
        ctr_previous: previous_ctr,
        ctr_change: calculate_change(ctr, previous_ctr),
        device_breakdown,
    }
}
