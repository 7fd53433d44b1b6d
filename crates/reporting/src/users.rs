//! Advertiser KPIs derived from ad snapshots — distinct advertiser
//! counts, newcomers versus the previous snapshot, and a per-residential
//! advertiser breakdown.

use crate::ads::residential_bucket;
use crate::period::{calculate_change, Change};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use vecivendo_core::types::Ad;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserKpis {
    pub active_advertisers: usize,
    pub active_advertisers_previous: usize,
    pub active_advertisers_change: Change,
    /// Advertisers present now but absent from the previous snapshot.
    pub new_advertisers: usize,
    /// Residential id -> distinct advertiser count.
    pub advertisers_by_residential: HashMap<String, usize>,
}

fn advertiser_ids(ads: &[Ad]) -> HashSet<String> {
    ads.iter()
        .filter_map(|ad| ad.anunciante_id.as_ref())
        .map(|r| r.id().to_string())
        .collect()
}

pub fn calculate_user_kpis(ads: &[Ad], previous_ads: &[Ad]) -> UserKpis {
    let current = advertiser_ids(ads);
    let previous = advertiser_ids(previous_ads);

    let new_advertisers = current.difference(&previous).count();

    let mut by_residential: HashMap<String, HashSet<String>> = HashMap::new();
    for ad in ads {
        let Some(advertiser) = ad.anunciante_id.as_ref() else {
            continue;
        };
        by_residential
            .entry(residential_bucket(ad))
            .or_default()
            .insert(advertiser.id().to_string());
    }
    let advertisers_by_residential = by_residential
        .into_iter()
        .map(|(residential, advertisers)| (residential, advertisers.len()))
        .collect();

    UserKpis {
        active_advertisers: current.len(),
        active_advertisers_previous: previous.len(),
        active_advertisers_change: calculate_change(current.len() as f64, previous.len() as f64),
        new_advertisers,
        advertisers_by_residential,
    }
}
