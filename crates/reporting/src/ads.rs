//! Ad KPIs — active/inactive counts, category and residential breakdowns,
//! expiring-soon count, and overall growth.

use crate::period::{calculate_change, Change};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vecivendo_core::types::Ad;

pub const UNCATEGORIZED_BUCKET: &str = "Sin categoría";
pub const NO_RESIDENTIAL_BUCKET: &str = "Sin residencial";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdKpis {
    pub total_active: usize,
    pub total_active_previous: usize,
    pub total_active_change: Change,
    pub total_inactive: usize,
    pub total_inactive_change: Change,
    /// Category display name -> ad count.
    pub ads_by_category: HashMap<String, usize>,
    /// Residential id -> ad count.
    pub ads_by_residential: HashMap<String, usize>,
    /// Ads whose validity expires within the configured window from now.
    pub expiring_ads: usize,
    /// Total ad count comparison across the two snapshots.
    pub growth_rate: Change,
}

/// Resolve the category bucket for one ad: first element of `categorias`
/// wins, then the legacy singular `categoria`, then the uncategorized
/// bucket. Empty resolved names count as uncategorized.
fn category_bucket(ad: &Ad, category_names: &HashMap<String, String>) -> String {
    let resolved = if let Some(first) = ad.categorias.first() {
        first.resolve_name(category_names)
    } else if let Some(legacy) = &ad.categoria {
        legacy.resolve_name(category_names)
    } else {
        None
    };

    resolved
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNCATEGORIZED_BUCKET.to_string())
}

pub(crate) fn residential_bucket(ad: &Ad) -> String {
    ad.residencial_id
        .as_ref()
        .map(|r| r.id().to_string())
        .unwrap_or_else(|| NO_RESIDENTIAL_BUCKET.to_string())
}

pub fn calculate_ad_kpis(
    ads: &[Ad],
    previous_ads: &[Ad],
    category_names: &HashMap<String, String>,
    now: DateTime<Utc>,
    expiring_window_days: i64,
) -> AdKpis {
    let total_active = ads.iter().filter(|ad| ad.activo).count();
    let previous_active = previous_ads.iter().filter(|ad| ad.activo).count();
    let total_inactive = ads.len() - total_active;
    let previous_inactive = previous_ads.len() - previous_active;

    let mut ads_by_category: HashMap<String, usize> = HashMap::new();
    let mut ads_by_residential: HashMap<String, usize> = HashMap::new();
    for ad in ads {
        *ads_by_category
            .entry(category_bucket(ad, category_names))
            .or_insert(0) += 1;
        *ads_by_residential.entry(residential_bucket(ad)).or_insert(0) += 1;
    }

    // An ad expires at $updatedAt + dias_vigencia days; count it when that
    // instant falls within [now, now + window]. Both fields must be
    // present and the validity window must be positive.
    let horizon = now + Duration::days(expiring_window_days);
    let expiring_ads = ads
        .iter()
        .filter(|ad| match (ad.updated_at, ad.dias_vigencia) {
            (Some(updated), Some(days)) if days > 0 => {
                let expiry = updated + Duration::days(days);
                expiry >= now && expiry <= horizon
            }
            _ => false,
        })
        .count();

    AdKpis {
        total_active,
        total_active_previous: previous_active,
        total_active_change: calculate_change(total_active as f64, previous_active as f64),
        total_inactive,
        total_inactive_change: calculate_change(total_inactive as f64, previous_inactive as f64),
        ads_by_category,
        ads_by_residential,
        expiring_ads,
        growth_rate: calculate_change(ads.len() as f64, previous_ads.len() as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Trend;
    use serde_json::json;

    fn ad(value: serde_json::Value) -> Ad {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_active_counts_against_identical_snapshot() {
        let ads = vec![
            ad(json!({"$id": "a1", "activo": true})),
            ad(json!({"$id": "a2", "activo": true})),
            ad(json!({"$id": "a3", "activo": false})),
        ];

        let kpis = calculate_ad_kpis(&ads, &ads, &HashMap::new(), Utc::now(), 7);

        assert_eq!(kpis.total_active, 2);
        assert_eq!(kpis.total_active_change.percentage, 0.0);
        assert_eq!(kpis.total_active_change.trend, Trend::Neutral);
        assert_eq!(kpis.total_inactive, 1);
    }

    #[test]
    fn test_category_resolution_order() {
        let mut names = HashMap::new();
        names.insert("cat-2".to_string(), "Servicios".to_string());

        let ads = vec![
            // Inline expanded object in the plural list.
            ad(json!({"$id": "a1", "categorias": [{"$id": "cat-1", "nombre": "Comida"}]})),
            // Bare id resolved through the name map.
            ad(json!({"$id": "a2", "categorias": ["cat-2"]})),
            // Bare id with no map entry falls back to the id itself.
            ad(json!({"$id": "a3", "categorias": ["cat-9"]})),
            // Legacy singular field.
            ad(json!({"$id": "a4", "categoria": {"$id": "cat-1", "nombre": "Comida"}})),
            // Nothing resolvable.
            ad(json!({"$id": "a5"})),
        ];

        let kpis = calculate_ad_kpis(&ads, &ads, &names, Utc::now(), 7);

        assert_eq!(kpis.ads_by_category["Comida"], 2);
        assert_eq!(kpis.ads_by_category["Servicios"], 1);
        assert_eq!(kpis.ads_by_category["cat-9"], 1);
        assert_eq!(kpis.ads_by_category[UNCATEGORIZED_BUCKET], 1);
    }

    #[test]
    fn test_category_counts_sum_to_total() {
        let ads = vec![
            ad(json!({"$id": "a1", "categorias": ["cat-1"]})),
            ad(json!({"$id": "a2", "categorias": ["cat-2"]})),
            ad(json!({"$id": "a3", "categoria": "cat-1"})),
        ];

        let kpis = calculate_ad_kpis(&ads, &ads, &HashMap::new(), Utc::now(), 7);

        let bucketed: usize = kpis.ads_by_category.values().sum();
        assert_eq!(bucketed, ads.len());
        assert!(!kpis.ads_by_category.contains_key(UNCATEGORIZED_BUCKET));
    }

    #[test]
    fn test_residential_breakdown() {
        let ads = vec![
            ad(json!({"$id": "a1", "residencial_id": "res-1"})),
            ad(json!({"$id": "a2", "residencial_id": {"$id": "res-1", "nombre": "Los Pinos"}})),
            ad(json!({"$id": "a3"})),
        ];

        let kpis = calculate_ad_kpis(&ads, &ads, &HashMap::new(), Utc::now(), 7);

        assert_eq!(kpis.ads_by_residential["res-1"], 2);
        assert_eq!(kpis.ads_by_residential[NO_RESIDENTIAL_BUCKET], 1);
    }

    #[test]
    fn test_expiring_window() {
        let now = Utc::now();
        let yesterday = (now - Duration::days(1)).to_rfc3339();
        let ten_days_ago = (now - Duration::days(10)).to_rfc3339();
        let tomorrow = (now + Duration::days(1)).to_rfc3339();

        let ads = vec![
            // Expires at now + 7d: inside the window.
            ad(json!({"$id": "a1", "$updatedAt": yesterday, "dias_vigencia": 8})),
            // Expired before now.
            ad(json!({"$id": "a2", "$updatedAt": ten_days_ago, "dias_vigencia": 5})),
            // Expires beyond the window.
            ad(json!({"$id": "a3", "$updatedAt": yesterday, "dias_vigencia": 30})),
            // Missing validity: never counted.
            ad(json!({"$id": "a4", "$updatedAt": yesterday})),
            // Zero-day validity: never counted, even with the timestamp
            // ahead of the clock.
            ad(json!({"$id": "a5", "$updatedAt": tomorrow, "dias_vigencia": 0})),
        ];

        let kpis = calculate_ad_kpis(&ads, &ads, &HashMap::new(), now, 7);
        assert_eq!(kpis.expiring_ads, 1);
    }

    #[test]
    fn test_growth_rate_between_snapshots() {
        let current = vec![
            ad(json!({"$id": "a1", "activo": true})),
            ad(json!({"$id": "a2", "activo": true})),
        ];
        let previous = vec![ad(json!({"$id": "a1", "activo": true}))];

        let kpis = calculate_ad_kpis(&current, &previous, &HashMap::new(), Utc::now(), 7);
        assert_eq!(kpis.growth_rate.percentage, 100.0);
        assert_eq!(kpis.growth_rate.trend, Trend::Up);
    }
}
