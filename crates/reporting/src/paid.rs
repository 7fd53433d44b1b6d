//! Paid-ad KPIs — active sponsored listings plus impression/click
//! performance from logs already attributed to paid ads by the caller.

use crate::period::{calculate_change, Change};
use serde::{Deserialize, Serialize};
use vecivendo_core::types::{EngagementLog, PaidAd, LOG_TYPE_CLICK, LOG_TYPE_VIEW};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidAdKpis {
    pub active_paid_ads: usize,
    pub active_paid_ads_previous: usize,
    pub active_paid_ads_change: Change,
    pub impressions: usize,
    pub impressions_previous: usize,
    pub impressions_change: Change,
    pub ctr: f64,
    pub ctr_previous: f64,
    pub ctr_change: Change,
}

fn period_rates(logs: &[EngagementLog]) -> (usize, usize, f64) {
    let impressions = logs.iter().filter(|l| l.kind == LOG_TYPE_VIEW).count();
    let clicks = logs.iter().filter(|l| l.kind == LOG_TYPE_CLICK).count();
    let ctr = if impressions > 0 {
        clicks as f64 / impressions as f64 * 100.0
    } else {
        0.0
    };
    (impressions, clicks, ctr)
}

pub fn calculate_paid_ad_kpis(
    paid_ads: &[PaidAd],
    paid_logs: &[EngagementLog],
    previous_paid_ads: &[PaidAd],
    previous_paid_logs: &[EngagementLog],
) -> PaidAdKpis {
    let active = paid_ads.iter().filter(|ad| ad.activo).count();
    let previous_active = previous_paid_ads.iter().filter(|ad| ad.activo).count();

    let (impressions, _, ctr) = period_rates(paid_logs);
    let (previous_impressions, _, previous_ctr) = period_rates(previous_paid_logs);

    PaidAdKpis {
        active_paid_ads: active,
        active_paid_ads_previous: previous_active,
        active_paid_ads_change: calculate_change(active as f64, previous_active as f64),
        impressions,
        impressions_previous: previous_impressions,
        impressions_change: calculate_change(impressions as f64, previous_impressions as f64),
        ctr,
        ctr_previous: previous_ctr,
        ctr_change: calculate_change(ctr, previous_ctr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Trend;
    use serde_json::json;

    fn paid_ad(value: serde_json::Value) -> PaidAd {
        serde_json::from_value(value).unwrap()
    }

    fn log(value: serde_json::Value) -> EngagementLog {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_active_counts_and_ctr() {
        let ads = vec![
            paid_ad(json!({"$id": "p1", "activo": true})),
            paid_ad(json!({"$id": "p2", "activo": false})),
        ];
        let logs = vec![
            log(json!({"type": "view", "anuncioPagoId": "p1"})),
            log(json!({"type": "view", "anuncioPagoId": "p1"})),
            log(json!({"type": "click", "anuncioPagoId": "p1"})),
        ];

        let kpis = calculate_paid_ad_kpis(&ads, &logs, &[], &[]);

        assert_eq!(kpis.active_paid_ads, 1);
        assert_eq!(kpis.impressions, 2);
        assert_eq!(kpis.ctr, 50.0);
        assert_eq!(kpis.impressions_change.trend, Trend::Up);
    }

    #[test]
    fn test_ctr_zero_without_impressions() {
        let logs = vec![log(json!({"type": "click", "anuncioPagoId": "p1"}))];
        let kpis = calculate_paid_ad_kpis(&[], &logs, &[], &[]);
        assert_eq!(kpis.ctr, 0.0);
    }
}
