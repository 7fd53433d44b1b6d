//! Period-over-period KPI aggregation for the neighborhood marketplace —
//! pure per-domain aggregators plus the dashboard orchestrator that fetches
//! record snapshots and publishes consolidated KPI snapshots.

pub mod ads;
pub mod dashboard;
pub mod engagement;
pub mod health;
pub mod orders;
pub mod paid;
pub mod period;
pub mod quality;
pub mod users;

pub use ads::{calculate_ad_kpis, AdKpis};
pub use dashboard::{
    build_query_plan, fetch_snapshot, DashboardEngine, DashboardFilters, DashboardState,
    KpiSnapshot, Phase, QueryPlan, ResidentialSelection, SnapshotPeriod,
};
pub use engagement::{calculate_engagement_kpis, EngagementKpis};
pub use health::{system_health, HealthStatus, SystemHealth};
pub use orders::{calculate_order_kpis, conversion_rate, OrderKpis};
pub use paid::{calculate_paid_ad_kpis, PaidAdKpis};
pub use period::{calculate_change, previous_period, Change, PeriodWindow, Trend};
pub use quality::{calculate_quality_kpis, QualityKpis};
pub use users::{calculate_user_kpis, UserKpis};
