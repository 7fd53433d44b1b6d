//! Dashboard orchestrator — builds per-collection queries from immutable
//! filter parameters, fetches current and previous windows concurrently,
//! feeds the aggregators, and publishes consolidated KPI snapshots through
//! a watch channel. Re-runs unconditionally on ad-collection live updates.

use crate::ads::{calculate_ad_kpis, AdKpis};
use crate::engagement::{calculate_engagement_kpis, EngagementKpis};
use crate::health::{system_health, SystemHealth};
use crate::orders::{calculate_order_kpis, conversion_rate, OrderKpis};
use crate::paid::{calculate_paid_ad_kpis, PaidAdKpis};
use crate::period::{filter_by_date_range, previous_period, PeriodWindow};
use crate::quality::{calculate_quality_kpis, QualityKpis};
use crate::users::{calculate_user_kpis, UserKpis};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vecivendo_core::config::DashboardConfig;
use vecivendo_core::types::{Ad, Category, EngagementLog, Order, PaidAd, Residential, Review};
use vecivendo_core::VeciResult;
use vecivendo_store::{collections, DocumentList, DocumentStore, Query};

// ─── Filters ─────────────────────────────────────────────────────────

/// Tenant scoping for one fetch cycle. Precedence, most to least
/// specific: explicit residential id, then state, then country, then all
/// tenants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResidentialSelection {
    pub residential_id: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl ResidentialSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn single(id: impl Into<String>) -> Self {
        Self {
            residential_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn by_state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            ..Self::default()
        }
    }

    pub fn by_country(country: impl Into<String>) -> Self {
        Self {
            country: Some(country.into()),
            ..Self::default()
        }
    }

    /// Whether resolution requires the residential directory.
    fn needs_directory(&self) -> bool {
        self.residential_id.is_none() && (self.state.is_some() || self.country.is_some())
    }

    /// Resolve to a concrete tenant id set; `None` means no filter.
    pub fn resolve(&self, residentials: &[Residential]) -> Option<Vec<String>> {
        if let Some(id) = &self.residential_id {
            return Some(vec![id.clone()]);
        }
        if let Some(state) = &self.state {
            return Some(
                residentials
                    .iter()
                    .filter(|r| r.state.as_deref() == Some(state.as_str()))
                    .map(|r| r.id.clone())
                    .collect(),
            );
        }
        if let Some(country) = &self.country {
            return Some(
                residentials
                    .iter()
                    .filter(|r| r.country.as_deref() == Some(country.as_str()))
                    .map(|r| r.id.clone())
                    .collect(),
            );
        }
        None
    }
}

/// Immutable filter parameters for one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardFilters {
    pub residential: ResidentialSelection,
    pub categories: Vec<String>,
}

// ─── Query plan ──────────────────────────────────────────────────────

/// The per-collection queries for one fetch cycle. Reviews and paid ads
/// cannot be range-filtered by the backend, so their queries are bounded
/// by page size only and the results are date-filtered in memory.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub ads: Query,
    pub current_logs: Query,
    pub previous_logs: Query,
    pub current_orders: Query,
    pub previous_orders: Query,
    pub reviews: Query,
    pub paid_ads: Query,
    pub categories: Query,
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ranged(query: Query, field: &str, window: &PeriodWindow) -> Query {
    query
        .greater_than_equal(field, rfc3339(window.start))
        .less_than_equal(field, rfc3339(window.end))
}

pub fn build_query_plan(
    window: &PeriodWindow,
    previous: &PeriodWindow,
    residential_ids: Option<&[String]>,
    categories: &[String],
    config: &DashboardConfig,
) -> QueryPlan {
    let tenant_values: Option<Vec<Value>> =
        residential_ids.map(|ids| ids.iter().map(|id| json!(id)).collect());

    let with_tenant = |mut query: Query| {
        if let Some(values) = &tenant_values {
            query = query.equal_any("residencial_id", values.clone());
        }
        query
    };

    let mut ads = with_tenant(Query::new().limit(config.page_limit));
    if !categories.is_empty() {
        ads = ads.equal_any(
            "categoria",
            categories.iter().map(|c| json!(c)).collect(),
        );
    }

    QueryPlan {
        ads,
        current_logs: ranged(Query::new().limit(config.page_limit), "timestamp", window),
        previous_logs: ranged(Query::new().limit(config.page_limit), "timestamp", previous),
        current_orders: with_tenant(ranged(
            Query::new().limit(config.page_limit),
            "$createdAt",
            window,
        )),
        previous_orders: with_tenant(ranged(
            Query::new().limit(config.page_limit),
            "$createdAt",
            previous,
        )),
        reviews: Query::new().limit(config.page_limit),
        paid_ads: Query::new().limit(config.page_limit),
        categories: Query::new().limit(config.category_page_limit),
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub previous_start: DateTime<Utc>,
    pub previous_end: DateTime<Utc>,
}

/// One consolidated KPI snapshot, keyed by domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub ads: AdKpis,
    pub engagement: EngagementKpis,
    pub orders: OrderKpis,
    pub users: UserKpis,
    pub paid_ads: PaidAdKpis,
    pub quality: QualityKpis,
    pub system_health: SystemHealth,
    pub period: SnapshotPeriod,
    /// The store keeps no history of past active/inactive state, so the
    /// ad and advertiser aggregators receive the current snapshot as both
    /// periods. While false, those specific deltas are placeholders.
    pub ad_history_available: bool,
    pub generated_at: DateTime<Utc>,
}

fn parse_documents<T: DeserializeOwned>(list: DocumentList, collection: &str) -> Vec<T> {
    let fetched = list.documents.len();
    let parsed: Vec<T> = list
        .documents
        .into_iter()
        .filter_map(|doc| serde_json::from_value(doc).ok())
        .collect();
    if parsed.len() < fetched {
        warn!(
            collection = collection,
            dropped = fetched - parsed.len(),
            "Dropped malformed documents"
        );
    }
    parsed
}

/// Run one full fetch+aggregate cycle. Any fetch failure aborts the
/// cycle; no partial snapshot is assembled.
pub async fn fetch_snapshot(
    store: &dyn DocumentStore,
    window: &PeriodWindow,
    filters: &DashboardFilters,
    config: &DashboardConfig,
) -> VeciResult<KpiSnapshot> {
    let previous = previous_period(window);

    let residential_ids = if filters.residential.needs_directory() {
        let list = store
            .list(
                collections::RESIDENTIALS,
                &Query::new().limit(config.residential_page_limit),
            )
            .await?;
        let directory: Vec<Residential> = parse_documents(list, collections::RESIDENTIALS);
        filters.residential.resolve(&directory)
    } else {
        filters.residential.resolve(&[])
    };

    let plan = build_query_plan(
        window,
        &previous,
        residential_ids.as_deref(),
        &filters.categories,
        config,
    );

    let (
        ads_list,
        current_logs_list,
        previous_logs_list,
        current_orders_list,
        previous_orders_list,
        reviews_list,
        paid_ads_list,
        categories_list,
    ) = tokio::try_join!(
        store.list(collections::ADS, &plan.ads),
        store.list(collections::LOGS, &plan.current_logs),
        store.list(collections::LOGS, &plan.previous_logs),
        store.list(collections::ORDERS, &plan.current_orders),
        store.list(collections::ORDERS, &plan.previous_orders),
        store.list(collections::REVIEWS, &plan.reviews),
        store.list(collections::PAID_ADS, &plan.paid_ads),
        store.list(collections::CATEGORIES, &plan.categories),
    )?;

    let ads: Vec<Ad> = parse_documents(ads_list, collections::ADS);
    let current_logs: Vec<EngagementLog> = parse_documents(current_logs_list, collections::LOGS);
    let previous_logs: Vec<EngagementLog> =
        parse_documents(previous_logs_list, collections::LOGS);
    let current_orders: Vec<Order> = parse_documents(current_orders_list, collections::ORDERS);
    let previous_orders: Vec<Order> = parse_documents(previous_orders_list, collections::ORDERS);
    let all_reviews: Vec<Review> = parse_documents(reviews_list, collections::REVIEWS);
    let all_paid_ads: Vec<PaidAd> = parse_documents(paid_ads_list, collections::PAID_ADS);
    let categories: Vec<Category> = parse_documents(categories_list, collections::CATEGORIES);

    let category_names: HashMap<String, String> = categories
        .into_iter()
        .map(|c| (c.id, c.nombre))
        .collect();

    // The backend cannot range-filter these collections; post-filter with
    // the same inclusive compare the server-side queries use.
    let current_reviews = filter_by_date_range(&all_reviews, window, |r| r.created_at);
    let previous_reviews = filter_by_date_range(&all_reviews, &previous, |r| r.created_at);
    let current_paid_ads = filter_by_date_range(&all_paid_ads, window, |p| p.created_at);
    let previous_paid_ads = filter_by_date_range(&all_paid_ads, &previous, |p| p.created_at);

    // Paid attribution comes from the explicit tag on each log.
    let paid_logs: Vec<EngagementLog> = current_logs
        .iter()
        .filter(|l| l.paid_ad_id.is_some())
        .cloned()
        .collect();
    let previous_paid_logs: Vec<EngagementLog> = previous_logs
        .iter()
        .filter(|l| l.paid_ad_id.is_some())
        .cloned()
        .collect();

    // The ads snapshot stands in for the previous period as well; see
    // `KpiSnapshot::ad_history_available`.
    let ad_kpis = calculate_ad_kpis(
        &ads,
        &ads,
        &category_names,
        Utc::now(),
        config.expiring_window_days,
    );
    let user_kpis = calculate_user_kpis(&ads, &ads);

    let engagement_kpis = calculate_engagement_kpis(&current_logs, &previous_logs);
    let mut order_kpis = calculate_order_kpis(&current_orders, &previous_orders);
    order_kpis.conversion_rate =
        conversion_rate(order_kpis.total_orders, engagement_kpis.total_views);
    order_kpis.conversion_rate_previous = conversion_rate(
        order_kpis.total_orders_previous,
        engagement_kpis.total_views_previous,
    );
    let paid_ad_kpis = calculate_paid_ad_kpis(
        &current_paid_ads,
        &paid_logs,
        &previous_paid_ads,
        &previous_paid_logs,
    );
    let quality_kpis = calculate_quality_kpis(&current_reviews, &previous_reviews);
    let health = system_health(&current_logs);

    info!(
        ads = ads.len(),
        logs = current_logs.len(),
        orders = current_orders.len(),
        reviews = current_reviews.len(),
        paid_ads = current_paid_ads.len(),
        "KPI snapshot assembled"
    );

    Ok(KpiSnapshot {
        ads: ad_kpis,
        engagement: engagement_kpis,
        orders: order_kpis,
        users: user_kpis,
        paid_ads: paid_ad_kpis,
        quality: quality_kpis,
        system_health: health,
        period: SnapshotPeriod {
            start: window.start,
            end: window.end,
            previous_start: previous.start,
            previous_end: previous.end,
        },
        ad_history_available: false,
        generated_at: Utc::now(),
    })
}

// ─── Engine ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Published dashboard state. On a failed cycle the last successful
/// snapshot stays in place for display.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub phase: Phase,
    pub snapshot: Option<Arc<KpiSnapshot>>,
    pub error: Option<String>,
}

impl DashboardState {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            snapshot: None,
            error: None,
        }
    }
}

pub struct DashboardEngine {
    store: Arc<dyn DocumentStore>,
    config: DashboardConfig,
    generation: AtomicU64,
    state_tx: watch::Sender<DashboardState>,
}

impl DashboardEngine {
    pub fn new(store: Arc<dyn DocumentStore>, config: DashboardConfig) -> Self {
        let (state_tx, _) = watch::channel(DashboardState::idle());
        Self {
            store,
            config,
            generation: AtomicU64::new(0),
            state_tx,
        }
    }

    /// Watch the published dashboard state.
    pub fn state(&self) -> watch::Receiver<DashboardState> {
        self.state_tx.subscribe()
    }

    /// Run one fetch cycle and publish the outcome. Overlapping cycles
    /// race; a cycle that completes after a newer one was requested is
    /// discarded so the published state always reflects the most recently
    /// requested window and filters.
    pub async fn refresh(&self, window: &PeriodWindow, filters: &DashboardFilters) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state_tx.send_modify(|state| {
            state.phase = Phase::Loading;
            state.error = None;
        });

        let result = fetch_snapshot(self.store.as_ref(), window, filters, &self.config).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            metrics::counter!("dashboard.stale_discards").increment(1);
            debug!(generation = generation, "Discarding stale KPI fetch cycle");
            return;
        }

        match result {
            Ok(snapshot) => {
                metrics::counter!("dashboard.cycles").increment(1);
                self.state_tx.send_modify(|state| {
                    state.phase = Phase::Ready;
                    state.snapshot = Some(Arc::new(snapshot));
                    state.error = None;
                });
            }
            Err(err) => {
                metrics::counter!("dashboard.cycle_errors").increment(1);
                warn!(error = %err, "KPI fetch cycle failed");
                self.state_tx.send_modify(|state| {
                    state.phase = Phase::Error;
                    state.error = Some(err.to_string());
                });
            }
        }
    }

    /// Refresh once, then again on every live-update event from the ad
    /// collection, until the store's event feed closes. Dropping the
    /// returned future releases the subscription.
    pub async fn run(&self, window: PeriodWindow, filters: DashboardFilters) {
        let mut subscription = self.store.subscribe(collections::ADS);
        self.refresh(&window, &filters).await;

        while let Some(event) = subscription.next().await {
            debug!(
                document_id = %event.document_id,
                "Ad collection changed, refreshing KPIs"
            );
            self.refresh(&window, &filters).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vecivendo_store::Filter;

    fn residential(id: &str, state: &str, country: &str) -> Residential {
        serde_json::from_value(json!({
            "$id": id,
            "nombre": id,
            "provincia_estado": state,
            "country": country
        }))
        .unwrap()
    }

    #[test]
    fn test_residential_precedence_explicit_id_wins() {
        let directory = vec![
            residential("res-1", "Jalisco", "MX"),
            residential("res-2", "Jalisco", "MX"),
        ];
        let selection = ResidentialSelection {
            residential_id: Some("res-9".to_string()),
            state: Some("Jalisco".to_string()),
            country: Some("MX".to_string()),
        };

        assert_eq!(
            selection.resolve(&directory),
            Some(vec!["res-9".to_string()])
        );
    }

    #[test]
    fn test_residential_precedence_state_over_country() {
        let directory = vec![
            residential("res-1", "Jalisco", "MX"),
            residential("res-2", "Nuevo León", "MX"),
            residential("res-3", "Jalisco", "MX"),
        ];

        let by_state = ResidentialSelection {
            state: Some("Jalisco".to_string()),
            country: Some("MX".to_string()),
            ..Default::default()
        };
        assert_eq!(
            by_state.resolve(&directory),
            Some(vec!["res-1".to_string(), "res-3".to_string()])
        );

        let by_country = ResidentialSelection::by_country("MX");
        assert_eq!(by_country.resolve(&directory).map(|ids| ids.len()), Some(3));
    }

    #[test]
    fn test_no_selection_means_no_filter() {
        assert_eq!(ResidentialSelection::all().resolve(&[]), None);
    }

    #[test]
    fn test_query_plan_bounds_and_filters() {
        let window = PeriodWindow::new(
            "2026-08-01T00:00:00Z".parse().unwrap(),
            "2026-08-31T00:00:00Z".parse().unwrap(),
        );
        let previous = previous_period(&window);
        let config = DashboardConfig::default();
        let ids = vec!["res-1".to_string()];

        let plan = build_query_plan(
            &window,
            &previous,
            Some(&ids),
            &["cat-1".to_string()],
            &config,
        );

        assert_eq!(plan.ads.limit, 5000);
        assert!(plan.ads.filters.iter().any(|f| matches!(
            f,
            Filter::In { field, .. } if field == "residencial_id"
        )));
        assert!(plan.ads.filters.iter().any(|f| matches!(
            f,
            Filter::In { field, .. } if field == "categoria"
        )));

        // Logs are range-filtered server-side; reviews are not.
        assert_eq!(plan.current_logs.filters.len(), 2);
        assert!(plan.reviews.filters.is_empty());
        assert_eq!(plan.categories.limit, 100);

        // Previous-period log range ends 1ms before the current one starts.
        assert!(plan.previous_logs.filters.iter().any(|f| matches!(
            f,
            Filter::LessThanEqual { field, value }
                if field == "timestamp" && value == &json!("2026-07-31T23:59:59.999Z")
        )));
    }
}
