use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `VECIVENDO__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Tuning knobs for the dashboard aggregation pipeline.
///
/// `page_limit` is a known scalability ceiling: collections are fetched in
/// a single bounded page, so windows containing more records than the
/// limit silently undercount.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
    #[serde(default = "default_category_page_limit")]
    pub category_page_limit: usize,
    #[serde(default = "default_residential_page_limit")]
    pub residential_page_limit: usize,
    #[serde(default = "default_expiring_window_days")]
    pub expiring_window_days: i64,
}

fn default_page_limit() -> usize {
    5000
}
fn default_category_page_limit() -> usize {
    100
}
fn default_residential_page_limit() -> usize {
    100
}
fn default_expiring_window_days() -> i64 {
    7
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            category_page_limit: default_category_page_limit(),
            residential_page_limit: default_residential_page_limit(),
            expiring_window_days: default_expiring_window_days(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dashboard: DashboardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("VECIVENDO")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
