//! System-health signal derived from the current period's log set.

use serde::{Deserialize, Serialize};
use vecivendo_core::types::{EngagementLog, LOG_TYPE_ERROR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub error_count: usize,
}

/// Degraded as soon as any error-typed or error-level log appears.
pub fn system_health(logs: &[EngagementLog]) -> SystemHealth {
    let error_count = logs
        .iter()
        .filter(|l| l.kind == LOG_TYPE_ERROR || l.level.as_deref() == Some(LOG_TYPE_ERROR))
        .count();

    SystemHealth {
        status: if error_count > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        },
        error_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn log(value: serde_json::Value) -> EngagementLog {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_healthy_without_errors() {
        let logs = vec![log(json!({"type": "view"})), log(json!({"type": "click"}))];
        let health = system_health(&logs);
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.error_count, 0);
    }

    #[test]
    fn test_degraded_on_error_type_or_level() {
        let logs = vec![
            log(json!({"type": "error"})),
            log(json!({"type": "view", "level": "error"})),
            log(json!({"type": "view"})),
        ];
        let health = system_health(&logs);
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.error_count, 2);
    }
}
