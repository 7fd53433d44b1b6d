//! Order KPIs — counts, monetary totals, average ticket, status
//! breakdown, and the view-to-order conversion rate.

use crate::period::{calculate_change, Change};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vecivendo_core::types::Order;

pub const DEFAULT_ORDER_STATUS: &str = "pendiente";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderKpis {
    pub total_orders: usize,
    pub total_orders_previous: usize,
    pub total_orders_change: Change,
    pub total_value: f64,
    pub total_value_previous: f64,
    pub total_value_change: Change,
    pub avg_ticket: f64,
    pub avg_ticket_previous: f64,
    pub avg_ticket_change: Change,
    /// Status -> order count; missing status buckets as "pendiente".
    pub orders_by_status: HashMap<String, usize>,
    /// Filled by the orchestrator from engagement view counts.
    pub conversion_rate: f64,
    pub conversion_rate_previous: f64,
}

/// Orders per hundred views; zero when there were no views.
pub fn conversion_rate(total_orders: usize, total_views: usize) -> f64 {
    if total_views > 0 {
        total_orders as f64 / total_views as f64 * 100.0
    } else {
        0.0
    }
}

fn average_ticket(total_value: f64, count: usize) -> f64 {
    if count > 0 {
        total_value / count as f64
    } else {
        0.0
    }
}

pub fn calculate_order_kpis(orders: &[Order], previous_orders: &[Order]) -> OrderKpis {
    let total_value: f64 = orders.iter().map(|o| o.total).sum();
    let previous_total_value: f64 = previous_orders.iter().map(|o| o.total).sum();

    let avg_ticket = average_ticket(total_value, orders.len());
    let previous_avg_ticket = average_ticket(previous_total_value, previous_orders.len());

    let mut orders_by_status: HashMap<String, usize> = HashMap::new();
    for order in orders {
        let status = order
            .estado
            .clone()
            .unwrap_or_else(|| DEFAULT_ORDER_STATUS.to_string());
        *orders_by_status.entry(status).or_insert(0) += 1;
    }

    OrderKpis {
        total_orders: orders.len(),
        total_orders_previous: previous_orders.len(),
        total_orders_change: calculate_change(orders.len() as f64, previous_orders.len() as f64),
        total_value,
        total_value_previous: previous_total_value,
        total_value_change: calculate_change(total_value, previous_total_value),
        avg_ticket,
        avg_ticket_previous: previous_avg_ticket,
        avg_ticket_change: calculate_change(avg_ticket, previous_avg_ticket),
        orders_by_status,
        conversion_rate: 0.0,
        conversion_rate_previous: 0.0,
    }
}
