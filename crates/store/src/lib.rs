//! Document-store seam for the aggregation core — query builder, the
//! `DocumentStore` trait, live-update subscriptions, and an in-memory
//! implementation used by tests.

pub mod client;
pub mod memory;
pub mod query;

pub use client::{DocumentList, DocumentStore, StoreEvent, StoreEventKind, Subscription};
pub use memory::MemoryStore;
pub use query::{Filter, Query, Sort};

/// Collection names in the backing store.
pub mod collections {
    pub const ADS: &str = "anuncios";
    pub const LOGS: &str = "logs";
    pub const ORDERS: &str = "pedidos";
    pub const REVIEWS: &str = "reviews";
    pub const PAID_ADS: &str = "anuncios_pago";
    pub const CATEGORIES: &str = "categorias";
    pub const RESIDENTIALS: &str = "residenciales";
}
