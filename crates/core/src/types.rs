//! Document shapes read from the marketplace's backing store. Every entity
//! here is externally owned; the aggregation core only consumes snapshots,
//! so all non-key fields tolerate absence via `#[serde(default)]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A reference field that may arrive as a bare document id or as an
/// inline expanded document, depending on whether the store expanded
/// the relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref {
    Expanded(RefDoc),
    Id(String),
}

/// The subset of an expanded reference the aggregators care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefDoc {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Ref {
    /// The referenced document id, regardless of representation.
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Expanded(doc) => &doc.id,
        }
    }

    /// Resolve a display name. An expanded reference yields its own
    /// `nombre`/`name` (or `None` if it carries neither); a bare id is
    /// looked up in `names`, falling back to the id itself.
    pub fn resolve_name(&self, names: &HashMap<String, String>) -> Option<String> {
        match self {
            Ref::Expanded(doc) => doc.nombre.clone().or_else(|| doc.name.clone()),
            Ref::Id(id) => Some(names.get(id).cloned().unwrap_or_else(|| id.clone())),
        }
    }
}

/// A classified listing (`anuncios` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    #[serde(rename = "$id", default)]
    pub id: String,
    #[serde(default)]
    pub activo: bool,
    #[serde(default)]
    pub categorias: Vec<Ref>,
    /// Legacy singular category field; checked when `categorias` is empty.
    #[serde(default)]
    pub categoria: Option<Ref>,
    #[serde(default)]
    pub residencial_id: Option<Ref>,
    #[serde(default)]
    pub anunciante_id: Option<Ref>,
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "$updatedAt", default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Validity window in days counted from the last update.
    #[serde(default)]
    pub dias_vigencia: Option<i64>,
}

/// One recorded user interaction (`logs` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementLog {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(rename = "deviceType", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Set when the event is attributable to a paid ad. Logs without this
    /// tag are treated as organic.
    #[serde(rename = "anuncioPagoId", default)]
    pub paid_ad_id: Option<Ref>,
}

/// Log event types the aggregators distinguish.
pub const LOG_TYPE_VIEW: &str = "view";
pub const LOG_TYPE_CLICK: &str = "click";
pub const LOG_TYPE_ERROR: &str = "error";

/// An order placed against a listing (`pedidos` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "$id", default)]
    pub id: String,
    #[serde(default)]
    pub total: f64,
    /// pendiente / confirmado / en_proceso / completado / cancelado.
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A buyer review (`reviews` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "$id", default)]
    pub id: String,
    #[serde(default)]
    pub puntuacion: i64,
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A promoted/sponsored listing (`anuncios_pago` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaidAd {
    #[serde(rename = "$id", default)]
    pub id: String,
    #[serde(default)]
    pub activo: bool,
    #[serde(rename = "$createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A listing category (`categorias` collection). Used to resolve bare
/// category ids to display names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "$id", default)]
    pub id: String,
    #[serde(default)]
    pub nombre: String,
}

/// A tenant community (`residenciales` collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Residential {
    #[serde(rename = "$id", default)]
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, alias = "provincia_estado")]
    pub state: Option<String>,
}
