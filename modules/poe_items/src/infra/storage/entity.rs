use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use modkit_db::document::decimal128;
use modkit_db::{FieldKind, FieldMap};
use serde::{Deserialize, Serialize};

pub const ITEMS: &str = "poe_items";
pub const CATEGORIES: &str = "poe_item_categories";

/// Which side of a currency exchange the poe.ninja id refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Pay,
    Receive,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceInfoDoc {
    #[serde(default, with = "decimal128::option", skip_serializing_if = "Option::is_none")]
    pub chaos_price: Option<BigDecimal>,
    #[serde(default, with = "decimal128::option", skip_serializing_if = "Option::is_none")]
    pub divine_price: Option<BigDecimal>,
    #[serde(default)]
    pub listings: i64,
    #[serde(default)]
    pub low_confidence: bool,
}

/// Stored item. The owning category is denormalized into `category` / `category_group`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub poe_ninja_id: i64,
    #[serde(default)]
    pub id_type: Option<IdType>,
    pub name: String,
    /// Category `internal_name`.
    pub category: String,
    pub category_group: String,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub links: Option<i64>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    #[serde(default)]
    pub price_info: Option<PriceInfoDoc>,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
}

fn enabled_default() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub internal_name: String,
    pub group: String,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
}

/// Fields clients may filter and sort items by. Nested `price_info.*` paths are
/// addressed directly and need no entry here.
pub fn item_fields() -> FieldMap {
    FieldMap::new()
        .insert("name", "name", FieldKind::String)
        .insert("category", "category", FieldKind::String)
        .insert("type", "type", FieldKind::String)
        .insert("variant", "variant", FieldKind::String)
        .insert("id_type", "id_type", FieldKind::String)
        .insert("poe_ninja_id", "poe_ninja_id", FieldKind::I64)
        .insert("links", "links", FieldKind::I64)
        .insert("created_time", "created_time", FieldKind::DateTimeUtc)
        .insert("updated_time", "updated_time", FieldKind::DateTimeUtc)
}
