use bigdecimal::BigDecimal;
use serde::Serialize;

use crate::infra::storage::entity::IdType;

/// Item as returned to clients. Decimal prices are rendered as strings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Item {
    pub id: String,
    pub poe_ninja_id: i64,
    pub id_type: Option<IdType>,
    pub name: String,
    pub category: String,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub variant: Option<String>,
    pub icon_url: Option<String>,
    pub links: Option<i64>,
    pub price_info: Option<PriceInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceInfo {
    pub chaos_price: Option<BigDecimal>,
    pub divine_price: Option<BigDecimal>,
    pub listings: i64,
    pub low_confidence: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemCategory {
    pub name: String,
    pub internal_name: String,
    pub group: String,
}
