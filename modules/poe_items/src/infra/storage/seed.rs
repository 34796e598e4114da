//! Catalog import from a JSON snapshot.
//!
//! ```json
//! {
//!   "categories": [{"name": "Currency", "internal_name": "Currency", "group": "currency"}],
//!   "items": [{"poe_ninja_id": 1, "name": "Chaos Orb", "category": "Currency",
//!              "price_info": {"chaos_price": "1", "listings": 120}}]
//! }
//! ```
//!
//! Items are linked to their category by `internal_name`; items naming an unknown
//! category are skipped.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::Utc;
use modkit_db::{to_document, RecordStore};
use serde::Deserialize;
use tracing::{error, info};

use crate::infra::storage::entity::{
    CategoryDoc, IdType, ItemDoc, PriceInfoDoc, CATEGORIES, ITEMS,
};

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    categories: Vec<CategoryInput>,
    #[serde(default)]
    items: Vec<ItemInput>,
}

#[derive(Debug, Deserialize)]
struct CategoryInput {
    name: String,
    internal_name: String,
    group: String,
}

#[derive(Debug, Deserialize)]
struct ItemInput {
    poe_ninja_id: i64,
    #[serde(default)]
    id_type: Option<IdType>,
    name: String,
    category: String,
    #[serde(default, rename = "type")]
    item_type: Option<String>,
    #[serde(default)]
    variant: Option<String>,
    #[serde(default)]
    icon_url: Option<String>,
    #[serde(default)]
    links: Option<i64>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    price_info: Option<PriceInput>,
}

#[derive(Debug, Deserialize)]
struct PriceInput {
    #[serde(default)]
    chaos_price: Option<BigDecimal>,
    #[serde(default)]
    divine_price: Option<BigDecimal>,
    #[serde(default)]
    listings: i64,
    #[serde(default)]
    low_confidence: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub items: usize,
    pub skipped: usize,
}

pub async fn load_file(store: &dyn RecordStore, path: &Path) -> anyhow::Result<SeedReport> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read seed file {}", path.display()))?;
    load_json(store, &raw)
        .await
        .with_context(|| format!("cannot load seed file {}", path.display()))
}

pub async fn load_json(store: &dyn RecordStore, raw: &str) -> anyhow::Result<SeedReport> {
    let snapshot: Snapshot = serde_json::from_str(raw).context("malformed catalog snapshot")?;
    let now = Utc::now();
    let mut report = SeedReport::default();
    let mut groups: HashMap<String, String> = HashMap::new();

    for (i, c) in snapshot.categories.into_iter().enumerate() {
        groups.insert(c.internal_name.clone(), c.group.clone());
        let doc = CategoryDoc {
            id: format!("category-{i}"),
            name: c.name,
            internal_name: c.internal_name,
            group: c.group,
            created_time: now,
            updated_time: now,
        };
        store.insert_one(CATEGORIES, to_document(&doc)?).await?;
        report.categories += 1;
    }

    for item in snapshot.items {
        let Some(group) = groups.get(&item.category) else {
            error!(item = %item.name, category = %item.category, "unknown category, skipping item");
            report.skipped += 1;
            continue;
        };
        let doc = ItemDoc {
            id: format!("item-{}-{}", item.category, item.poe_ninja_id),
            poe_ninja_id: item.poe_ninja_id,
            id_type: item.id_type,
            name: item.name,
            category_group: group.clone(),
            category: item.category,
            item_type: item.item_type,
            variant: item.variant,
            icon_url: item.icon_url,
            links: item.links,
            enabled: item.enabled.unwrap_or(true),
            price_info: item.price_info.map(|p| PriceInfoDoc {
                chaos_price: p.chaos_price,
                divine_price: p.divine_price,
                listings: p.listings,
                low_confidence: p.low_confidence,
            }),
            created_time: now,
            updated_time: now,
        };
        store.insert_one(ITEMS, to_document(&doc)?).await?;
        report.items += 1;
    }

    info!(
        categories = report.categories,
        items = report.items,
        skipped = report.skipped,
        "catalog snapshot loaded"
    );
    Ok(report)
}
