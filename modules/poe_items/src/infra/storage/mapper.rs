use crate::contract::model::{Item, ItemCategory, PriceInfo};
use crate::infra::storage::entity::{CategoryDoc, ItemDoc};

pub fn item_to_contract(doc: ItemDoc) -> Item {
    Item {
        id: doc.id,
        poe_ninja_id: doc.poe_ninja_id,
        id_type: doc.id_type,
        name: doc.name,
        category: doc.category,
        item_type: doc.item_type,
        variant: doc.variant,
        icon_url: doc.icon_url,
        links: doc.links,
        price_info: doc.price_info.map(|p| PriceInfo {
            chaos_price: p.chaos_price,
            divine_price: p.divine_price,
            listings: p.listings,
            low_confidence: p.low_confidence,
        }),
    }
}

pub fn category_to_contract(doc: CategoryDoc) -> ItemCategory {
    ItemCategory {
        name: doc.name,
        internal_name: doc.internal_name,
        group: doc.group,
    }
}
