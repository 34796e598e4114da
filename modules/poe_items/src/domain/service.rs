use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use modkit::api::Envelope;
use modkit_cache::{CacheAside, CacheKey};
use modkit_db::{
    from_document, FieldMap, Paged, Predicate, QueryChainer, QueryPlan, RecordStore, Scalar,
    SortKey,
};
use query_core::{ListQuery, SortDir};
use tracing::{debug, instrument};

use crate::contract::model::{Item, ItemCategory};
use crate::domain::error::DomainError;
use crate::infra::storage::entity::{item_fields, CategoryDoc, ItemDoc, CATEGORIES, ITEMS};
use crate::infra::storage::mapper::{category_to_contract, item_to_contract};

const ITEMS_NAMESPACE: &str = "items";
const CATEGORIES_NAMESPACE: &str = "categories";
/// Listing payloads are nested under this key.
const LIST_KEY: &str = "items";

const GROUP_MIN_LEN: usize = 3;
const GROUP_MAX_LEN: usize = 50;

/// Categories grouped by `group`, each group ordered by category name.
pub type GroupedCategories = BTreeMap<String, Vec<ItemCategory>>;

#[derive(Clone)]
pub struct Service {
    store: Arc<dyn RecordStore>,
    cache: CacheAside,
    fields: Arc<FieldMap>,
}

impl Service {
    pub fn new(store: Arc<dyn RecordStore>, cache: CacheAside) -> Self {
        Self {
            store,
            cache,
            fields: Arc::new(item_fields()),
        }
    }

    /// Enabled items, optionally restricted to one category group.
    #[instrument(name = "poe_items.service.list_items", skip(self, query))]
    pub async fn list_items(
        &self,
        category_group: Option<&str>,
        query: &ListQuery,
    ) -> Result<Paged<Item>, DomainError> {
        let mut chainer = QueryChainer::new(ITEMS, &self.fields)
            .with_predicate(Predicate::eq("enabled", Scalar::Bool(true)));

        if let Some(group) = category_group {
            let group = validate_group(group)?;
            self.ensure_group_exists(group).await?;
            chainer = chainer.with_predicate(Predicate::eq(
                "category_group",
                Scalar::String(group.to_string()),
            ));
        }

        let paged: Paged<ItemDoc> = chainer
            .filter(query.filters())?
            .sort(query.sorts())?
            .fetch_page(self.store.as_ref(), &query.page)
            .await?;

        debug!(
            count = paged.items.len(),
            total = paged.pagination.total_items,
            "Listed items"
        );
        Ok(Paged {
            items: paged.items.into_iter().map(item_to_contract).collect(),
            pagination: paged.pagination,
        })
    }

    /// Serialized listing envelope, read through the collection cache.
    ///
    /// The group is length-checked before the cache is consulted so malformed
    /// input never reaches the cache.
    pub async fn list_items_cached(
        &self,
        category_group: Option<&str>,
        query: &ListQuery,
    ) -> Result<Bytes, DomainError> {
        if let Some(group) = category_group {
            validate_group(group)?;
        }
        let scope: Vec<(&str, &str)> = category_group
            .map(|g| ("category_group", g.trim()))
            .into_iter()
            .collect();
        let key = CacheKey::collection(ITEMS_NAMESPACE, &query.fingerprint(&scope));

        self.cache
            .collection(&key, || async {
                let page = self.list_items(category_group, query).await?;
                Ok::<_, DomainError>(
                    Envelope::data(page.items)
                        .with_key(LIST_KEY)
                        .with_pagination(page.pagination),
                )
            })
            .await
    }

    #[instrument(name = "poe_items.service.list_categories", skip(self))]
    pub async fn list_categories(&self) -> Result<GroupedCategories, DomainError> {
        let mut plan = QueryPlan::new(CATEGORIES);
        plan.sort = vec![
            SortKey {
                path: "group".to_string(),
                dir: SortDir::Asc,
            },
            SortKey {
                path: "name".to_string(),
                dir: SortDir::Asc,
            },
        ];

        let docs = self.store.find(&plan).await?;
        let mut grouped = GroupedCategories::new();
        for doc in docs {
            let category = category_to_contract(from_document::<CategoryDoc>(doc)?);
            grouped
                .entry(category.group.clone())
                .or_default()
                .push(category);
        }
        debug!(groups = grouped.len(), "Listed categories");
        Ok(grouped)
    }

    pub async fn list_categories_cached(&self) -> Result<Bytes, DomainError> {
        let key = CacheKey::collection(CATEGORIES_NAMESPACE, "all");
        self.cache
            .collection(&key, || async {
                Ok::<_, DomainError>(Envelope::data(self.list_categories().await?))
            })
            .await
    }

    async fn ensure_group_exists(&self, group: &str) -> Result<(), DomainError> {
        let found = self
            .store
            .find_one(
                CATEGORIES,
                &Predicate::eq("group", Scalar::String(group.to_string())),
            )
            .await?;
        match found {
            Some(_) => Ok(()),
            None => Err(DomainError::invalid_category_group(group)),
        }
    }
}

fn validate_group(raw: &str) -> Result<&str, DomainError> {
    let group = raw.trim();
    let len = group.chars().count();
    if !(GROUP_MIN_LEN..=GROUP_MAX_LEN).contains(&len) {
        return Err(DomainError::Validation {
            field: "category_group",
            error_type: "out_of_range",
        });
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_length_bounds() {
        assert_eq!(validate_group(" currency ").unwrap(), "currency");
        assert!(validate_group("ab").is_err());
        assert!(validate_group(&"g".repeat(51)).is_err());
        assert!(validate_group(&"g".repeat(50)).is_ok());
    }
}
