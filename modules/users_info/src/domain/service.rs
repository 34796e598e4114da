use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use modkit::api::Envelope;
use modkit_cache::{CacheAside, CacheKey};
use modkit_db::{
    from_document, to_document, DbError, FieldMap, Paged, Predicate, QueryChainer, RecordStore,
    Transaction,
};
use query_core::ListQuery;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{NewUser, User, UserPatch};
use crate::domain::error::DomainError;
use crate::infra::storage::entity::{user_fields, UserDoc, COLLECTION};
use crate::infra::storage::mapper::entity_to_contract;

const CACHE_NAMESPACE: &str = "users";
/// Listing payloads are nested under this key.
const LIST_KEY: &str = "users";

const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 255;

/// Domain service containing business logic for user management
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
            fields: Arc::new(user_fields()),
        }
    }

    fn entity_key(id: &str) -> CacheKey {
        CacheKey::entity(CACHE_NAMESPACE, id)
    }

    #[instrument(name = "users_info.service.create_user", skip(self, new_user))]
    pub async fn create_user(&self, new_user: NewUser) -> Result<String, DomainError> {
        info!("Creating new user");

        let name = validate_name(&new_user.name)?;
        let email = validate_email(&new_user.email)?;

        let now = Utc::now();
        let doc = UserDoc {
            id: Uuid::new_v4().to_string(),
            name,
            email: email.clone(),
            created_time: now,
            updated_time: now,
        };

        match self.store.insert_one(COLLECTION, to_document(&doc)?).await {
            Ok(()) => {
                info!(user_id = %doc.id, "Successfully created user");
                Ok(doc.id)
            }
            Err(DbError::DuplicateKey { field, .. }) if field == "email" => {
                warn!("error creating user: duplicate email used");
                Err(DomainError::EmailAlreadyExists { email })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// One filtered, sorted page of users straight from the store.
    #[instrument(name = "users_info.service.list_users", skip(self, query))]
    pub async fn list_users(&self, query: &ListQuery) -> Result<Paged<User>, DomainError> {
        let paged: Paged<UserDoc> = QueryChainer::new(COLLECTION, &self.fields)
            .filter(query.filters())?
            .sort(query.sorts())?
            .fetch_page(self.store.as_ref(), &query.page)
            .await?;

        debug!(
            count = paged.items.len(),
            total = paged.pagination.total_items,
            "Listed users"
        );
        Ok(Paged {
            items: paged.items.into_iter().map(entity_to_contract).collect(),
            pagination: paged.pagination,
        })
    }

    /// Serialized listing envelope, read through the collection cache.
    pub async fn list_users_cached(&self, query: &ListQuery) -> Result<Bytes, DomainError> {
        let key = CacheKey::collection(CACHE_NAMESPACE, &query.fingerprint(&[]));
        self.cache
            .collection(&key, || async {
                let page = self.list_users(query).await?;
                Ok::<_, DomainError>(
                    Envelope::data(page.items)
                        .with_key(LIST_KEY)
                        .with_pagination(page.pagination),
                )
            })
            .await
    }

    #[instrument(name = "users_info.service.get_user", skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<User, DomainError> {
        let id = parse_user_id(id)?;
        let doc = self
            .store
            .find_one(COLLECTION, &Predicate::id(&id))
            .await?
            .ok_or_else(|| DomainError::user_not_found(&id))?;
        Ok(entity_to_contract(from_document(doc)?))
    }

    /// Serialized single-user envelope, read through the entity cache.
    /// Unknown ids are not cached; ids that are not UUIDs never reach the cache.
    pub async fn get_user_cached(&self, id: &str) -> Result<Bytes, DomainError> {
        let id = parse_user_id(id)?;
        self.cache
            .entity(&Self::entity_key(&id), || async {
                Ok::<_, DomainError>(Envelope::data(self.get_user(&id).await?))
            })
            .await
    }

    #[instrument(name = "users_info.service.update_user", skip(self, patch))]
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<(), DomainError> {
        info!("Updating user");

        let id = &parse_user_id(id)?;
        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let email = patch.email.as_deref().map(validate_email).transpose()?;

        let mut tx = self.begin_invalidated(id).await?;
        let result = apply_update(tx.as_mut(), id, name, email).await;
        finish(tx, result).await?;
        info!("Successfully updated user");
        Ok(())
    }

    #[instrument(name = "users_info.service.delete_user", skip(self))]
    pub async fn delete_user(&self, id: &str) -> Result<(), DomainError> {
        info!("Deleting user");

        let id = &parse_user_id(id)?;
        let mut tx = self.begin_invalidated(id).await?;
        let result = match tx.delete_one(COLLECTION, &Predicate::id(id)).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DomainError::user_not_found(id)),
            Err(e) => Err(e.into()),
        };

        finish(tx, result).await?;
        info!("Successfully deleted user");
        Ok(())
    }

    /// Open a transaction and drop the cached record before any write happens.
    /// A failed invalidation aborts the transaction.
    async fn begin_invalidated(&self, id: &str) -> Result<Box<dyn Transaction>, DomainError> {
        let tx = self.store.start_transaction().await?;
        if let Err(e) = self.cache.invalidate(&Self::entity_key(id)).await {
            if let Err(abort_err) = tx.abort().await {
                warn!(error = %abort_err, "transaction abort failed");
            }
            return Err(e.into());
        }
        Ok(tx)
    }
}

async fn apply_update(
    tx: &mut dyn Transaction,
    id: &str,
    name: Option<String>,
    email: Option<String>,
) -> Result<(), DomainError> {
    let current = tx
        .find_one(COLLECTION, &Predicate::id(id))
        .await?
        .ok_or_else(|| DomainError::user_not_found(id))?;
    let mut doc: UserDoc = from_document(current)?;

    if let Some(name) = name {
        doc.name = name;
    }
    if let Some(email) = email {
        doc.email = email;
    }
    doc.updated_time = Utc::now();

    match tx
        .replace_one(COLLECTION, &Predicate::id(id), to_document(&doc)?)
        .await
    {
        Ok(_) => Ok(()),
        Err(DbError::DuplicateKey { field, .. }) if field == "email" => {
            Err(DomainError::EmailAlreadyExists { email: doc.email })
        }
        Err(e) => Err(e.into()),
    }
}

/// Commit on success, abort otherwise.
async fn finish(
    tx: Box<dyn Transaction>,
    result: Result<(), DomainError>,
) -> Result<(), DomainError> {
    match result {
        Ok(()) => Ok(tx.commit().await?),
        Err(e) => {
            if let Err(abort_err) = tx.abort().await {
                warn!(error = %abort_err, "transaction abort failed");
            }
            Err(e)
        }
    }
}

/// Canonical hyphenated form of a path id; anything else is an unknown user.
fn parse_user_id(raw: &str) -> Result<String, DomainError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|_| DomainError::user_not_found(raw))
}

fn validate_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    let len = name.chars().count();
    if len < NAME_MIN_LEN {
        return Err(DomainError::validation("name", "too_short"));
    }
    if len > NAME_MAX_LEN {
        return Err(DomainError::validation("name", "too_long"));
    }
    Ok(name.to_string())
}

/// Shape check only: one `@`, a non-empty local part and a dotted domain.
fn validate_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(DomainError::validation("email", "invalid_email"))
    }
}
