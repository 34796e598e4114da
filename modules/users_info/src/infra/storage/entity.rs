use chrono::{DateTime, Utc};
use modkit_db::{FieldKind, FieldMap};
use serde::{Deserialize, Serialize};

pub const COLLECTION: &str = "users";

/// Stored user document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
}

/// Fields clients may filter and sort users by.
pub fn user_fields() -> FieldMap {
    FieldMap::new()
        .insert("id", "_id", FieldKind::Uuid)
        .insert("name", "name", FieldKind::String)
        .insert("email", "email", FieldKind::String)
        .insert("created_time", "created_time", FieldKind::DateTimeUtc)
        .insert("updated_time", "updated_time", FieldKind::DateTimeUtc)
}
