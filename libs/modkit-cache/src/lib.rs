//! Response cache for ModKit modules.
//!
//! Serialized payloads are stored as opaque bytes under deterministic [`CacheKey`]s.
//! [`CacheAside`] reads through the cache and fills it on a miss; writers call
//! [`CacheAside::invalidate`] for every key they make stale.
//!
//! Cache failures are never swallowed: they are logged with the operation and key
//! and returned to the caller.

mod aside;
mod key;
mod memory;
mod store;

pub use aside::{CacheAside, TtlPolicy, COLLECTION_TTL, ENTITY_TTL};
pub use key::CacheKey;
pub use memory::{MemoryCache, DEFAULT_CAPACITY};
pub use store::{CacheError, CacheStore};
