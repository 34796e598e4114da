pub mod envelope;
pub mod error;
pub mod query;
pub mod response;

pub use envelope::{Envelope, JsonBytes};
pub use error::{method_not_allowed_fallback, not_found_fallback, ApiError, ApiResult};
pub use query::{parse_list_query, ListParams};
pub use response::{created, no_content, ok};
