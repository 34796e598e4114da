use std::fmt;

/// Deterministic cache key.
///
/// Single records: `<namespace>:id:<id>`. Collections: `<namespace>:list:<fingerprint>`.
/// The fixed middle segment keeps the two shapes disjoint whatever the id holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn entity(namespace: &str, id: impl fmt::Display) -> Self {
        Self(format!("{namespace}:id:{id}"))
    }

    pub fn collection(namespace: &str, fingerprint: &str) -> Self {
        Self(format!("{namespace}:list:{fingerprint}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shapes() {
        assert_eq!(CacheKey::entity("users", "42").as_str(), "users:id:42");
        assert_eq!(
            CacheKey::collection("items", "00ff").to_string(),
            "items:list:00ff"
        );
        assert_ne!(
            CacheKey::entity("users", "list"),
            CacheKey::collection("users", "")
        );
    }

    #[test]
    fn entity_never_collides_with_collection() {
        let fp = "b31c1538f7fbf94f";
        let list = CacheKey::collection("users", fp);
        assert_ne!(CacheKey::entity("users", format!("list:{fp}")), list);
        assert!(!CacheKey::entity("users", format!("list:{fp}"))
            .as_str()
            .starts_with("users:list:"));
    }
}
