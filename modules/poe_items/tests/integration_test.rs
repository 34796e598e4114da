use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use bytes::Bytes;
use jsonwebtoken::{encode, EncodingKey, Header};
use modkit::auth::{ClaimsVerifier, JwtVerifier};
use modkit::AppContext;
use modkit_cache::{CacheAside, MemoryCache, TtlPolicy};
use modkit_db::{
    DbResult, Document, MemoryStore, Predicate, QueryPlan, RecordStore, Transaction,
};
use poe_items::infra::storage::seed;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &[u8] = b"catalog-test-secret";

/// Store wrapper that counts read queries.
#[derive(Clone, Default)]
struct CountingStore {
    inner: MemoryStore,
    finds: Arc<AtomicUsize>,
}

impl CountingStore {
    fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn find(&self, plan: &QueryPlan) -> DbResult<Vec<Document>> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.find(plan).await
    }

    async fn count(&self, plan: &QueryPlan) -> DbResult<u64> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        self.inner.count(plan).await
    }

    async fn find_one(&self, collection: &str, filter: &Predicate) -> DbResult<Option<Document>> {
        self.inner.find_one(collection, filter).await
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> DbResult<()> {
        self.inner.insert_one(collection, doc).await
    }

    async fn delete_many(&self, collection: &str, filter: &Predicate) -> DbResult<u64> {
        self.inner.delete_many(collection, filter).await
    }

    async fn start_transaction(&self) -> DbResult<Box<dyn Transaction>> {
        self.inner.start_transaction().await
    }
}

fn catalog() -> Value {
    json!({
        "categories": [
            {"name": "Currency", "internal_name": "Currency", "group": "currency"},
            {"name": "Fragments", "internal_name": "Fragment", "group": "fragments"},
            {"name": "Scarabs", "internal_name": "Scarab", "group": "fragments"}
        ],
        "items": [
            {"poe_ninja_id": 1, "name": "Chaos Orb", "category": "Currency",
             "price_info": {"chaos_price": "1", "listings": 900}},
            {"poe_ninja_id": 2, "name": "Divine Orb", "category": "Currency",
             "price_info": {"chaos_price": "180.5", "listings": 400}},
            {"poe_ninja_id": 3, "name": "Exalted Orb", "category": "Currency",
             "price_info": {"chaos_price": "12.25", "listings": 300}},
            {"poe_ninja_id": 4, "name": "Vaal Orb", "category": "Currency",
             "price_info": {"chaos_price": "0.8", "listings": 200}},
            {"poe_ninja_id": 5, "name": "Orb of Alchemy", "category": "Currency",
             "price_info": {"chaos_price": "0.25", "listings": 700}},
            {"poe_ninja_id": 6, "name": "Mirror of Kalandra", "category": "Currency",
             "enabled": false, "price_info": {"chaos_price": "90000", "listings": 2}},
            {"poe_ninja_id": 7, "name": "Sacrifice at Dawn", "category": "Fragment",
             "price_info": {"chaos_price": "2", "listings": 50}}
        ]
    })
}

async fn seeded() -> CountingStore {
    let store = CountingStore::default();
    let report = seed::load_json(&store, &catalog().to_string()).await.unwrap();
    assert_eq!(report.items, 7);
    store
}

fn app(store: &CountingStore, verifier: Option<Arc<dyn ClaimsVerifier>>) -> Router {
    let ctx = AppContext::new(
        Arc::new(store.clone()),
        CacheAside::new(Arc::new(MemoryCache::new()), TtlPolicy::default()),
    );
    poe_items::router(&ctx, verifier, Router::new())
}

async fn get(app: &Router, uri: &str, bearer: Option<&str>) -> Response {
    let mut req = Request::builder().uri(uri);
    if let Some(token) = bearer {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone().oneshot(req.body(Body::empty()).unwrap()).await.unwrap()
}

async fn body_bytes(resp: Response) -> Bytes {
    axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn names(body: &Value) -> Vec<&str> {
    body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_filtered_sorted_page_is_served_from_cache() {
    let store = seeded().await;
    let app = app(&store, None);
    let uri = "/poe/items?filter=category:like:currency&sort=-price_info.chaos_price&page=1&per_page=2";

    let resp = get(&app, uri, None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first = body_bytes(resp).await;
    let reads = store.finds();

    let body: Value = serde_json::from_slice(&first).unwrap();
    assert_eq!(names(&body), vec!["Divine Orb", "Exalted Orb"]);
    assert_eq!(
        body["pagination"],
        json!({"page": 1, "per_page": 2, "total_items": 5, "total_pages": 3})
    );
    assert_eq!(body["error"], Value::Null);

    let second = body_bytes(get(&app, uri, None).await).await;
    assert_eq!(first, second);
    assert_eq!(store.finds(), reads);
}

#[tokio::test]
async fn test_category_group_scopes_listing() {
    let store = seeded().await;
    let app = app(&store, None);

    let body = body_json(get(&app, "/poe/items?category_group=fragments", None).await).await;
    assert_eq!(names(&body), vec!["Sacrifice at Dawn"]);

    // disabled items never show up
    let body = body_json(get(&app, "/poe/items?category_group=currency&per_page=50", None).await).await;
    assert_eq!(body["pagination"]["total_items"], 5);
    assert!(!names(&body).contains(&"Mirror of Kalandra"));
}

#[tokio::test]
async fn test_invalid_category_group() {
    let store = seeded().await;
    let app = app(&store, None);

    let resp = get(&app, "/poe/items?category_group=weapons", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_input");
    assert_eq!(body["error"]["message"], "Invalid category group.");

    let resp = get(&app, "/poe/items?category_group=ab", None).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["fields"][0]["field"], "category_group");

    let resp = get(&app, "/poe/items?category_group=currency&category_group=gems", None).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "validation_error");
    assert_eq!(
        body["error"]["fields"],
        json!([{"error_type": "duplicate_parameter", "field": "category_group"}])
    );
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_nested_equality_filter_is_rejected() {
    let store = seeded().await;
    let app = app(&store, None);

    let resp = get(&app, "/poe/items?filter=price_info.chaos_price:=:1", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(get(&app, "/poe/items?filter=price_info.chaos_price:%3E:10&sort=name", None).await).await;
    assert_eq!(names(&body), vec!["Divine Orb", "Exalted Orb"]);
}

#[tokio::test]
async fn test_categories_grouped_by_group() {
    let store = seeded().await;
    let app = app(&store, None);

    let resp = get(&app, "/poe/categories", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(
        body["data"],
        json!({
            "currency": [
                {"name": "Currency", "internal_name": "Currency", "group": "currency"}
            ],
            "fragments": [
                {"name": "Fragments", "internal_name": "Fragment", "group": "fragments"},
                {"name": "Scarabs", "internal_name": "Scarab", "group": "fragments"}
            ]
        })
    );

    let reads = store.finds();
    get(&app, "/poe/categories", None).await;
    assert_eq!(store.finds(), reads);
}

#[tokio::test]
async fn test_bearer_gate() {
    let store = seeded().await;
    let verifier: Arc<dyn ClaimsVerifier> = Arc::new(JwtVerifier::hs256(SECRET));
    let app = app(&store, Some(verifier));

    let resp = get(&app, "/poe/categories", None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_credentials");

    let resp = get(&app, "/poe/items", Some("not-a-jwt")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let exp = chrono::Utc::now().timestamp() + 3600;
    let token = encode(
        &Header::default(),
        &json!({"sub": "user-1", "exp": exp}),
        &EncodingKey::from_secret(SECRET),
    )
    .unwrap();
    let resp = get(&app, "/poe/items", Some(&token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_seed_file_skips_items_with_unknown_category() {
    let store = MemoryStore::new();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "categories": [{"name": "Currency", "internal_name": "Currency", "group": "currency"}],
            "items": [
                {"poe_ninja_id": 1, "name": "Chaos Orb", "category": "Currency"},
                {"poe_ninja_id": 2, "name": "Lost Item", "category": "Nowhere"}
            ]
        })
    )
    .unwrap();

    let report = seed::load_file(&store, file.path()).await.unwrap();
    assert_eq!(report.categories, 1);
    assert_eq!(report.items, 1);
    assert_eq!(report.skipped, 1);

    let err = seed::load_json(&store, "{not json").await.unwrap_err();
    assert!(err.to_string().contains("malformed"));
}
