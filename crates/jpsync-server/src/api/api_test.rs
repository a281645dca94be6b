use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use jpsync_core::{
    build_app_config, AppConfig, CatalogProduct, CatalogVariant, ProductRecord, ProductStatus,
    Vendor,
};
use jpsync_shopify::{Catalog, CatalogError};
use jpsync_sync::{JobSettings, NoBackend, Translator};
use tokio::sync::Notify;
use tower::ServiceExt;

use super::*;

const KEY: &str = "test-key";

/// Catalog whose listing blocks until the test opens the gate, so a job
/// stays running for as long as the test needs.
#[derive(Default)]
struct GatedCatalog {
    gate: Notify,
}

fn unused() -> CatalogError {
    CatalogError::Config("not used by these tests".to_owned())
}

#[async_trait]
impl Catalog for GatedCatalog {
    async fn list_products(&self, _: Vendor) -> Result<Vec<CatalogProduct>, CatalogError> {
        self.gate.notified().await;
        Ok(Vec::new())
    }
    async fn lookup(&self, _: &str) -> Result<Option<CatalogProduct>, CatalogError> {
        Err(unused())
    }
    async fn create(&self, _: &ProductRecord) -> Result<CatalogProduct, CatalogError> {
        Err(unused())
    }
    async fn update(
        &self,
        _: &CatalogProduct,
        _: &ProductRecord,
    ) -> Result<CatalogProduct, CatalogError> {
        Err(unused())
    }
    async fn set_inventory(&self, _: &CatalogVariant, _: i64, _: bool) -> Result<(), CatalogError> {
        Err(unused())
    }
    async fn set_status(&self, _: i64, _: ProductStatus) -> Result<(), CatalogError> {
        Err(unused())
    }
    async fn publish(&self, _: i64) -> Result<(), CatalogError> {
        Err(unused())
    }
    async fn ensure_collection(&self, _: &str) -> Result<i64, CatalogError> {
        Err(unused())
    }
    async fn add_to_collection(&self, _: i64, _: i64) -> Result<(), CatalogError> {
        Err(unused())
    }
    async fn delete(&self, _: i64) -> Result<(), CatalogError> {
        Err(unused())
    }
    async fn primary_location(&self) -> Result<i64, CatalogError> {
        Err(unused())
    }
}

fn app_config() -> AppConfig {
    let env: HashMap<&str, &str> = [
        ("SHOPIFY_SHOP", "jpsync-test"),
        ("SHOPIFY_ACCESS_TOKEN", "shpat_test"),
        ("FX_JPY_TO_TWD", "0.21"),
        ("COMMISSION_RATE", "0.10"),
        ("SHIPPING_PER_UNIT_TWD", "150"),
        ("PRICE_ROUND_UNIT_TWD", "10"),
    ]
    .into_iter()
    .collect();
    build_app_config(|key| {
        env.get(key)
            .map(|v| (*v).to_owned())
            .ok_or(std::env::VarError::NotPresent)
    })
    .expect("test config")
}

fn app(catalog: Arc<GatedCatalog>) -> (Router, Orchestrator) {
    let orchestrator = Orchestrator::new(
        JobSettings::new(Arc::new(app_config())),
        catalog,
        Translator::new(Box::new(NoBackend), "zh-TW"),
    );
    let router = build_app(
        AppState {
            orchestrator: orchestrator.clone(),
        },
        AuthState::new(&[KEY.to_owned()]),
    );
    (router, orchestrator)
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {KEY}"))
        .body(Body::from(body.to_owned()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn already_running_maps_to_conflict() {
    let response = ApiError::new("req-1", "already_running", "busy").into_response();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn health_is_public_and_echoes_request_id() {
    let (app, _) = app(Arc::new(GatedCatalog::default()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["job_running"], false);
    assert_eq!(json["meta"]["request_id"], "req-42");
}

#[tokio::test]
async fn progress_requires_a_bearer_token() {
    let (app, _) = app(Arc::new(GatedCatalog::default()));

    let denied = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/progress")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

    let allowed = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/progress")
                .header("authorization", format!("Bearer {KEY}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(allowed.status(), StatusCode::OK);
    let json = json_body(allowed).await;
    assert_eq!(json["data"]["phase"], "idle");
    assert_eq!(json["data"]["running"], false);
}

#[tokio::test]
async fn unknown_vendor_is_a_validation_error() {
    let (app, _) = app(Arc::new(GatedCatalog::default()));
    let response = app
        .oneshot(post("/api/v1/jobs/ingest", r#"{"vendor":"uniqlo"}"#))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn second_start_conflicts_until_the_job_finishes() {
    let catalog = Arc::new(GatedCatalog::default());
    let (app, orchestrator) = app(Arc::clone(&catalog));

    let first = app
        .clone()
        .oneshot(post("/api/v1/jobs/reconcile", r#"{"vendor":"bape"}"#))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let json = json_body(first).await;
    assert_eq!(json["data"]["job"], "reconcile");
    assert_eq!(json["data"]["vendor"], "bape");

    let second = app
        .clone()
        .oneshot(post("/api/v1/jobs/ingest", r#"{"vendor":"workman","categories":["kids"]}"#))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(second).await["error"]["code"], "already_running");

    let cancel = app
        .clone()
        .oneshot(post("/api/v1/jobs/cancel", ""))
        .await
        .expect("response");
    assert_eq!(cancel.status(), StatusCode::ACCEPTED);
    assert_eq!(json_body(cancel).await["data"]["cancel_requested"], true);

    catalog.gate.notify_one();
    for _ in 0..200 {
        if !orchestrator.snapshot().running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!orchestrator.snapshot().running);

    let again = app
        .oneshot(post("/api/v1/jobs/cancel", ""))
        .await
        .expect("response");
    assert_eq!(json_body(again).await["data"]["cancel_requested"], false);
}
