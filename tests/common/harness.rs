//! Test harness for database and application lifecycle.
//!
//! Every harness gets its own in-memory SurrealDB instance.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use manuscrypt::config::AppConfig;
use manuscrypt::db::connection::{init_db, DbConfig, ManuscryptDb};
use manuscrypt::db::schema::apply_schema;
use manuscrypt::init::AppContext;
use manuscrypt::llm::LlmProvider;

/// Isolated in-memory database with the schema applied.
pub struct TestHarness {
    pub db: Arc<ManuscryptDb>,
}

impl TestHarness {
    /// Panics if database initialization fails (appropriate for tests).
    pub async fn new() -> Self {
        let db = init_db(&DbConfig::Memory, Path::new("."))
            .await
            .expect("Failed to initialize test database");
        apply_schema(&db)
            .await
            .expect("Failed to apply schema to test database");
        Self { db: Arc::new(db) }
    }
}

/// A full application over a fresh in-memory database.
pub struct TestApp {
    pub ctx: Arc<AppContext>,
    pub router: Router,
    /// Kept alive while the app exists.
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn db(&self) -> &ManuscryptDb {
        &self.ctx.db
    }

    /// Send one request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        ServiceExt::<Request<Body>>::oneshot(self.router.clone(), request)
            .await
            .expect("router is infallible")
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("valid request"),
        )
        .await
    }

    pub async fn request(&self, method: &str, uri: &str) -> Response<Body> {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
    }
}

/// Build an app with `provider` (or none) and `config`.
pub async fn test_app(provider: Option<Arc<dyn LlmProvider>>, config: AppConfig) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db = init_db(&DbConfig::Memory, temp_dir.path())
        .await
        .expect("Failed to initialize test database");
    let ctx = AppContext::from_parts(db, temp_dir.path().to_path_buf(), config, provider)
        .await
        .expect("Failed to build app context");
    let ctx = Arc::new(ctx);
    TestApp {
        router: manuscrypt::api::router(ctx.clone()),
        ctx,
        temp_dir,
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .expect("readable body")
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

/// Poll `check` until it holds or about a second has passed.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: &TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("bound address");
    let service = app
        .router
        .clone()
        .into_make_service_with_connect_info::<std::net::SocketAddr>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, service).await;
    });
    format!("http://{addr}")
}
