//! HTTP server for the MCP gateway
//!
//! Routes, in priority order:
//! - `/static/*`       bundled assets
//! - `/mcp/*`          MCP JSON-RPC transport
//! - `/mockWebPage`    login form
//! - `/login`          login submission
//! - `/`               service descriptor
//! - anything else     404

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::dataset::DatasetResolver;
use crate::gate::{AuthGate, LOGIN_PAGE_PATH};
use crate::mcp::{self, McpService};
use crate::models::{EndpointMap, ServiceDescriptor};
use crate::session::{InMemorySessionStore, SessionStore};
use crate::tools::{create_default_catalog, CannedDataHandler};
use crate::web;

pub const MCP_PATH: &str = "/mcp/stream";
pub const LOGIN_SUBMIT_PATH: &str = "/login";
pub const STATIC_PREFIX: &str = "/static/";

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<GatewayConfig>,
    pub sessions: Arc<dyn SessionStore>,
    pub dataset: Arc<DatasetResolver>,
    pub mcp: Arc<McpService>,
}

impl ApiState {
    /// Wire the session store, dataset, catalog and gate together.
    pub fn new(config: GatewayConfig, sessions: Arc<dyn SessionStore>) -> Self {
        let dataset = Arc::new(DatasetResolver::new(config.data_dir.clone()));
        let handler = Arc::new(CannedDataHandler::new(Arc::clone(&dataset)));
        let gate = Arc::new(AuthGate::new(
            Arc::clone(&sessions),
            Arc::clone(&dataset),
            handler,
        ));
        let mcp = Arc::new(McpService::new(Arc::new(create_default_catalog()), gate));

        Self {
            config: Arc::new(config),
            sessions,
            dataset,
            mcp,
        }
    }

    pub fn in_memory(config: GatewayConfig) -> Self {
        Self::new(config, Arc::new(InMemorySessionStore::new()))
    }
}

/// =============================
/// Service Descriptor
/// =============================

async fn service_descriptor(State(state): State<ApiState>) -> Json<ServiceDescriptor> {
    let allowed_identities = match state.dataset.allowed_identities().await {
        Ok(identities) => identities.len(),
        Err(e) => {
            warn!(error = %e, "cannot count allowed identities");
            0
        }
    };

    Json(ServiceDescriptor {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "MCP gateway serving canned Fi Money financial data behind a per-session login"
            .to_string(),
        endpoints: EndpointMap {
            mcp: MCP_PATH.to_string(),
            login_page: LOGIN_PAGE_PATH.to_string(),
            login_submit: LOGIN_SUBMIT_PATH.to_string(),
            static_assets: STATIC_PREFIX.to_string(),
        },
        allowed_identities,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/static/*path", get(web::assets::serve_static))
        .route("/mcp/*rest", post(mcp::handle_stream))
        .route(LOGIN_PAGE_PATH, get(web::login_page))
        .route(LOGIN_SUBMIT_PATH, post(web::login_submit))
        .route("/", get(service_descriptor))
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(state: ApiState) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let addr = state.config.listen_addr();
    let data_dir = state.config.data_dir.display().to_string();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("MCP gateway listening on http://{}", addr);
    info!("MCP endpoint: http://{}{}", addr, MCP_PATH);
    info!("Dataset root: {}", data_dir);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, Response};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const NET_WORTH: &str = r#"{
  "netWorthResponse": {
    "totalNetWorthValue": { "currencyCode": "INR", "units": "658305" }
  }
}
"#;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("1111111111");
        std::fs::create_dir(&user).unwrap();
        std::fs::write(user.join("fetch_net_worth.json"), NET_WORTH).unwrap();
        std::fs::create_dir(dir.path().join("2222222222")).unwrap();
        dir
    }

    fn create_test_router(dir: &TempDir) -> Router {
        let config = GatewayConfig {
            data_dir: dir.path().to_path_buf(),
            public_base_url: Some("http://gateway.test".to_string()),
            ..GatewayConfig::default()
        };
        create_router(ApiState::in_memory(config))
    }

    async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn call_tool(router: &Router, session_id: &str, tool: &str) -> Value {
        let request = Request::post(MCP_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .header(mcp::SESSION_HEADER, session_id)
            .body(Body::from(
                json!({
                    "jsonrpc": "2.0",
                    "id": 7,
                    "method": "tools/call",
                    "params": { "name": tool, "arguments": {} }
                })
                .to_string(),
            ))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        body["result"].clone()
    }

    async fn submit_login(router: &Router, form: &str) -> Response<Body> {
        let request = Request::post(LOGIN_SUBMIT_PATH)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        router.clone().oneshot(request).await.unwrap()
    }

    fn result_text(result: &Value) -> &str {
        result["content"][0]["text"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_login_then_fetch_net_worth() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let result = call_tool(&router, "abc", "fetch_net_worth").await;
        assert_eq!(result["isError"], false);
        let challenge: Value = serde_json::from_str(result_text(&result)).unwrap();
        assert_eq!(challenge["status"], "login_required");
        assert_eq!(
            challenge["login_url"],
            "http://gateway.test/mockWebPage?sessionId=abc"
        );

        let response = submit_login(&router, "sessionId=abc&phoneNumber=1111111111").await;
        assert_eq!(response.status(), StatusCode::OK);
        let page = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(page.contains("Login successful"));

        for _ in 0..2 {
            let result = call_tool(&router, "abc", "fetch_net_worth").await;
            assert_eq!(result["isError"], false);
            assert_eq!(result_text(&result), NET_WORTH);
        }
    }

    #[tokio::test]
    async fn test_login_with_unknown_number_is_denied_at_call_time() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let response = submit_login(&router, "sessionId=abc&phoneNumber=0000000000").await;
        assert_eq!(response.status(), StatusCode::OK);

        for tool in ["fetch_net_worth", "fetch_epf_details"] {
            let result = call_tool(&router, "abc", tool).await;
            assert_eq!(result["isError"], true);
            let text = result_text(&result);
            assert!(text.contains("not allowed"));
            assert!(!text.contains("login_required"));
        }
    }

    #[tokio::test]
    async fn test_allowed_number_without_dataset_file() {
        let dir = fixture();
        let router = create_test_router(&dir);
        submit_login(&router, "sessionId=s2&phoneNumber=2222222222").await;

        let result = call_tool(&router, "s2", "fetch_net_worth").await;
        assert_eq!(result["isError"], true);
        assert!(result_text(&result).starts_with("error reading test data file"));
    }

    #[tokio::test]
    async fn test_login_page_requires_session_id() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let response = router
            .clone()
            .oneshot(Request::get("/mockWebPage").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(
                Request::get("/mockWebPage?sessionId=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = String::from_utf8(body_bytes(response).await).unwrap();
        assert!(page.contains(r#"value="abc""#));
        assert!(page.contains(r#"<option value="1111111111">"#));
        assert!(page.contains(r#"<option value="2222222222">"#));
    }

    #[tokio::test]
    async fn test_login_submit_validation() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let response = submit_login(&router, "sessionId=abc").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = submit_login(&router, "sessionId=abc&phoneNumber=").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = submit_login(&router, "phoneNumber=1111111111").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // No content type and no body: still a malformed login, not 415.
        let response = router
            .clone()
            .oneshot(Request::post("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .clone()
            .oneshot(
                Request::post("/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"sessionId":"abc"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .clone()
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_login_submit_accepts_query_fields() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let response = router
            .clone()
            .oneshot(
                Request::post("/login?sessionId=abc&phoneNumber=1111111111")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result = call_tool(&router, "abc", "fetch_net_worth").await;
        assert_eq!(result["isError"], false);
        assert_eq!(result_text(&result), NET_WORTH);
    }

    #[tokio::test]
    async fn test_login_get_is_method_not_allowed() {
        let dir = fixture();
        let router = create_test_router(&dir);
        let response = router
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_initialize_assigns_session_header() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let request = Request::post(MCP_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} })
                    .to_string(),
            ))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let session = response
            .headers()
            .get(mcp::SESSION_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(session.starts_with("mcp-session-"));
    }

    #[tokio::test]
    async fn test_mcp_transport_errors() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let notification = Request::post(MCP_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
            ))
            .unwrap();
        let response = router.clone().oneshot(notification).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let null_id = Request::post(MCP_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "jsonrpc": "2.0", "id": null, "method": "ping" }).to_string(),
            ))
            .unwrap();
        let response = router.clone().oneshot(null_id).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], mcp::INVALID_REQUEST);

        let garbage = Request::post(MCP_PATH)
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.clone().oneshot(garbage).await.unwrap();
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], mcp::PARSE_ERROR);

        let no_session = Request::post(MCP_PATH)
            .body(Body::from(
                json!({
                    "jsonrpc": "2.0",
                    "id": 2,
                    "method": "tools/call",
                    "params": { "name": "fetch_net_worth" }
                })
                .to_string(),
            ))
            .unwrap();
        let response = router.clone().oneshot(no_session).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(Request::get(MCP_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_static_assets() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let response = router
            .clone()
            .oneshot(Request::get("/static/style.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

        let response = router
            .clone()
            .oneshot(Request::get("/static/login.js").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );

        let response = router
            .oneshot(Request::get("/static/missing.png").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_root_descriptor_and_fallback() {
        let dir = fixture();
        let router = create_test_router(&dir);

        let response = router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["name"], "fi-mcp-gateway");
        assert_eq!(body["allowed_identities"], 2);
        assert_eq!(body["endpoints"]["mcp"], MCP_PATH);
        assert_eq!(body["endpoints"]["login_page"], "/mockWebPage");

        let response = router
            .oneshot(Request::get("/portfolio").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
