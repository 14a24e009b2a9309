//! MCP transport (JSON-RPC 2.0 over streamable HTTP)
//!
//! Requests are POSTed under `/mcp/` and answered with a single JSON body;
//! no SSE stream is opened. The session id travels in the `Mcp-Session-Id`
//! header and is minted on `initialize` when the client did not bring one.

use crate::api::ApiState;
use crate::gate::AuthGate;
use crate::models::{CallContext, ToolOutcome};
use crate::tools::ToolCatalog;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_PING: &str = "ping";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";
pub const METHOD_RESOURCES_LIST: &str = "resources/list";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

const INSTRUCTIONS: &str = concat!(
    "A financial portfolio management MCP server that provides secure access to users' financial data through Fi Money, a financial hub for all things money. This MCP server enables users to:\n- Access comprehensive net worth analysis with asset/liability breakdowns\n- Retrieve detailed transaction histories for mutual funds and Employee Provident Fund accounts\n- View credit reports with scores, loan details, and account histories, this also contains user's date of birth that can be used for calculating their age\n\n",
    "If the person asks, you can tell about Fi Money that it is money management platform that offers below services in partnership with regulated entities:\n\n",
    "AVAILABLE SERVICES:\n- Digital savings account with zero Forex cards\n- Invest in Indian Mutual funds, US Stocks (partnership with licensed brokers), Smart and Fixed Deposits.\n- Instant Personal Loans \n- Faster UPI and Bank Transfers payments\n- Credit score monitoring and reports\n\n",
    "IMPORTANT LIMITATIONS:\n- This MCP server retrieves only actual user data via Net worth tracker and based on consent provided by the user  and does not generate hypothetical or estimated financial information\n- In this version of the MCP server, user's historical bank transactions, historical stocks transaction data, salary (unless categorically declared) is not present. Don't assume these data points for any kind of analysis.\n\n",
    "CRITICAL INSTRUCTIONS FOR FINANCIAL DATA:\n\n",
    "1. DATA BOUNDARIES: Only provide information that exists in the user's Fi Money Net worth tracker. Never estimate, extrapolate, or generate hypothetical financial data.\n\n",
    "2. SPENDING ANALYSIS: If user asks about spending patterns, categories, or analysis tell the user we currently don't offer that data through the MCP:\n   - For detailed spending insights, direct them to: \"For comprehensive spending analysis and categorization, please use the Fi Money mobile app which provides detailed spending insights and budgeting tools.\"\n\n",
    "3. MISSING DATA HANDLING: If requested data is not available:\n   - Clearly state what data is missing\n   - Explain how user can connect additional accounts in Fi Money app\n   - Never fill gaps with estimated or generic information\n\n",
    "LOGIN: the first tool call of a session returns a login_url. Show it to the user, wait until they confirm they have logged in, then retry the call.\n",
);

/// =============================
/// Wire Types
/// =============================

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// `None` only when the member is absent (a notification); `"id": null`
    /// is kept as `Some(Value::Null)` so it can be rejected.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    #[allow(dead_code)]
    arguments: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
}

/// =============================
/// Protocol Service
/// =============================

/// Answers decoded JSON-RPC requests; every `tools/call` goes through the gate.
pub struct McpService {
    catalog: Arc<ToolCatalog>,
    gate: Arc<AuthGate>,
}

impl McpService {
    pub fn new(catalog: Arc<ToolCatalog>, gate: Arc<AuthGate>) -> Self {
        Self { catalog, gate }
    }

    pub async fn handle(
        &self,
        req: JsonRpcRequest,
        session_id: Option<&str>,
        base_url: &str,
    ) -> JsonRpcResponse {
        let id = req.id.clone().unwrap_or(Value::Null);
        debug!(method = %req.method, id = %id, session_id = ?session_id, "handling JSON-RPC request");

        if matches!(req.id, Some(Value::Null)) {
            return JsonRpcResponse::failure(id, INVALID_REQUEST, "id must not be null");
        }

        if req.jsonrpc.as_deref().is_some_and(|v| v != "2.0") {
            return JsonRpcResponse::failure(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"");
        }

        match req.method.as_str() {
            METHOD_INITIALIZE => self.initialize(id, req.params),
            METHOD_PING => JsonRpcResponse::success(id, json!({})),
            METHOD_TOOLS_LIST => self.tools_list(id),
            METHOD_RESOURCES_LIST => JsonRpcResponse::success(id, json!({ "resources": [] })),
            METHOD_TOOLS_CALL => {
                let Some(session_id) = session_id else {
                    return JsonRpcResponse::failure(
                        id,
                        INVALID_REQUEST,
                        "Mcp-Session-Id header is required",
                    );
                };
                let ctx = CallContext {
                    session_id: session_id.to_string(),
                    base_url: base_url.to_string(),
                };
                self.tools_call(id, req.params, &ctx).await
            }
            _ => {
                debug!(method = %req.method, "unknown method");
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "Method not found")
            }
        }
    }

    fn initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        let protocol_version = params
            .protocol_version
            .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string());
        debug!(protocol_version = %protocol_version, "initialize handshake");

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": protocol_version,
                "capabilities": {
                    "tools": { "listChanged": true },
                    "resources": { "subscribe": true, "listChanged": true },
                    "logging": {}
                },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": INSTRUCTIONS
            }),
        )
    }

    fn tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .catalog
            .list()
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": { "type": "object", "properties": {} }
                })
            })
            .collect();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn tools_call(
        &self,
        id: Value,
        params: Option<Value>,
        ctx: &CallContext,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("invalid params: {}", e))
            }
            None => return JsonRpcResponse::failure(id, INVALID_PARAMS, "missing params"),
        };

        if !self.catalog.contains(&params.name) {
            return JsonRpcResponse::failure(
                id,
                INVALID_PARAMS,
                format!("tool '{}' not found", params.name),
            );
        }

        let outcome = self.gate.invoke(ctx, &params.name).await;
        debug!(session_id = %ctx.session_id, tool = %params.name, outcome = outcome.kind(), "tool call finished");

        match call_tool_result(outcome) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
        }
    }
}

/// Encode a gate outcome as an MCP `CallToolResult`.
pub fn call_tool_result(outcome: ToolOutcome) -> crate::Result<Value> {
    let (text, is_error) = match outcome {
        ToolOutcome::Data(bytes) => match String::from_utf8(bytes) {
            Ok(text) => (text, false),
            Err(_) => ("error reading test data file: not valid UTF-8".to_string(), true),
        },
        ToolOutcome::LoginRequired(challenge) => (serde_json::to_string(&challenge)?, false),
        ToolOutcome::Forbidden(message) | ToolOutcome::DataUnavailable(message) => (message, true),
    };

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    }))
}

/// =============================
/// HTTP Endpoint
/// =============================

fn new_session_id() -> String {
    format!("mcp-session-{}", uuid::Uuid::new_v4())
}

fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Base for login URLs: configured value, else the request's own host.
fn base_url_for(state: &ApiState, headers: &HeaderMap) -> String {
    if let Some(base) = &state.config.public_base_url {
        return base.clone();
    }
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| format!("http://{}", host))
        .unwrap_or_else(|| format!("http://localhost:{}", state.config.port))
}

fn rpc_error(code: i64, message: String) -> Response {
    Json(JsonRpcResponse::failure(Value::Null, code, message)).into_response()
}

pub async fn handle_stream(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return rpc_error(PARSE_ERROR, format!("Parse error: {}", e)),
    };
    if message.is_array() {
        return rpc_error(INVALID_REQUEST, "batch requests are not supported".to_string());
    }
    let req: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(r) => r,
        Err(e) => return rpc_error(INVALID_REQUEST, format!("Invalid request: {}", e)),
    };

    let mut session_id = session_from_headers(&headers);

    if req.id.is_none() {
        debug!(method = %req.method, "notification accepted");
        return StatusCode::ACCEPTED.into_response();
    }

    if req.method == METHOD_TOOLS_CALL && session_id.is_none() {
        warn!("tools/call without session header");
        return (StatusCode::BAD_REQUEST, "Mcp-Session-Id header is required").into_response();
    }

    if req.method == METHOD_INITIALIZE && session_id.is_none() {
        session_id = Some(new_session_id());
    }

    let base_url = base_url_for(&state, &headers);
    let response = state
        .mcp
        .handle(req, session_id.as_deref(), &base_url)
        .await;

    let mut http_response = Json(response).into_response();
    if let Some(value) = session_id.and_then(|id| HeaderValue::from_str(&id).ok()) {
        http_response.headers_mut().insert(SESSION_HEADER, value);
    }
    http_response
}
