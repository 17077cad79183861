//! Tool-session client speaking JSON-RPC over streamable HTTP.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    config::{
        DEFAULT_SESSION_REQUEST_TIMEOUT, MCP_PROTOCOL_VERSION, MCP_SESSION_HEADER,
        SESSION_CLIENT_NAME, SESSION_CLIENT_VERSION,
    },
    SandgateError, SandgateResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const JSONRPC_VERSION: &str = "2.0";

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An established tool session with one sandbox instance.
///
/// Speaks Model Context Protocol over its streamable HTTP transport in
/// JSON mode: every call is a POST to `<endpoint>/mcp` carrying a JSON-RPC
/// envelope, with the server-assigned session identifier echoed back in a
/// header. The handshake runs once at connect time.
#[derive(Debug)]
pub struct ToolSession {
    http: reqwest::Client,
    url: String,
    session_id: Option<String>,
    next_id: AtomicU64,
}

/// A tool exposed by a sandbox instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// JSON schema of the tool arguments.
    #[serde(default, rename = "inputSchema", skip_serializing_if = "Value::is_null")]
    pub input_schema: Value,
}

/// Result of one tool invocation inside a sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Concatenated text content produced by the tool.
    pub content: String,

    /// Whether the tool reported failure.
    pub is_error: bool,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ToolSession {
    /// Connects to the instance's tool server and runs the initialization
    /// handshake.
    pub async fn connect(endpoint: &str) -> SandgateResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_SESSION_REQUEST_TIMEOUT)
            .build()?;

        let mut session = Self {
            http,
            url: format!("{}/mcp", endpoint.trim_end_matches('/')),
            session_id: None,
            next_id: AtomicU64::new(0),
        };

        if let Err(e) = session.handshake().await {
            return Err(SandgateError::SessionConnect(format!(
                "handshake with {} failed: {e}",
                session.url
            )));
        }
        tracing::debug!(url = %session.url, "tool session established");

        Ok(session)
    }

    /// Verifies the session is still alive on the server.
    pub async fn ping(&self) -> SandgateResult<()> {
        let request = self.request("ping", Value::Null);
        decode(self.post(&request).await?).await.map(|_| ())
    }

    /// Lists the tools the instance exposes.
    pub async fn list_tools(&self) -> SandgateResult<Vec<ToolDescriptor>> {
        let request = self.request("tools/list", Value::Null);
        let result = decode(self.post(&request).await?).await?;

        let tools = result
            .get("tools")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));

        Ok(serde_json::from_value(tools)?)
    }

    /// Invokes one tool and gathers its text output.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> SandgateResult<ToolOutcome> {
        let request = self.request(
            "tools/call",
            json!({ "name": tool, "arguments": arguments }),
        );
        let result = decode(self.post(&request).await?).await?;

        Ok(ToolOutcome::from_call_result(&result))
    }

    async fn handshake(&mut self) -> SandgateResult<()> {
        let request = self.request(
            "initialize",
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": SESSION_CLIENT_NAME,
                    "version": SESSION_CLIENT_VERSION,
                },
            }),
        );

        let response = self.post(&request).await?;
        if let Some(session_id) = response
            .headers()
            .get(MCP_SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }
        decode(response).await?;

        self.notify("notifications/initialized").await
    }

    async fn notify(&self, method: &str) -> SandgateResult<()> {
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params: Value::Null,
        };

        let response = self.post(&request).await?;
        if !response.status().is_success() {
            return Err(SandgateError::SessionProtocol {
                code: i64::from(response.status().as_u16()),
                message: format!("notification {method} rejected"),
            });
        }

        Ok(())
    }

    async fn post(&self, request: &JsonRpcRequest<'_>) -> SandgateResult<reqwest::Response> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request);
        if let Some(session_id) = &self.session_id {
            builder = builder.header(MCP_SESSION_HEADER, session_id.as_str());
        }

        Ok(builder.send().await?)
    }

    fn request<'a>(&self, method: &'a str, params: Value) -> JsonRpcRequest<'a> {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: Some(self.next_id.fetch_add(1, Ordering::Relaxed) + 1),
            method,
            params,
        }
    }
}

impl ToolOutcome {
    /// Gathers the text content of a `tools/call` result.
    fn from_call_result(result: &Value) -> Self {
        let content = result
            .get("content")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                    .filter_map(|item| item.get("text").and_then(Value::as_str))
                    .collect::<String>()
            })
            .unwrap_or_default();

        Self {
            content,
            is_error: result
                .get("isError")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

async fn decode(response: reqwest::Response) -> SandgateResult<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(SandgateError::SessionProtocol {
            code: i64::from(status.as_u16()),
            message: format!("tool server answered HTTP {status}"),
        });
    }

    let envelope: JsonRpcResponse = response.json().await?;
    if let Some(error) = envelope.error {
        return Err(SandgateError::SessionProtocol {
            code: error.code,
            message: error.message,
        });
    }

    Ok(envelope.result.unwrap_or(Value::Null))
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{
        extract::Json,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Router,
    };

    use super::*;

    const STUB_SESSION_ID: &str = "sess-1";

    async fn spawn_tool_server() -> anyhow::Result<SocketAddr> {
        let app = Router::new().route("/mcp", post(serve_rpc));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(addr)
    }

    fn rpc_result(id: Value, result: Value) -> Response {
        Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
    }

    fn rpc_error(id: Value, code: i64, message: &str) -> Response {
        Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message },
        }))
        .into_response()
    }

    async fn serve_rpc(headers: HeaderMap, Json(request): Json<Value>) -> Response {
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let id = request.get("id").cloned().unwrap_or(Value::Null);

        if id.is_null() {
            // Notifications are acknowledged without a body.
            return StatusCode::ACCEPTED.into_response();
        }

        match method {
            "initialize" => (
                [(MCP_SESSION_HEADER, STUB_SESSION_ID)],
                rpc_result(id, json!({ "protocolVersion": MCP_PROTOCOL_VERSION })),
            )
                .into_response(),
            "ping" => {
                let presented = headers
                    .get(MCP_SESSION_HEADER)
                    .and_then(|value| value.to_str().ok());
                if presented == Some(STUB_SESSION_ID) {
                    rpc_result(id, json!({}))
                } else {
                    rpc_error(id, -32001, "unknown session")
                }
            }
            "tools/list" => rpc_result(
                id,
                json!({
                    "tools": [{
                        "name": "shell_exec",
                        "description": "Run a shell command",
                        "inputSchema": { "type": "object" },
                    }],
                }),
            ),
            "tools/call" => {
                let params = request.get("params").cloned().unwrap_or(Value::Null);
                let name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

                match name {
                    "boom" => rpc_error(id, -32000, "tool exploded"),
                    "flaky" => rpc_result(
                        id,
                        json!({
                            "content": [{ "type": "text", "text": "it broke" }],
                            "isError": true,
                        }),
                    ),
                    _ => rpc_result(
                        id,
                        json!({
                            "content": [
                                { "type": "text", "text": format!("{name}:") },
                                { "type": "text", "text": arguments.to_string() },
                                { "type": "image", "data": "ignored" },
                            ],
                            "isError": false,
                        }),
                    ),
                }
            }
            _ => rpc_error(id, -32601, "method not found"),
        }
    }

    #[tokio::test]
    async fn test_connect_captures_session_and_pings() -> anyhow::Result<()> {
        let addr = spawn_tool_server().await?;
        let session = ToolSession::connect(&format!("http://{addr}")).await?;

        // Ping only succeeds when the captured session id is echoed back.
        session.ping().await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_list_tools() -> anyhow::Result<()> {
        let addr = spawn_tool_server().await?;
        let session = ToolSession::connect(&format!("http://{addr}")).await?;

        let tools = session.list_tools().await?;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "shell_exec");
        assert_eq!(tools[0].description, "Run a shell command");
        assert_eq!(tools[0].input_schema, json!({ "type": "object" }));

        Ok(())
    }

    #[tokio::test]
    async fn test_call_tool_concatenates_text_content() -> anyhow::Result<()> {
        let addr = spawn_tool_server().await?;
        let session = ToolSession::connect(&format!("http://{addr}")).await?;

        let outcome = session
            .call_tool("shell_exec", json!({ "command": "ls" }))
            .await?;

        assert!(!outcome.is_error);
        assert_eq!(outcome.content, r#"shell_exec:{"command":"ls"}"#);

        let failed = session.call_tool("flaky", Value::Null).await?;
        assert!(failed.is_error);
        assert_eq!(failed.content, "it broke");

        Ok(())
    }

    #[tokio::test]
    async fn test_protocol_error_carries_code() -> anyhow::Result<()> {
        let addr = spawn_tool_server().await?;
        let session = ToolSession::connect(&format!("http://{addr}")).await?;

        let err = session.call_tool("boom", Value::Null).await.unwrap_err();
        assert!(matches!(
            err,
            SandgateError::SessionProtocol { code: -32000, .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_connect_failure_is_session_connect() {
        // Nothing listens on port 9 of loopback.
        let err = ToolSession::connect("http://127.0.0.1:9").await.unwrap_err();
        assert!(matches!(err, SandgateError::SessionConnect(_)));
    }
}
