//! End-to-end tests driving a full gateway over real sockets.
//!
//! Each test wires the gateway the way the binary does, with the in-process
//! backend pointing every instance at a local upstream server, then talks to
//! the gateway over HTTP like an agent framework would.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use sandgate::{
    activation::{ActivationRouter, ActivityTracker, EndpointResolver, ProxyClient, WaitQueue},
    backend::{MemoryBackend, MemoryBackendConfig},
    config::{
        EnvironmentCatalog, LifecycleConfig, ProxyConfig, ResolverConfig, MCP_PROTOCOL_VERSION,
        MCP_SESSION_HEADER,
    },
    lifecycle::SandboxController,
    server::{create_router, ServerState},
    session::{SessionCache, ToolExecutor},
    store::WorkloadStore,
};

//--------------------------------------------------------------------------------------------------
// Helpers
//--------------------------------------------------------------------------------------------------

struct TestGateway {
    base: String,
    http: reqwest::Client,
    tracker: ActivityTracker,
}

/// Serves what a sandbox instance would: a tool endpoint at /mcp and an
/// echoing application for everything else.
async fn spawn_upstream() -> anyhow::Result<SocketAddr> {
    let app = Router::new().route("/mcp", post(serve_rpc)).fallback(echo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(addr)
}

async fn echo(req: Request) -> Json<Value> {
    let headers = req.headers();

    Json(json!({
        "uri": req.uri().to_string(),
        "method": req.method().as_str(),
        "has_request_id": headers.contains_key("x-request-id"),
        "has_proxy_connection": headers.contains_key("proxy-connection"),
    }))
}

fn rpc_result(id: Value, result: Value) -> Response {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result })).into_response()
}

async fn serve_rpc(headers: HeaderMap, Json(request): Json<Value>) -> Response {
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    if id.is_null() {
        return StatusCode::ACCEPTED.into_response();
    }

    match method {
        "initialize" => (
            [(MCP_SESSION_HEADER, "sess-e2e")],
            rpc_result(id, json!({ "protocolVersion": MCP_PROTOCOL_VERSION })),
        )
            .into_response(),
        "ping" if headers.contains_key(MCP_SESSION_HEADER) => rpc_result(id, json!({})),
        "tools/list" => rpc_result(
            id,
            json!({
                "tools": [{ "name": "shell_exec", "description": "Run a shell command" }],
            }),
        ),
        "tools/call" => {
            let params = request.get("params").cloned().unwrap_or(Value::Null);
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

            rpc_result(
                id,
                json!({
                    "content": [
                        { "type": "text", "text": format!("{name}:{arguments}") },
                    ],
                    "isError": false,
                }),
            )
        }
        _ => rpc_result(id, json!({})),
    }
}

/// Wires a complete gateway against the upstream port and serves it on a
/// random local port.
async fn spawn_gateway(upstream_port: u16) -> anyhow::Result<TestGateway> {
    let backend = Arc::new(MemoryBackend::with_config(MemoryBackendConfig {
        instance_address: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        ..Default::default()
    }));
    let store = WorkloadStore::new(backend, "default".to_string());

    let controller = Arc::new(SandboxController::new(
        store.clone(),
        LifecycleConfig {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_secs(2),
        },
    ));
    let tracker = ActivityTracker::new(store.clone());
    let resolver = EndpointResolver::new(
        store,
        ResolverConfig {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_millis(800),
            instance_port: upstream_port,
        },
    );
    let proxy = ProxyClient::new(ProxyConfig::default());
    let queue = WaitQueue::new(8);
    let router = Arc::new(ActivationRouter::new(
        resolver.clone(),
        tracker.clone(),
        proxy,
        queue,
    ));
    let executor = Arc::new(ToolExecutor::new(resolver, SessionCache::default()));
    let environments = Arc::new(EnvironmentCatalog::default_catalog());

    let state = ServerState::new(controller, router, executor, environments);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TestGateway {
        base: format!("http://{addr}"),
        http: reqwest::Client::new(),
        tracker,
    })
}

async fn launch() -> anyhow::Result<TestGateway> {
    let upstream = spawn_upstream().await?;
    spawn_gateway(upstream.port()).await
}

async fn create_sandbox(gateway: &TestGateway, name: &str) -> anyhow::Result<reqwest::Response> {
    Ok(gateway
        .http
        .post(format!("{}/api/v1/sandboxes", gateway.base))
        .json(&json!({ "name": name, "type": "shell" }))
        .send()
        .await?)
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test)]
async fn test_sandbox_lifecycle_over_rest() -> anyhow::Result<()> {
    let gateway = launch().await?;

    let created = create_sandbox(&gateway, "alpha").await?;
    assert_eq!(created.status(), StatusCode::OK);
    let body: Value = created.json().await?;
    assert_eq!(body["code"], "0");
    assert_eq!(body["data"]["name"], "alpha");
    assert_eq!(body["data"]["image"], "alpine:latest");
    assert_eq!(body["data"]["status"], "creating");

    let duplicate = create_sandbox(&gateway, "alpha").await?;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    let body: Value = duplicate.json().await?;
    assert_eq!(body["error_type"], "already_exists");

    let listed = gateway
        .http
        .get(format!("{}/api/v1/sandboxes", gateway.base))
        .send()
        .await?;
    let body: Value = listed.json().await?;
    assert_eq!(body["data"][0]["name"], "alpha");

    let fetched = gateway
        .http
        .get(format!("{}/api/v1/sandboxes/alpha", gateway.base))
        .send()
        .await?;
    assert_eq!(fetched.status(), StatusCode::OK);

    let deleted = gateway
        .http
        .delete(format!("{}/api/v1/sandboxes/alpha", gateway.base))
        .send()
        .await?;
    assert_eq!(deleted.status(), StatusCode::OK);
    let body: Value = deleted.json().await?;
    assert_eq!(body["data"]["message"], "sandbox alpha deleted");

    let gone = gateway
        .http
        .get(format!("{}/api/v1/sandboxes/alpha", gateway.base))
        .send()
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    let gone = gateway
        .http
        .delete(format!("{}/api/v1/sandboxes/alpha", gateway.base))
        .send()
        .await?;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_invalid_spec_is_rejected() -> anyhow::Result<()> {
    let gateway = launch().await?;

    let response = create_sandbox(&gateway, "Not A Dns Label").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await?;
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(body["code"], 400);

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_activation_proxies_and_records_activity() -> anyhow::Result<()> {
    let gateway = launch().await?;
    create_sandbox(&gateway, "proxy-me").await?;

    let response = gateway
        .http
        .post(format!("{}/sandbox/proxy-me/run/task?q=1", gateway.base))
        .body("payload")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let seen: Value = response.json().await?;
    assert_eq!(seen["uri"], "/run/task?q=1");
    assert_eq!(seen["method"], "POST");
    assert_eq!(seen["has_request_id"], true);
    assert_eq!(seen["has_proxy_connection"], false);

    // Activity lands asynchronously once the response body completes.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(gateway.tracker.last_request_time("proxy-me").await.is_some());
    assert!(gateway.tracker.last_response_time("proxy-me").await.is_some());

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_activation_root_path_reaches_instance_root() -> anyhow::Result<()> {
    let gateway = launch().await?;
    create_sandbox(&gateway, "rooted").await?;

    let response = gateway
        .http
        .get(format!("{}/sandbox/rooted", gateway.base))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let seen: Value = response.json().await?;
    assert_eq!(seen["uri"], "/");

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_activation_of_unknown_sandbox_times_out() -> anyhow::Result<()> {
    let gateway = launch().await?;

    let response = gateway
        .http
        .get(format!("{}/sandbox/ghost/anything", gateway.base))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(response.text().await?.contains("ghost"));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_tool_session_round_trip() -> anyhow::Result<()> {
    let gateway = launch().await?;
    create_sandbox(&gateway, "tooled").await?;

    let tools = gateway
        .http
        .get(format!("{}/api/v1/sandboxes/tooled/tools", gateway.base))
        .send()
        .await?;
    assert_eq!(tools.status(), StatusCode::OK);
    let body: Value = tools.json().await?;
    assert_eq!(body["code"], "0");
    assert_eq!(body["data"][0]["name"], "shell_exec");

    for _ in 0..2 {
        let outcome = gateway
            .http
            .post(format!(
                "{}/api/v1/sandboxes/tooled/tools/call",
                gateway.base
            ))
            .json(&json!({ "tool_name": "shell_exec", "arguments": { "command": "ls" } }))
            .send()
            .await?;
        assert_eq!(outcome.status(), StatusCode::OK);

        let body: Value = outcome.json().await?;
        assert_eq!(body["data"]["is_error"], false);
        assert_eq!(body["data"]["content"], r#"shell_exec:{"command":"ls"}"#);
    }

    Ok(())
}

#[test_log::test(tokio::test)]
async fn test_environments_and_health() -> anyhow::Result<()> {
    let gateway = launch().await?;

    let health = gateway
        .http
        .get(format!("{}/healthz", gateway.base))
        .send()
        .await?;
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await?, "OK");

    let environments = gateway
        .http
        .get(format!("{}/api/v1/environments", gateway.base))
        .send()
        .await?;
    assert_eq!(environments.status(), StatusCode::OK);

    let body: Value = environments.json().await?;
    assert_eq!(body["data"][0]["name"], "aio");
    assert!(body["data"][0].get("image").is_none());

    Ok(())
}
