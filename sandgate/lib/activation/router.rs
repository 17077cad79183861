//! Per-request activation flow: record, admit, resolve, proxy.

use axum::body::Body;
use http::{Request, Response, StatusCode, Uri};

use crate::{SandgateError, SandgateResult};

use super::{ActivityTracker, CompletionBody, EndpointResolver, ProxyClient, WaitQueue};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Routes inbound sandbox traffic to live instances.
///
/// Each request records a last-request event, takes an admission slot,
/// resolves an endpoint (riding out backend cache lag), proxies the
/// exchange, and records a last-response event once the response body
/// completes. Activity recording is detached and can never fail a request.
pub struct ActivationRouter {
    resolver: EndpointResolver,
    tracker: ActivityTracker,
    proxy: ProxyClient,
    queue: WaitQueue,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl ActivationRouter {
    /// Creates a router from its collaborators.
    pub fn new(
        resolver: EndpointResolver,
        tracker: ActivityTracker,
        proxy: ProxyClient,
        queue: WaitQueue,
    ) -> Self {
        Self {
            resolver,
            tracker,
            proxy,
            queue,
        }
    }

    /// Activates the named sandbox for one request and proxies it.
    ///
    /// The admission slot is held until the instance answers, which covers
    /// the whole cold-start wait inside endpoint resolution. The
    /// last-response event fires when the response body completes, whether
    /// it streamed to the end, failed, or the client went away first.
    pub async fn activate(
        &self,
        name: &str,
        req: Request<Body>,
    ) -> SandgateResult<Response<Body>> {
        let path_and_query = strip_route_prefix(req.uri(), name).ok_or_else(|| {
            SandgateError::validation(format!("request path does not address sandbox {name}"))
        })?;

        self.tracker.record_last_request(name);

        let _slot = self.queue.acquire(name)?;
        let endpoint = self.resolver.resolve(name).await?;

        tracing::debug!(
            sandbox = %name,
            instance = %endpoint.instance,
            target = %path_and_query,
            "activating"
        );

        let response = self
            .proxy
            .forward(&endpoint.authority, &path_and_query, req)
            .await?;

        let tracker = self.tracker.clone();
        let name = name.to_string();
        let (parts, body) = response.into_parts();
        let body = Body::new(CompletionBody::new(body, move || {
            tracker.record_last_response(&name);
        }));

        Ok(Response::from_parts(parts, body))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Splits the `/sandbox/{name}` routing prefix off a request target.
///
/// Returns the remainder with its query preserved, normalized to start at
/// `/`. `None` when the path does not address the given sandbox.
pub fn strip_route_prefix(uri: &Uri, name: &str) -> Option<String> {
    let rest = uri.path().strip_prefix("/sandbox/")?.strip_prefix(name)?;

    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }

    let forwarded = if rest.is_empty() { "/" } else { rest };
    match uri.query() {
        Some(query) => Some(format!("{forwarded}?{query}")),
        None => Some(forwarded.to_string()),
    }
}

/// Maps an activation failure to its gateway status code.
pub fn error_status(error: &SandgateError) -> StatusCode {
    match error {
        SandgateError::Validation(_) => StatusCode::BAD_REQUEST,
        SandgateError::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
        SandgateError::ResolutionTimeout(_) | SandgateError::UpstreamTimeout(_) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
