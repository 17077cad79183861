//! One-shot reverse proxying to resolved instances.

use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    task::{Context, Poll},
    time::{SystemTime, UNIX_EPOCH},
};

use axum::body::Body;
use bytes::Bytes;
use futures::future;
use http::{
    header::{CONNECTION, HOST, UPGRADE},
    HeaderMap, HeaderValue, Request, Response, StatusCode, Uri, Version,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use hyper::upgrade::OnUpgrade;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioIo},
};
use pin_project::{pin_project, pinned_drop};
use tokio::{
    io::{copy_bidirectional, AsyncWriteExt},
    time,
};

use crate::{
    config::{ProxyConfig, REQUEST_ID_HEADER},
    SandgateError, SandgateResult,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Headers that must not travel beyond one hop.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "proxy-connection",
];

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Source of strictly increasing correlation values.
///
/// Each stamp starts from the wall clock in nanoseconds and is bumped past
/// the previous stamp whenever the clock repeats or reads backwards.
#[derive(Debug, Default)]
pub struct RequestStamp {
    last: AtomicU64,
}

/// Shared outbound HTTP client for proxied requests.
///
/// One pooled hyper client serves every activation; connections to an
/// instance are kept alive and reused across requests for as long as the
/// pool holds them.
#[derive(Clone)]
pub struct ProxyClient {
    client: Client<HttpConnector, Body>,
    config: ProxyConfig,
    stamp: Arc<RequestStamp>,
}

/// Response body that reports completion exactly once.
///
/// Completion covers the three ways a proxied response can end: the stream
/// finishing, the stream failing, and the client going away before either.
#[pin_project(PinnedDrop)]
pub struct CompletionBody {
    #[pin]
    inner: Body,
    on_complete: Option<Box<dyn FnOnce() + Send + 'static>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl RequestStamp {
    /// Creates a stamp source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next stamp, strictly greater than all previous ones.
    pub fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0);

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => prev = observed,
            }
        }
    }
}

impl ProxyClient {
    /// Builds the pooled client from proxy transport settings.
    pub fn new(config: ProxyConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(config.dial_timeout));
        connector.set_keepalive(Some(config.tcp_keepalive));

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_idle_timeout(config.pool_idle_timeout);
        builder.pool_max_idle_per_host(config.pool_max_idle_per_host);
        let client: Client<HttpConnector, Body> = builder.build(connector);

        Self {
            client,
            config,
            stamp: Arc::new(RequestStamp::new()),
        }
    }

    /// Forwards a request to the resolved authority and returns the
    /// upstream response.
    ///
    /// The caller has already stripped the routing prefix; `path_and_query`
    /// is the target as the instance should see it. The request is stamped
    /// with a fresh correlation value, hop-by-hop headers are removed in
    /// both directions, and an upgrade handshake is spliced through when
    /// both sides agree to switch protocols.
    pub async fn forward(
        &self,
        authority: &str,
        path_and_query: &str,
        mut req: Request<Body>,
    ) -> SandgateResult<Response<Body>> {
        let upgrading = wants_upgrade(&req);
        let client_upgrade = upgrading
            .then(|| req.extensions_mut().remove::<OnUpgrade>())
            .flatten();
        let upgrade_protocol = req.headers().get(UPGRADE).cloned();

        let uri = Uri::try_from(format!("http://{authority}{path_and_query}"))
            .map_err(http::Error::from)?;
        *req.uri_mut() = uri;
        *req.version_mut() = Version::HTTP_11;

        strip_hop_by_hop(req.headers_mut());
        if upgrading {
            // The upgrade intent has to survive to the instance.
            req.headers_mut()
                .insert(CONNECTION, HeaderValue::from_static("upgrade"));
            if let Some(protocol) = upgrade_protocol {
                req.headers_mut().insert(UPGRADE, protocol);
            }
        }

        req.headers_mut().insert(
            HOST,
            HeaderValue::from_str(authority).map_err(http::Error::from)?,
        );
        req.headers_mut()
            .insert(REQUEST_ID_HEADER, HeaderValue::from(self.stamp.next()));

        tracing::debug!(method = %req.method(), uri = %req.uri(), upgrading, "forwarding");

        let outcome = time::timeout(
            self.config.response_header_timeout,
            self.client.request(req),
        )
        .await;
        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(SandgateError::upstream(format!(
                    "request to {authority} failed: {e}"
                )));
            }
            Err(_) => return Err(SandgateError::UpstreamTimeout(authority.to_string())),
        };

        if response.status() == StatusCode::SWITCHING_PROTOCOLS {
            match client_upgrade {
                Some(client_upgrade) => {
                    let upstream_upgrade = hyper::upgrade::on(&mut response);
                    tokio::spawn(splice_upgraded(client_upgrade, upstream_upgrade));
                }
                None => {
                    return Err(SandgateError::upstream(
                        "instance switched protocols on a request that cannot upgrade",
                    ));
                }
            }
        }

        let (mut parts, body) = response.into_parts();
        if parts.status != StatusCode::SWITCHING_PROTOCOLS {
            strip_hop_by_hop(&mut parts.headers);
        }

        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

impl CompletionBody {
    /// Wraps a body, firing `on_complete` when it finishes by any path.
    pub fn new(inner: Body, on_complete: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner,
            on_complete: Some(Box::new(on_complete)),
        }
    }

    fn finish(self: Pin<&mut Self>) {
        if let Some(on_complete) = self.project().on_complete.take() {
            on_complete();
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl HttpBody for CompletionBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.as_mut().project().inner.poll_frame(cx) {
            Poll::Ready(None) => {
                self.finish();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                self.finish();
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[pinned_drop]
impl PinnedDrop for CompletionBody {
    fn drop(self: Pin<&mut Self>) {
        self.finish();
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Whether the request carries an HTTP upgrade intent.
pub fn wants_upgrade<B>(req: &Request<B>) -> bool {
    let connection_has_upgrade = req
        .headers()
        .get(CONNECTION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains("upgrade"))
        .unwrap_or(false);

    connection_has_upgrade && req.headers().contains_key(UPGRADE)
}

/// Removes hop-by-hop headers, including those named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    if let Some(connection) = headers
        .get(CONNECTION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
    {
        for token in connection.split(',') {
            let name = token.trim().to_ascii_lowercase();
            if !name.is_empty() {
                headers.remove(&name);
            }
        }
    }

    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Tunnels bytes between two upgraded connections until either side closes.
async fn splice_upgraded(client: OnUpgrade, upstream: OnUpgrade) {
    match future::try_join(client, upstream).await {
        Ok((client_upgraded, upstream_upgraded)) => {
            let mut client_io = TokioIo::new(client_upgraded);
            let mut upstream_io = TokioIo::new(upstream_upgraded);
            if let Err(e) = copy_bidirectional(&mut client_io, &mut upstream_io).await {
                tracing::warn!("upgrade tunnel error: {e}");
            }
            let _ = client_io.shutdown().await;
            let _ = upstream_io.shutdown().await;
        }
        Err(e) => tracing::warn!("upgrade handshake lost: {e}"),
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
