//! The async seam between the Crudly facade and an HTTP stack.
//!
//! # Design
//! `Transport` executes one `HttpRequest` and returns the `HttpResponse` as
//! data, whatever its status. Status interpretation belongs to the client,
//! so a transport must not turn 4xx/5xx into errors. Failures that prevent a
//! response (connect, TLS, timeouts) come back as `TransportError` and are
//! surfaced to the caller unchanged.
//!
//! `UreqTransport` runs a blocking `ureq` agent on tokio's blocking pool.

use std::fmt;
use std::future::Future;

use tracing::trace;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Error produced by a transport, passed through as-is.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Executes HTTP requests on behalf of `Crudly`.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// Default transport backed by `ureq`.
///
/// `send` hands the request to `tokio::task::spawn_blocking` and panics when
/// polled outside a Tokio runtime.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent. It must have `http_status_as_error(false)`
    /// or error statuses will surface as transport errors.
    pub fn with_agent(agent: Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        let response = tokio::task::spawn_blocking(move || execute(&agent, request)).await??;
        Ok(response)
    }
}

fn execute(agent: &Agent, request: HttpRequest) -> Result<HttpResponse, ureq::Error> {
    let HttpRequest {
        method,
        url,
        headers,
        body,
    } = request;
    trace!(%method, %url, "ureq round-trip");

    let mut response = match method {
        HttpMethod::Get => without_body(agent.get(&url), &headers),
        HttpMethod::Delete => without_body(agent.delete(&url), &headers),
        HttpMethod::Post => with_body(agent.post(&url), &headers, body),
        HttpMethod::Put => with_body(agent.put(&url), &headers, body),
        HttpMethod::Patch => with_body(agent.patch(&url), &headers, body),
    }?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string()?;

    Ok(HttpResponse { status, headers, body })
}

fn apply_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn without_body(
    builder: RequestBuilder<WithoutBody>,
    headers: &[(String, String)],
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    apply_headers(builder, headers).call()
}

fn with_body(
    builder: RequestBuilder<WithBody>,
    headers: &[(String, String)],
    body: Option<String>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = apply_headers(builder, headers);
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
