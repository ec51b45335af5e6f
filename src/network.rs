//! Network access for the worker
//!
//! `Fetcher` is the seam between the cache policy and the transport. The
//! production implementation wraps a blocking `ureq` agent; tests supply
//! their own fetchers.

use crate::config::schema::NetworkConfig;
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Method, Request, RequestMode, Response, ResponseType};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use ureq::ResponseExt;
use url::{Origin, Url};

/// Abstract network interface
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send a request and return whatever the server answered.
    ///
    /// Any HTTP status is a successful fetch; only transport failures
    /// (offline, DNS, timeout) are errors.
    async fn fetch(&self, request: Request) -> PrecacheResult<Response>;
}

/// Classify a response the way a browser would for a page on `origin`
pub fn classify_response(origin: &Origin, url: &Url, mode: RequestMode) -> ResponseType {
    if url.origin() == *origin {
        ResponseType::Basic
    } else {
        match mode {
            RequestMode::Cors => ResponseType::Cors,
            RequestMode::NoCors => ResponseType::Opaque,
        }
    }
}

/// HTTP(S) fetcher backed by `ureq`
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    origin: Origin,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher for pages served from `origin`
    pub fn new(origin: &Url, config: &NetworkConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout_secs.map(Duration::from_secs))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            origin: origin.origin(),
            user_agent: config.user_agent.clone(),
        }
    }

    /// Blocking part of a fetch, run on the blocking pool
    fn fetch_blocking(&self, mut request: Request) -> PrecacheResult<Response> {
        let url = request.url().clone();
        let mode = request.mode();
        let body = request.take_body()?;

        let mut builder = ureq::http::Request::builder()
            .method(request.method().as_str())
            .uri(url.as_str());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let has_user_agent = request
            .headers()
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"));
        if !has_user_agent {
            builder = builder.header("user-agent", self.user_agent.as_str());
        }

        let bodyless = [Method::GET, Method::HEAD, Method::DELETE, Method::OPTIONS]
            .contains(request.method());
        let sent = if bodyless {
            let http_request = builder
                .body(())
                .map_err(|e| PrecacheError::network(url.as_str(), e.to_string()))?;
            self.agent.run(http_request)
        } else {
            let http_request = builder
                .body(body)
                .map_err(|e| PrecacheError::network(url.as_str(), e.to_string()))?;
            self.agent.run(http_request)
        };

        let mut http_response =
            sent.map_err(|e| PrecacheError::network(url.as_str(), e.to_string()))?;

        let status = http_response.status();
        let headers: Vec<(String, String)> = http_response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = http_response
            .body_mut()
            .read_to_vec()
            .map_err(|e| PrecacheError::network(url.as_str(), e.to_string()))?;

        // Redirects are followed, so classify by where the body came from
        let final_url = final_url(&http_response, &url);
        let response_type = classify_response(&self.origin, &final_url, mode);
        debug!(
            "Fetched {} {} -> {} {} ({}, {} bytes)",
            request.method(),
            url,
            status.as_u16(),
            final_url,
            response_type,
            bytes.len()
        );

        let mut response =
            Response::new(status.as_u16(), response_type, bytes).with_url(final_url.as_str());
        response.headers = headers;
        Ok(response)
    }
}

/// URL the response was finally served from, after any redirects
fn final_url(response: &ureq::http::Response<ureq::Body>, requested: &Url) -> Url {
    let uri = response.get_uri().to_string();
    Url::parse(&uri).unwrap_or_else(|_| requested.clone())
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: Request) -> PrecacheResult<Response> {
        let fetcher = self.clone();
        let url = request.url().to_string();
        tokio::task::spawn_blocking(move || fetcher.fetch_blocking(request))
            .await
            .map_err(|e| PrecacheError::network(url, format!("fetch task failed: {}", e)))?
    }
}
