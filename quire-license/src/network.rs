//! HTTP seam to the status authority.
//!
//! The engine only needs to issue simple requests with form parameters and
//! read back a status code and body. Non-2xx responses are returned as
//! values; `Err` is reserved for transport failures.

use crate::error::LicenseResult;
use async_trait::async_trait;
use std::fmt;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        })
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    /// Sent as the query string for GET and as a form body otherwise.
    pub params: Vec<(String, String)>,
}

impl HttpRequest {
    fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            params: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, url)
    }

    /// Appends parameters.
    #[must_use]
    pub fn with_params(mut self, params: &[(&str, &str)]) -> Self {
        self.params
            .extend(params.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));
        self
    }

    /// Returns the value of the first parameter named `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A response from the status authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

/// Transport used to reach the status authority.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request. Fails only when no response was received.
    async fn fetch(&self, request: HttpRequest) -> LicenseResult<HttpResponse>;
}

#[cfg(feature = "online")]
pub use online::ReqwestClient;

#[cfg(feature = "online")]
mod online {
    use super::*;
    use crate::config::LcpConfig;
    use crate::error::LicenseError;
    use reqwest::Client;
    use std::time::Duration;
    use tracing::debug;

    /// [`HttpClient`] backed by reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: Client,
    }

    impl ReqwestClient {
        pub fn new(config: &LcpConfig) -> LicenseResult<Self> {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.http_timeout_secs))
                .user_agent(config.user_agent.clone())
                .build()
                .map_err(|e| LicenseError::Network(format!("failed to create HTTP client: {e}")))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpClient for ReqwestClient {
        async fn fetch(&self, request: HttpRequest) -> LicenseResult<HttpResponse> {
            debug!("{} {}", request.method, request.url);

            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
                HttpMethod::Put => self.client.put(&request.url),
            };
            if !request.params.is_empty() {
                builder = match request.method {
                    HttpMethod::Get => builder.query(&request.params),
                    HttpMethod::Post | HttpMethod::Put => builder.form(&request.params),
                };
            }

            let response = builder.send().await.map_err(|e| {
                LicenseError::Network(format!("{} {} failed: {e}", request.method, request.url))
            })?;
            let status = response.status().as_u16();
            let body = response
                .bytes()
                .await
                .map_err(|e| LicenseError::Network(format!("read response body failed: {e}")))?;

            Ok(HttpResponse::new(status, body.to_vec()))
        }
    }
}

/// Mock transport for testing.
pub mod mock {
    use super::*;
    use crate::error::LicenseError;
    use std::sync::{Mutex, PoisonError};

    #[derive(Debug, Clone)]
    enum Reply {
        Respond(HttpResponse),
        Fail(String),
    }

    #[derive(Debug, Clone)]
    struct Route {
        method: HttpMethod,
        url_prefix: String,
        reply: Reply,
    }

    /// Scripted [`HttpClient`] that records every request.
    ///
    /// Requests are matched against routes by method and URL prefix; the most
    /// recently added matching route wins. Unmatched requests fail as a
    /// network error.
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        routes: Mutex<Vec<Route>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answers matching requests with `status` and `body`.
        pub fn respond(
            &self,
            method: HttpMethod,
            url_prefix: impl Into<String>,
            status: u16,
            body: impl Into<Vec<u8>>,
        ) {
            self.route(method, url_prefix, Reply::Respond(HttpResponse::new(status, body)));
        }

        /// Fails matching requests as if the network were down.
        pub fn fail(&self, method: HttpMethod, url_prefix: impl Into<String>, message: impl Into<String>) {
            self.route(method, url_prefix, Reply::Fail(message.into()));
        }

        fn route(&self, method: HttpMethod, url_prefix: impl Into<String>, reply: Reply) {
            self.routes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Route {
                    method,
                    url_prefix: url_prefix.into(),
                    reply,
                });
        }

        /// All requests received so far, in order.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn fetch(&self, request: HttpRequest) -> LicenseResult<HttpResponse> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());

            let reply = self
                .routes
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .rev()
                .find(|r| r.method == request.method && request.url.starts_with(&r.url_prefix))
                .map(|r| r.reply.clone());

            match reply {
                Some(Reply::Respond(response)) => Ok(response),
                Some(Reply::Fail(message)) => Err(LicenseError::Network(message)),
                None => Err(LicenseError::Network(format!(
                    "no route for {} {}",
                    request.method, request.url
                ))),
            }
        }
    }
}
