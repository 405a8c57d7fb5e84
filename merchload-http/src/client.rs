//! HTTP client implementation

use crate::config::HttpConfig;
use crate::errors::HttpError;
use crate::types::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};
use parking_lot::Mutex;
use reqwest::{
    self,
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace};

/// HTTP client trait the scenario issues its requests through
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Send one request and read the whole response.
    ///
    /// Any status code is a successful send; only transport failures and
    /// malformed requests are errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Canned response served in offline mode
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl MockResponse {
    pub fn ok(body: JsonValue) -> Self {
        Self { status: 200, body }
    }

    pub fn with_status(status: u16, body: JsonValue) -> Self {
        Self { status, body }
    }
}

/// HTTP Manager for handling HTTP requests with mock support
#[derive(Debug, Clone)]
pub struct HttpManager {
    offline: bool,
    mocks: HashMap<String, MockResponse>,
    journal: Option<Arc<Mutex<Vec<HttpRequest>>>>,
    client: Client,
    config: HttpConfig,
}

impl HttpManager {
    /// Create a new HttpManager in online mode with default configuration
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a new HttpManager with specific configuration
    pub fn with_config(config: HttpConfig) -> Result<Self, HttpError> {
        debug!(
            "Creating HttpManager with timeout: {}s, pool size: {}",
            config.timeout.as_secs(),
            config.pool_max_idle_per_host
        );

        // One client for the whole run so keep-alive connections are shared
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .redirect(reqwest::redirect::Policy::limited(
                config.max_redirects as usize,
            ))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .build()?;

        Ok(Self {
            offline: false,
            mocks: HashMap::new(),
            journal: None,
            client,
            config,
        })
    }

    /// Create a manager in offline mode with no mocks
    pub fn offline() -> Result<Self, HttpError> {
        let mut manager = Self::new()?;
        manager.set_offline();
        Ok(manager)
    }

    /// Set offline mode
    pub fn set_offline(&mut self) {
        self.offline = true;
        debug!("HttpManager set to offline mode");
    }

    /// Set online mode
    pub fn set_online(&mut self) {
        self.offline = false;
        debug!("HttpManager set to online mode");
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Add a single HTTP mock.
    ///
    /// The URL matches exactly, or as a prefix of the requested URL; the
    /// longest matching prefix wins.
    pub fn add_mock(&mut self, method: HttpMethod, url: &str, response: MockResponse) {
        let key = mock_key(method, url);
        self.mocks.insert(key, response);
        debug!("Added HTTP mock for {} {}", method, url);
    }

    /// Add HTTP mocks to the manager
    pub fn add_mocks(&mut self, mocks: impl IntoIterator<Item = (HttpMethod, String, MockResponse)>) {
        for (method, url, response) in mocks {
            self.add_mock(method, &url, response);
        }
        debug!("HttpManager holds {} HTTP mocks", self.mocks.len());
    }

    /// Clear all mocks
    pub fn clear_mocks(&mut self) {
        self.mocks.clear();
        debug!("Cleared all HTTP mocks");
    }

    /// Record every request served in offline mode.
    ///
    /// Clones share the journal. Without this the manager keeps nothing.
    pub fn with_journal(mut self) -> Self {
        self.journal = Some(Arc::new(Mutex::new(Vec::new())));
        self
    }

    /// Requests served in offline mode, oldest first
    pub fn journal(&self) -> Vec<HttpRequest> {
        self.journal
            .as_ref()
            .map(|journal| journal.lock().clone())
            .unwrap_or_default()
    }

    fn find_mock(&self, method: HttpMethod, url: &str) -> Option<&MockResponse> {
        if let Some(response) = self.mocks.get(&mock_key(method, url)) {
            return Some(response);
        }

        self.mocks
            .iter()
            .filter_map(|(key, response)| {
                let (mock_method, mock_url) = key.split_once(':')?;
                (mock_method.eq_ignore_ascii_case(method.as_str()) && url.starts_with(mock_url))
                    .then_some((mock_url.len(), response))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, response)| response)
    }

    fn send_offline(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mock = self.find_mock(request.method, &request.url).cloned();
        let method = request.method;
        let url = request.url.clone();
        if let Some(journal) = &self.journal {
            journal.lock().push(request);
        }

        match mock {
            Some(mock) => {
                trace!("Serving mock response {} for {} {}", mock.status, method, url);
                Ok(HttpResponse::new(mock.status, ResponseBody::Json(mock.body)))
            }
            None => {
                debug!("No matching mock response found for {} {}", method, url);
                Err(HttpError::NoMock {
                    method: method.to_string(),
                    url,
                })
            }
        }
    }

    fn build_headers(request: &HttpRequest) -> Result<HeaderMap, HttpError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in &request.headers {
            let header_name = HeaderName::from_str(key)
                .map_err(|_| HttpError::InvalidHeaderName(key.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| HttpError::InvalidHeaderValue(key.to_string()))?;
            header_map.append(header_name, header_value);
        }
        Ok(header_map)
    }
}

#[async_trait::async_trait]
impl HttpClient for HttpManager {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        if self.offline {
            return self.send_offline(request);
        }

        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", request.url, e)))?;

        trace!("Sending {} {}", request.method, url);
        let mut builder = self
            .client
            .request(reqwest::Method::from(request.method), url)
            .headers(Self::build_headers(&request)?);

        if let Some(body) = &request.json {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let bytes = response.bytes().await?;

        trace!("{} {} -> {} ({} bytes)", request.method, request.url, status, bytes.len());

        Ok(HttpResponse {
            status,
            headers,
            body: ResponseBody::from_bytes(&bytes),
        })
    }
}

fn mock_key(method: HttpMethod, url: &str) -> String {
    format!("{}:{}", method.as_str(), url)
}
