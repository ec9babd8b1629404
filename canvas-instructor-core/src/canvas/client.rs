//! # Canvas client: the paginated request engine
//!
//! [`CanvasClient::fetch_all`] is the single entrypoint every Canvas resource
//! call goes through. It
//!   - joins the configured base URL with the relative resource path
//!   - authenticates with the configured bearer token
//!   - follows `Link: <...>; rel="next"` continuation headers, one page at a time
//!   - accumulates every page and normalises the result into a [`Payload`]
//!
//! Pages are fetched strictly sequentially since the next URL is only known
//! once the current page has been read. The number of pages is capped by
//! [`CanvasConfig::max_pages`]; a continuation past the cap is an error rather
//! than a silently truncated result.
//!
//! # Continuations
//! The bearer token only ever goes to the configured Canvas origin. A `next`
//! URL on another scheme, host or port aborts the fetch with
//! [`CanvasError::ForeignContinuation`]; a relative `next` URL is resolved
//! against the page that carried it.
//!
//! # Errors
//! Any non-2xx page aborts the whole fetch with [`CanvasError::Transport`],
//! carrying the status and response body for diagnostics.

use reqwest::header::LINK;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::pagination::{extract_next_url, join_url, PageAccumulator, Payload};

/// Optional request body attached to every page request of a fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// `application/x-www-form-urlencoded`, see [`super::form::to_form_pairs`].
    Form(Vec<(String, String)>),
}

pub struct CanvasClient {
    config: CanvasConfig,
    origin: Url,
    http: reqwest::Client,
}

fn invalid_base_url(url: &str, reason: impl Into<String>) -> CanvasError {
    CanvasError::InvalidBaseUrl {
        url: url.to_string(),
        reason: reason.into(),
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

impl CanvasClient {
    pub fn new(config: CanvasConfig) -> Result<Self, CanvasError> {
        let raw = config.base_url.trim();
        if raw.is_empty() {
            return Err(invalid_base_url(raw, "must not be empty"));
        }
        let origin = Url::parse(raw).map_err(|e| invalid_base_url(raw, e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(invalid_base_url(raw, "expected an http(s) URL with a host"));
        }
        if config.max_pages == 0 {
            return Err(CanvasError::Config("max_pages must be at least 1".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CanvasError::Config(format!("failed to build HTTP client: {e}")))?;
        config.trace_loaded();
        Ok(Self {
            config,
            origin,
            http,
        })
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Fetches `path` and every continuation page, returning either the single
    /// entity or the accumulated collection.
    pub async fn fetch_all<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<Payload<T>, CanvasError>
    where
        T: DeserializeOwned,
    {
        let mut next_url = Some(join_url(&self.config.base_url, path));
        let mut pages: PageAccumulator<T> = PageAccumulator::new();

        while let Some(url) = next_url.take() {
            if pages.pages() >= self.config.max_pages {
                warn!(
                    %method,
                    %url,
                    limit = self.config.max_pages,
                    "Pagination limit reached with continuation still present"
                );
                return Err(CanvasError::PageLimit {
                    limit: self.config.max_pages,
                    url,
                });
            }

            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&self.config.token);
            if let Some(body) = &body {
                request = match body {
                    RequestBody::Json(value) => request.json(value),
                    RequestBody::Form(pairs) => request.form(pairs),
                };
            }

            let response = request.send().await.map_err(|source| {
                error!(%method, %url, error = %source, "Canvas request failed to send");
                CanvasError::Request {
                    url: url.clone(),
                    source,
                }
            })?;

            let status = response.status();
            let link_header = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let text = response
                .text()
                .await
                .map_err(|source| CanvasError::Request {
                    url: url.clone(),
                    source,
                })?;

            if !status.is_success() {
                error!(%method, %url, %status, body = %text, "Canvas API returned error");
                return Err(CanvasError::Transport {
                    method: method.to_string(),
                    url,
                    status,
                    body: text,
                });
            }

            let value: Value = if text.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&text).map_err(|source| CanvasError::Decode {
                    url: url.clone(),
                    source,
                })?
            };

            match value {
                Value::Array(elements) => {
                    let items = elements
                        .into_iter()
                        .map(serde_json::from_value::<T>)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|source| CanvasError::Decode {
                            url: url.clone(),
                            source,
                        })?;
                    pages.push_collection(items);
                }
                single => {
                    let item = serde_json::from_value::<T>(single).map_err(|source| {
                        CanvasError::Decode {
                            url: url.clone(),
                            source,
                        }
                    })?;
                    pages.push_single(item);
                }
            }

            next_url = match link_header.as_deref().and_then(extract_next_url) {
                Some(next) => Some(self.checked_continuation(&url, &next)?),
                None => None,
            };
            debug!(
                %method,
                %url,
                %status,
                page = pages.pages(),
                accumulated = pages.len(),
                has_next = next_url.is_some(),
                "Fetched Canvas page"
            );
        }

        Ok(pages.finish())
    }

    /// Resolves `next` against the current page and rejects it unless it stays
    /// on the configured origin.
    fn checked_continuation(&self, current: &str, next: &str) -> Result<String, CanvasError> {
        let resolved = Url::parse(current)
            .and_then(|base| base.join(next))
            .or_else(|_| Url::parse(next));
        match resolved {
            Ok(resolved) if same_origin(&self.origin, &resolved) => Ok(resolved.to_string()),
            _ => {
                warn!(
                    next = %next,
                    origin = %self.origin.origin().ascii_serialization(),
                    "Refusing continuation outside the Canvas origin"
                );
                Err(CanvasError::ForeignContinuation {
                    url: next.to_string(),
                    origin: self.origin.origin().ascii_serialization(),
                })
            }
        }
    }
}
