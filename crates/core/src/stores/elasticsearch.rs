use crate::aggregations::{AggregationSpec, Aggregations};
use crate::config::EngineConfig;
use crate::error::ConfigError;
use crate::models::{EngineSearchResult, RawHit};
use crate::query::EngineQuery;
use crate::traits::{ClusterHealth, EngineInfo, HealthStatus, SearchEngine};
use crate::SearchError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const RETRY_BACKOFF: Duration = Duration::from_millis(250);
const MAX_REASON_CHARS: usize = 300;

#[derive(Debug, Clone)]
enum Credentials {
    ApiKey(String),
    Basic {
        username: String,
        password: Option<String>,
    },
    Anonymous,
}

/// Elasticsearch-backed [`SearchEngine`] holding one long-lived HTTP client.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    client: Client,
    endpoint: Url,
    index_name: String,
    credentials: Credentials,
    max_retries: u32,
}

impl ElasticsearchClient {
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.verify_certificates);

        if let Some(path) = &config.ca_bundle {
            let pem = std::fs::read(path)?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|error| ConfigError::Certificate(error.to_string()))?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder
            .build()
            .map_err(|error| ConfigError::Client(error.to_string()))?;

        // API key wins over basic credentials when both are configured.
        let credentials = match (&config.api_key, &config.username) {
            (Some(key), _) if !key.trim().is_empty() => Credentials::ApiKey(encode_api_key(key)),
            (_, Some(username)) if !username.trim().is_empty() => Credentials::Basic {
                username: username.clone(),
                password: config.password.clone(),
            },
            _ => Credentials::Anonymous,
        };

        Ok(Self {
            client,
            endpoint: Url::parse(&config.node)?,
            index_name: config.index.clone(),
            credentials,
            max_retries: config.max_retries,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Fetches engine info and cluster health. A degraded cluster is only
    /// logged.
    pub async fn handshake(&self) -> Result<EngineInfo, SearchError> {
        let info = self.info().await?;
        info!(
            cluster = %info.cluster_name,
            version = %info.version,
            node = %self.endpoint,
            "connected to search engine"
        );

        match self.ping().await {
            Ok(health) if health.status == HealthStatus::Green => {
                info!(nodes = health.number_of_nodes, "cluster health green");
            }
            Ok(health) => {
                warn!(
                    status = ?health.status,
                    nodes = health.number_of_nodes,
                    "cluster health degraded"
                );
            }
            Err(error) => warn!(%error, "cluster health check failed"),
        }

        Ok(info)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, SearchError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| SearchError::Internal(format!("engine url {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.credentials {
            Credentials::ApiKey(encoded) => match HeaderValue::from_str(&format!("ApiKey {encoded}")) {
                Ok(value) => builder.header(AUTHORIZATION, value),
                Err(_) => builder,
            },
            Credentials::Basic { username, password } => builder.basic_auth(username, password.as_ref()),
            Credentials::Anonymous => builder,
        }
    }

    /// Sends with retries on transport failures and overload statuses.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, SearchError> {
        let mut attempt = 0u32;
        loop {
            let attempt_request = request.try_clone().ok_or_else(|| {
                SearchError::Internal(format!("{operation} request body cannot be retried"))
            })?;

            let failure = match attempt_request.send().await {
                Ok(response) if is_retryable_status(response.status()) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    classify_status(operation, status, &body)
                }
                Ok(response) => return Ok(response),
                Err(error) => transport_error(operation, error),
            };

            if attempt >= self.max_retries || !failure.is_retryable() {
                return Err(failure);
            }
            attempt += 1;
            warn!(operation, attempt, error = %failure, "retrying engine request");
            tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        }
    }

    async fn read_json(&self, operation: &'static str, response: Response) -> Result<Value, SearchError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|error| transport_error(operation, error));
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(operation, status, &body))
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchClient {
    async fn search(&self, query: &EngineQuery) -> Result<EngineSearchResult, SearchError> {
        let url = self.url(&[&self.index_name, "_search"])?;
        let request = self.request(Method::POST, url).json(&query.search_body());
        let response = self.send("search", request).await?;
        let body = self.read_json("search", response).await?;
        Ok(parse_search_response(&body))
    }

    async fn get(&self, id: &str) -> Result<Option<RawHit>, SearchError> {
        let url = self.url(&[&self.index_name, "_doc", id])?;
        let response = self.send("get", self.request(Method::GET, url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(id, "document not found");
            return Ok(None);
        }

        let body = self.read_json("get", response).await?;
        if body.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }
        Ok(Some(parse_hit(&body)))
    }

    async fn aggregate(
        &self,
        query: &EngineQuery,
        spec: &AggregationSpec,
    ) -> Result<Aggregations, SearchError> {
        let url = self.url(&[&self.index_name, "_search"])?;
        let request = self
            .request(Method::POST, url)
            .json(&query.aggregation_body(spec.to_json()));
        let response = self.send("aggregate", request).await?;
        let body = self.read_json("aggregate", response).await?;
        Ok(spec.decode(body.get("aggregations").unwrap_or(&Value::Null)))
    }

    async fn ping(&self) -> Result<ClusterHealth, SearchError> {
        let url = self.url(&["_cluster", "health"])?;
        let response = self.send("ping", self.request(Method::GET, url)).await?;
        let body = self.read_json("ping", response).await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn info(&self) -> Result<EngineInfo, SearchError> {
        let url = self.url(&[])?;
        let response = self.send("info", self.request(Method::GET, url)).await?;
        let body = self.read_json("info", response).await?;
        Ok(EngineInfo {
            cluster_name: body
                .pointer("/cluster_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            version: body
                .pointer("/version/number")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Accepts either a pre-encoded key or `id:key`.
fn encode_api_key(key: &str) -> String {
    let key = key.trim();
    if key.contains(':') {
        STANDARD.encode(key)
    } else {
        key.to_string()
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn transport_error(operation: &str, error: reqwest::Error) -> SearchError {
    match SearchError::from(error) {
        SearchError::Timeout { .. } => SearchError::Timeout {
            operation: operation.to_string(),
        },
        other => other,
    }
}

/// Maps a non-success engine status onto the caller-facing taxonomy.
pub fn classify_status(operation: &str, status: StatusCode, body: &str) -> SearchError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => SearchError::ServiceUnavailable("retry later".to_string()),
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => SearchError::Timeout {
            operation: operation.to_string(),
        },
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE => {
            SearchError::ServiceUnavailable(format!("{operation} answered {status}"))
        }
        status if status.is_client_error() => SearchError::InvalidQuery {
            reason: engine_reason(body).unwrap_or_else(|| status.to_string()),
        },
        status => SearchError::Internal(format!(
            "{operation} answered {status}: {}",
            engine_reason(body).unwrap_or_default()
        )),
    }
}

fn engine_reason(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return Some(body.chars().take(MAX_REASON_CHARS).collect());
    };
    parsed
        .pointer("/error/root_cause/0/reason")
        .or_else(|| parsed.pointer("/error/reason"))
        .or_else(|| parsed.pointer("/error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn parse_search_response(body: &Value) -> EngineSearchResult {
    let total = body
        .pointer("/hits/total/value")
        .or_else(|| body.pointer("/hits/total"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let hits = body
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map(|hits| hits.iter().map(parse_hit).collect())
        .unwrap_or_default();

    EngineSearchResult {
        total,
        took_ms: body.pointer("/took").and_then(Value::as_u64).unwrap_or(0),
        hits,
    }
}

pub fn parse_hit(raw: &Value) -> RawHit {
    let highlight = raw
        .pointer("/highlight")
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .map(|(field, fragments)| {
                    let fragments = fragments
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default();
                    (field.clone(), fragments)
                })
                .collect::<HashMap<String, Vec<String>>>()
        })
        .unwrap_or_default();

    RawHit {
        id: raw
            .pointer("/_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        score: raw.pointer("/_score").and_then(Value::as_f64),
        source: raw
            .pointer("/_source")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(Map::new),
        highlight,
    }
}
