//! HTTP client for the Service Inventory Management API.
//!
//! Every operation is a single round trip. A response is accepted only when
//! its status matches the one value the operation expects; anything else is
//! a [`ClientError::RequestFailure`]. There is no retry.

use crate::model::{RawService, ServiceQuery, ServiceRecord, ServiceSpec};
use crate::payload::{PayloadBuilder, TemplatePayload};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use url::Url;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/tmf-api/serviceInventoryManagement/v5";

/// Environment variable holding the API endpoint.
pub const ENDPOINT_ENV: &str = "SERVICE_INVENTORY_URL";

const APPLICATION_JSON: &str = "application/json";

/// Characters escaped when an id is placed in a path segment.
const PATH_SEGMENT_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

/// Service inventory client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInventoryConfig {
    /// Base URL of the API (e.g. <http://localhost:8080/tmf-api/serviceInventoryManagement/v5>)
    pub endpoint: String,
}

impl Default for ServiceInventoryConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl ServiceInventoryConfig {
    /// Configuration for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Reads `SERVICE_INVENTORY_URL`, falling back to [`DEFAULT_ENDPOINT`].
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(ENDPOINT_ENV).map_or_else(|_| Self::default(), Self::new)
    }
}

/// The API operations, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// POST /service
    Create,
    /// GET /service
    List,
    /// GET /service/{id}
    Get,
    /// PATCH /service/{id}
    Update,
    /// DELETE /service/{id}
    Delete,
}

impl Operation {
    /// The only status the operation accepts as success.
    #[must_use]
    pub const fn expected_status(self) -> StatusCode {
        match self {
            Self::Create => StatusCode::CREATED,
            Self::List | Self::Get | Self::Update => StatusCode::OK,
            Self::Delete => StatusCode::NO_CONTENT,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create service",
            Self::List => "list services",
            Self::Get => "get service",
            Self::Update => "update service",
            Self::Delete => "delete service",
        })
    }
}

/// HTTP client for service inventory operations.
#[derive(Debug)]
pub struct ServiceInventoryClient {
    client: Client,
    endpoint: String,
    payload: Box<dyn PayloadBuilder>,
}

impl ServiceInventoryClient {
    /// Create a new client with a default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not an http(s) URL or the HTTP
    /// client cannot be created.
    pub fn new(config: ServiceInventoryConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Init(e.to_string()))?;
        Self::with_http_client(config, client)
    }

    /// Create a new client on a caller-built transport.
    ///
    /// Timeouts, TLS roots and proxies are configured on `client`.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not an http(s) URL.
    pub fn with_http_client(
        config: ServiceInventoryConfig,
        client: Client,
    ) -> Result<Self, ClientError> {
        let endpoint = normalize_endpoint(&config.endpoint)?;
        Ok(Self {
            client,
            endpoint,
            payload: Box::new(TemplatePayload::default()),
        })
    }

    /// Replace the payload builder used by create and update.
    #[must_use]
    pub fn with_payload_builder(mut self, builder: impl PayloadBuilder + 'static) -> Self {
        self.payload = Box::new(builder);
        self
    }

    /// Base URL of the API, without trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn collection_url(&self) -> String {
        format!("{}/service", self.endpoint)
    }

    fn item_url(&self, id: &str) -> String {
        format!(
            "{}/service/{}",
            self.endpoint,
            utf8_percent_encode(id, PATH_SEGMENT_ESCAPE)
        )
    }

    /// Record a new service.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a status other than 201, or an
    /// unparseable response.
    pub async fn create_service(&self, spec: &ServiceSpec) -> Result<ServiceRecord, ClientError> {
        let url = self.collection_url();
        let payload = self.payload.build(spec);

        tracing::debug!(
            url,
            component = %spec.component_name,
            dependency = %spec.dependency_name,
            "POST service"
        );

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, APPLICATION_JSON)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let response = expect_status(Operation::Create, response).await?;
        let raw: RawService = parse_body(response).await?;
        Ok(ServiceRecord::from(raw))
    }

    /// List services matching a query.
    ///
    /// The server filters on state and on a single characteristic value;
    /// the component and dependency filters are then both applied here, so
    /// the result holds only records matching every given filter. Server
    /// order is preserved.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a status other than 200, or an
    /// unparseable response.
    pub async fn list_services(
        &self,
        query: &ServiceQuery,
    ) -> Result<Vec<ServiceRecord>, ClientError> {
        let url = self.collection_url();
        let params = query.query_params();

        tracing::debug!(url, ?params, "GET service list");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, APPLICATION_JSON)
            .query(&params)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let response = expect_status(Operation::List, response).await?;
        let raw: Vec<RawService> = parse_body(response).await?;

        let mut records: Vec<ServiceRecord> = raw.into_iter().map(ServiceRecord::from).collect();
        records.retain(|record| query.matches(record));
        Ok(records)
    }

    /// Fetch a single service.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a status other than 200 (an unknown
    /// id included), or an unparseable response.
    pub async fn get_service(&self, id: &str) -> Result<ServiceRecord, ClientError> {
        let url = self.item_url(id);

        tracing::debug!(id, url, "GET service");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, APPLICATION_JSON)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let response = expect_status(Operation::Get, response).await?;
        let raw: RawService = parse_body(response).await?;
        Ok(ServiceRecord::from(raw))
    }

    /// Replace the fields of an existing service.
    ///
    /// All fields are resent; there is no partial update.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, a status other than 200, or an
    /// unparseable response.
    pub async fn update_service(
        &self,
        id: &str,
        spec: &ServiceSpec,
    ) -> Result<ServiceRecord, ClientError> {
        let url = self.item_url(id);
        let payload = self.payload.build(spec);

        tracing::debug!(id, url, state = %spec.state, "PATCH service");

        let response = self
            .client
            .patch(&url)
            .header(ACCEPT, APPLICATION_JSON)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        let response = expect_status(Operation::Update, response).await?;
        let raw: RawService = parse_body(response).await?;
        Ok(ServiceRecord::from(raw))
    }

    /// Delete a service.
    ///
    /// Returns `true` when the server confirms with 204. With
    /// `ignore_not_found`, any other status yields `false` instead of an
    /// error; the status is not inspected further.
    ///
    /// # Errors
    ///
    /// Returns error on network failure, or on a status other than 204 when
    /// `ignore_not_found` is unset.
    pub async fn delete_service(
        &self,
        id: &str,
        ignore_not_found: bool,
    ) -> Result<bool, ClientError> {
        let url = self.item_url(id);

        tracing::debug!(id, url, "DELETE service");

        let response = self
            .client
            .delete(&url)
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| ClientError::Request(e.to_string()))?;

        match expect_status(Operation::Delete, response).await {
            Ok(_) => Ok(true),
            Err(ClientError::RequestFailure { actual, .. }) if ignore_not_found => {
                tracing::warn!(
                    id,
                    status = actual,
                    "Delete not confirmed, treating service as absent"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

fn normalize_endpoint(endpoint: &str) -> Result<String, ClientError> {
    let parsed = Url::parse(endpoint)
        .map_err(|e| ClientError::Init(format!("invalid endpoint {endpoint}: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::Init(format!(
            "unsupported endpoint scheme: {}",
            parsed.scheme()
        )));
    }

    Ok(endpoint.trim_end_matches('/').to_string())
}

async fn expect_status(
    operation: Operation,
    response: Response,
) -> Result<Response, ClientError> {
    let expected = operation.expected_status();
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let body = response.text().await.ok().filter(|b| !b.is_empty());
    Err(ClientError::RequestFailure {
        operation,
        expected: expected.as_u16(),
        actual: status.as_u16(),
        body,
    })
}

async fn parse_body<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response
        .json()
        .await
        .map_err(|e| ClientError::Parse(e.to_string()))
}

fn body_suffix(body: Option<&str>) -> String {
    body.map(|b| format!(" - {b}")).unwrap_or_default()
}

/// Errors that can occur with the service inventory client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),
    /// HTTP request failed before a response arrived
    #[error("request error: {0}")]
    Request(String),
    /// The server answered with a status the operation does not accept
    #[error(
        "{operation} failed: unexpected http status code {actual} (expected {expected}){}",
        body_suffix(.body.as_deref())
    )]
    RequestFailure {
        /// Operation that failed
        operation: Operation,
        /// Status the operation accepts
        expected: u16,
        /// Status the server returned
        actual: u16,
        /// Response body, if any
        body: Option<String>,
    },
    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(String),
}

impl ClientError {
    /// HTTP status returned by the server, for status failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailure { actual, .. } => Some(*actual),
            _ => None,
        }
    }
}
