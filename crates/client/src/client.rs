//! Platform HTTP client.
//!
//! Blocking reqwest client (no async runtime required). Covers the full
//! sync flow: OAuth token grant, chunked lead upsert, key lookup, targeted
//! update. A transport failure on one chunk degrades to a chunk-failure
//! response so the remaining chunks still count; only token problems fail
//! a call outright.

use std::cell::RefCell;
use std::time::Duration;

use leadsync_engine::api::{ApiError, LeadApi, LookupResponse, UpdateResponse};
use leadsync_engine::model::{
    BatchResponse, FieldMap, ItemResult, PartitionId, ResponseError,
};

use crate::auth::{load_auth, Credentials};

/// Default leads per submitted chunk; the platform answers per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Fields requested on lookups; match ranking needs the timestamps.
const LOOKUP_FIELDS: &str = "id,email,firstName,lastName,updatedAt,createdAt";

/// Platform API client (blocking).
pub struct RestClient {
    http: reqwest::blocking::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    chunk_size: usize,
    lookup_field: String,
    token: RefCell<Option<String>>,
}

/// Error type for platform operations.
#[derive(Debug)]
pub enum ClientError {
    /// No credentials configured
    NotAuthenticated,
    /// Token grant rejected
    Auth(String),
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// JSON parsing error
    Parse(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotAuthenticated => {
                write!(f, "Not authenticated — run `leadsync login` first")
            }
            ClientError::Auth(msg) => write!(f, "Auth failed: {}", msg),
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ClientError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        ApiError::new(e.to_string())
    }
}

impl RestClient {
    /// Create a new client using saved credentials.
    pub fn from_saved_auth() -> Result<Self, ClientError> {
        let creds = load_auth().ok_or(ClientError::NotAuthenticated)?;
        Ok(Self::new(creds))
    }

    /// Create a new client with explicit credentials.
    pub fn new(creds: Credentials) -> Self {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("leadsync/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            api_base: creds.api_base,
            client_id: creds.client_id,
            client_secret: creds.client_secret,
            chunk_size: DEFAULT_CHUNK_SIZE,
            lookup_field: "email".into(),
            token: RefCell::new(None),
        }
    }

    /// Override the leads-per-chunk count (must match the engine config).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Override the default lookup field used when a caller passes none.
    pub fn with_lookup_field(mut self, field: impl Into<String>) -> Self {
        self.lookup_field = field.into();
        self
    }

    /// Fetch (or reuse) an access token via the client-credentials grant.
    fn token(&self) -> Result<String, ClientError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }

        let url = format!("{}/identity/oauth/token", self.api_base);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Auth(format!("token grant returned {status}: {body}")));
        }

        let json: serde_json::Value = response
            .json()
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        let token = json["access_token"]
            .as_str()
            .ok_or_else(|| ClientError::Parse("Missing access_token in response".into()))?
            .to_string();

        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    /// Submit one chunk of leads for create-or-update.
    pub fn sync_chunk(
        &self,
        chunk: &[FieldMap],
        partition: PartitionId,
    ) -> Result<BatchResponse, ClientError> {
        let body = serde_json::json!({
            "action": "createOrUpdate",
            "partitionId": partition,
            "input": chunk,
        });
        let json = self.post_leads(&body)?;
        Ok(parse_batch_response(&json))
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn leads_url(&self) -> String {
        format!("{}/rest/v1/leads.json", self.api_base)
    }

    fn post_leads(&self, body: &serde_json::Value) -> Result<serde_json::Value, ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .post(self.leads_url())
            .bearer_auth(token)
            .json(body)
            .send()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Http(status, body));
        }

        response.json().map_err(|e| ClientError::Parse(e.to_string()))
    }
}

/// Map the platform's response envelope onto the engine's batch shape.
///
/// A malformed result list is dropped whole rather than item by item:
/// partial lists would silently shift every later position.
fn parse_batch_response(json: &serde_json::Value) -> BatchResponse {
    let success = json["success"].as_bool().unwrap_or(false);
    let result: Option<Vec<ItemResult>> = json
        .get("result")
        .and_then(|r| serde_json::from_value(r.clone()).ok());
    let error = json["errors"]
        .as_array()
        .and_then(|errs| errs.first())
        .map(|err| {
            let message = err["message"].as_str().unwrap_or("").to_string();
            ResponseError {
                partition: !message.to_lowercase().contains("partition"),
                message: Some(message),
            }
        });

    BatchResponse {
        success,
        result,
        error,
    }
}

fn chunk_failed() -> BatchResponse {
    BatchResponse {
        success: false,
        result: None,
        error: None,
    }
}

impl LeadApi for RestClient {
    fn sync_leads(
        &self,
        leads: &[FieldMap],
        partition: PartitionId,
    ) -> Result<Vec<BatchResponse>, ApiError> {
        // A token problem fails the whole call up front; per-chunk transport
        // problems degrade to chunk failures so other chunks still count.
        self.token().map_err(ApiError::from)?;

        let mut responses = Vec::new();
        for chunk in leads.chunks(self.chunk_size) {
            match self.sync_chunk(chunk, partition) {
                Ok(response) => responses.push(response),
                Err(_) => responses.push(chunk_failed()),
            }
        }
        Ok(responses)
    }

    fn sync_one(
        &self,
        lead: &FieldMap,
        partition: PartitionId,
    ) -> Result<BatchResponse, ApiError> {
        let chunk = [lead.clone()];
        self.sync_chunk(&chunk, partition).map_err(ApiError::from)
    }

    fn find_by_key(
        &self,
        key_value: &str,
        key_field: Option<&str>,
        _partition: PartitionId,
    ) -> Result<LookupResponse, ApiError> {
        let token = self.token().map_err(ApiError::from)?;
        let filter_type = key_field.unwrap_or(&self.lookup_field);

        let response = self
            .http
            .get(self.leads_url())
            .bearer_auth(token)
            .query(&[
                ("filterType", filter_type),
                ("filterValues", key_value),
                ("fields", LOOKUP_FIELDS),
            ])
            .send()
            .map_err(|e| ApiError::from(ClientError::Network(e.to_string())))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Http(status, body).into());
        }

        response
            .json::<LookupResponse>()
            .map_err(|e| ClientError::Parse(e.to_string()).into())
    }

    fn update_by_key(
        &self,
        lead: &FieldMap,
        key_field: &str,
        _key_value: &str,
        _partition: PartitionId,
    ) -> Result<UpdateResponse, ApiError> {
        // The lead map already carries the key value; the platform addresses
        // the update through lookupField alone.
        let body = serde_json::json!({
            "action": "updateOnly",
            "lookupField": key_field,
            "input": [lead],
        });
        let json = self.post_leads(&body).map_err(ApiError::from)?;
        serde_json::from_value(json).map_err(|e| ClientError::Parse(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn creds(server: &MockServer) -> Credentials {
        Credentials::new(server.base_url(), "cid".into(), "sec".into())
    }

    fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET)
                .path("/identity/oauth/token")
                .query_param("grant_type", "client_credentials")
                .query_param("client_id", "cid");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "access_token": "tok-123",
                    "expires_in": 3599
                }));
        })
    }

    fn lead(email: &str) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("email".into(), email.into());
        map
    }

    #[test]
    fn sync_posts_chunks_with_bearer_token() {
        let server = MockServer::start();
        let token_mock = mock_token(&server);

        let sync_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/leads.json")
                .header("authorization", "Bearer tok-123");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "success": true,
                    "result": [
                        { "id": 1, "status": "created" },
                        { "id": 2, "status": "updated" }
                    ]
                }));
        });

        let client = RestClient::new(creds(&server)).with_chunk_size(2);
        let leads: Vec<FieldMap> = (0..5).map(|i| lead(&format!("l{i}@x.co"))).collect();
        let responses = client.sync_leads(&leads, 1).unwrap();

        // 5 leads at chunk size 2: three POSTs, token fetched once
        assert_eq!(responses.len(), 3);
        sync_mock.assert_calls(3);
        token_mock.assert();
        assert!(responses[0].success);
        assert_eq!(responses[0].result.as_ref().unwrap()[1].status, "updated");
    }

    #[test]
    fn http_error_on_a_chunk_degrades_to_chunk_failure() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/leads.json");
            then.status(502).body("bad gateway");
        });

        let client = RestClient::new(creds(&server)).with_chunk_size(2);
        let leads: Vec<FieldMap> = (0..3).map(|i| lead(&format!("l{i}@x.co"))).collect();
        let responses = client.sync_leads(&leads, 1).unwrap();

        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(|r| !r.success && r.result.is_none()));
    }

    #[test]
    fn token_failure_fails_the_whole_call() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/identity/oauth/token");
            then.status(401).body("bad client");
        });

        let client = RestClient::new(creds(&server));
        let err = client.sync_leads(&[lead("a@x.co")], 1).unwrap_err();
        assert!(err.message.contains("token grant returned 401"));
    }

    #[test]
    fn partition_error_maps_to_rejection_shape() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(POST).path("/rest/v1/leads.json");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "success": false,
                    "errors": [{ "code": "1003", "message": "Partition 9 not found" }]
                }));
        });

        let client = RestClient::new(creds(&server));
        let responses = client.sync_leads(&[lead("a@x.co")], 9).unwrap();
        let error = responses[0].error.as_ref().unwrap();
        assert!(!error.partition);
        assert_eq!(error.message.as_deref(), Some("Partition 9 not found"));
    }

    #[test]
    fn non_partition_error_keeps_partition_flag() {
        let json = serde_json::json!({
            "success": false,
            "errors": [{ "code": "606", "message": "Rate limit exceeded" }]
        });
        let response = parse_batch_response(&json);
        assert!(response.error.as_ref().unwrap().partition);
    }

    #[test]
    fn malformed_result_list_drops_whole_chunk() {
        let json = serde_json::json!({
            "success": true,
            "result": [{ "id": 1, "status": "created" }, { "id": 2 }]
        });
        let response = parse_batch_response(&json);
        assert!(response.result.is_none());
    }

    #[test]
    fn find_by_key_builds_filter_query() {
        let server = MockServer::start();
        mock_token(&server);
        let find_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/leads.json")
                .query_param("filterType", "email")
                .query_param("filterValues", "dup@x.co");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "success": true,
                    "result": [
                        { "id": 4, "email": "dup@x.co", "updatedAt": "2026-02-01T00:00:00Z" },
                        { "id": 5, "email": "dup@x.co" }
                    ]
                }));
        });

        let client = RestClient::new(creds(&server));
        let lookup = client.find_by_key("dup@x.co", None, 1).unwrap();

        find_mock.assert();
        assert!(lookup.success);
        assert_eq!(lookup.result.len(), 2);
        assert_eq!(lookup.result[0].id, 4);
        assert!(lookup.result[1].updated_at.is_none());
    }

    #[test]
    fn update_by_key_posts_update_only_action() {
        let server = MockServer::start();
        mock_token(&server);
        let update_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rest/v1/leads.json")
                .header("authorization", "Bearer tok-123");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "success": true,
                    "result": [{ "id": 4, "status": "updated" }]
                }));
        });

        let client = RestClient::new(creds(&server));
        let mut update = lead("dup@x.co");
        update.insert("id".into(), 4.into());
        let response = client.update_by_key(&update, "id", "4", 1).unwrap();

        update_mock.assert();
        assert!(response.success);
        assert_eq!(response.result.unwrap()[0].status, "updated");
    }
}
