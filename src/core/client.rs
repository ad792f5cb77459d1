//! Authenticated client for the GraphQL endpoint
//!
//! The client speaks JSON over a [`Transport`]. Production code uses
//! [`HttpTransport`]; tests substitute a scripted transport so import
//! pipelines can run without a network.

use miette::Diagnostic;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::core::config::AuthScheme;
use crate::core::graphql::{GraphqlRequest, GraphqlResponse};

/// Errors from the API client layer
#[derive(Debug, Error, Diagnostic)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.)
    #[error("HTTP request failed: {0}")]
    #[diagnostic(code(ion::api::transport))]
    Transport(#[from] reqwest::Error),

    /// The API returned a non-2xx status code
    #[error("API error ({status}): {body}")]
    #[diagnostic(code(ion::api::status))]
    Status { status: u16, body: String },

    /// The body was not the JSON shape we expected
    #[error("Unexpected API response: {0}")]
    #[diagnostic(code(ion::api::decode))]
    Decode(String),

    /// A payload could not be turned into JSON
    #[error("Cannot encode request: {0}")]
    #[diagnostic(code(ion::api::encode))]
    Encode(String),

    /// A batched call came back with a different number of results
    #[error("Batch of {sent} operations returned {received} results")]
    #[diagnostic(code(ion::api::batch_mismatch))]
    BatchMismatch { sent: usize, received: usize },

    /// A query (not a mutation) failed; lookups have no per-item recovery
    #[error("Query failed: {0}")]
    #[diagnostic(code(ion::api::query))]
    Query(String),
}

/// Requests wait as long as the server takes; large batches run for minutes
pub const REQUEST_TIMEOUT: Option<Duration> = None;

/// Blocking HTTP client shared by the token exchange and the GraphQL
/// transport
pub fn http_client() -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Sends one JSON body to the GraphQL endpoint and returns the JSON reply
pub trait Transport {
    fn post(&self, body: &Value) -> Result<Value, ApiError>;
}

/// Blocking HTTP transport with a fixed authorization header
pub struct HttpTransport {
    http: reqwest::blocking::Client,
    url: Url,
    authorization: String,
}

impl HttpTransport {
    pub fn new(url: Url, token: &str, scheme: AuthScheme) -> Result<Self, ApiError> {
        Ok(Self {
            http: http_client()?,
            url,
            authorization: scheme.header_value(token),
        })
    }
}

impl Transport for HttpTransport {
    fn post(&self, body: &Value) -> Result<Value, ApiError> {
        let response = self
            .http
            .post(self.url.clone())
            .header(AUTHORIZATION, &self.authorization)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json()?)
    }
}

/// GraphQL client over a transport
pub struct ApiClient {
    transport: Box<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// Send a single operation
    pub fn request(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::Encode(e.to_string()))?;
        let reply = self.transport.post(&body)?;
        serde_json::from_value(reply).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Send several operations in one call.
    ///
    /// The result list is aligned by index with `requests`. Each entry
    /// succeeds or fails on its own; only transport-level problems are
    /// returned as `Err`.
    pub fn batch(&self, requests: &[GraphqlRequest]) -> Result<Vec<GraphqlResponse>, ApiError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        debug!(operations = requests.len(), "sending batched request");

        let body = serde_json::to_value(requests).map_err(|e| ApiError::Encode(e.to_string()))?;
        let reply = self.transport.post(&body)?;
        let Value::Array(items) = reply else {
            return Err(ApiError::Decode(
                "expected a JSON array for a batched request".to_string(),
            ));
        };
        if items.len() != requests.len() {
            return Err(ApiError::BatchMismatch {
                sent: requests.len(),
                received: items.len(),
            });
        }

        items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| ApiError::Decode(e.to_string())))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use crate::core::graphql::Mutation;
    use serde_json::json;

    #[test]
    fn test_single_request_round_trip() {
        let transport = ScriptedTransport::new();
        transport.reply(json!({"data": {"createPart": {"part": {"id": 1}}}}));
        let client = transport.client();

        let req = GraphqlRequest::mutation(Mutation::CreatePart, json!({"partNumber": "A"}));
        let resp = client.request(&req).unwrap();

        assert!(resp.errors.is_empty());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["variables"]["input"]["partNumber"], "A");
    }

    #[test]
    fn test_batch_is_sent_as_one_array() {
        let transport = ScriptedTransport::new();
        transport.reply(json!([
            {"data": {"createPart": {"part": {"id": 1}}}},
            {"errors": [{"message": "boom"}]}
        ]));
        let client = transport.client();

        let reqs = vec![
            GraphqlRequest::mutation(Mutation::CreatePart, json!({"partNumber": "A"})),
            GraphqlRequest::mutation(Mutation::CreatePart, json!({"partNumber": "B"})),
        ];
        let resps = client.batch(&reqs).unwrap();

        assert_eq!(resps.len(), 2);
        assert_eq!(resps[1].first_error(), Some("boom"));
        assert!(transport.sent()[0].is_array());
        assert_eq!(transport.mutations_sent(), 2);
    }

    #[test]
    fn test_empty_batch_sends_nothing() {
        let transport = ScriptedTransport::new();
        let resps = transport.client().batch(&[]).unwrap();
        assert!(resps.is_empty());
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_batch_length_mismatch_is_an_error() {
        let transport = ScriptedTransport::new();
        transport.reply(json!([{"data": {}}]));
        let reqs = vec![
            GraphqlRequest::mutation(Mutation::CreatePart, json!({})),
            GraphqlRequest::mutation(Mutation::CreatePart, json!({})),
        ];
        let err = transport.client().batch(&reqs).unwrap_err();
        assert!(matches!(err, ApiError::BatchMismatch { sent: 2, received: 1 }));
    }

    #[test]
    fn test_batch_non_array_reply_is_an_error() {
        let transport = ScriptedTransport::new();
        transport.reply(json!({"errors": [{"message": "unauthorized"}]}));
        let reqs = vec![GraphqlRequest::mutation(Mutation::CreatePart, json!({}))];
        let err = transport.client().batch(&reqs).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_http_transport_uses_configured_scheme() {
        let url = Url::parse("http://localhost:5000/graphql").unwrap();
        let raw = HttpTransport::new(url.clone(), "tok", AuthScheme::Raw).unwrap();
        assert_eq!(raw.authorization, "tok");
        let bearer = HttpTransport::new(url, "tok", AuthScheme::Bearer).unwrap();
        assert_eq!(bearer.authorization, "Bearer tok");
    }

    #[test]
    fn test_requests_have_no_timeout() {
        assert_eq!(REQUEST_TIMEOUT, None);
    }

    /// Serve one HTTP request, answering with `reply` after `delay`
    fn slow_server(delay: std::time::Duration, reply: &'static str) -> Url {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            std::thread::sleep(delay);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.len(),
                reply
            );
            let _ = stream.write_all(response.as_bytes());
        });
        Url::parse(&format!("http://{}/graphql", addr)).unwrap()
    }

    #[test]
    fn test_http_transport_posts_json() {
        let url = slow_server(Duration::from_millis(200), r#"{"data": {"ok": true}}"#);
        let transport = HttpTransport::new(url, "tok", AuthScheme::Raw).unwrap();
        let reply = transport.post(&json!({"query": "{ ok }"})).unwrap();
        assert_eq!(reply["data"]["ok"], true);
    }

    #[test]
    #[ignore = "holds the request open for 35 seconds"]
    fn test_slow_reply_outlasts_default_client_timeout() {
        let url = slow_server(Duration::from_secs(35), r#"{"data": {"ok": true}}"#);
        let transport = HttpTransport::new(url, "tok", AuthScheme::Raw).unwrap();
        let reply = transport.post(&json!({"query": "{ ok }"})).unwrap();
        assert_eq!(reply["data"]["ok"], true);
    }
}
