//! Ticket operations: fetch, create, update, comment, and transaction search.

use crate::error::{ApiError, Result};
use crate::search::comment_search_filters;
use crate::transport::ApiResponse;
use crate::RequestSender;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

pub type TicketId = u64;

/// Partial set of ticket fields, sent as a JSON object.
pub type TicketProperties = Map<String, Value>;

pub const CUSTOM_FIELDS_KEY: &str = "CustomFields";

const TRANSACTION_PATH: &str = "/REST/2.0/transaction/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct TicketResource<S> {
    sender: S,
}

impl<S: RequestSender> TicketResource<S> {
    pub fn new(sender: S) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// Mutable access, e.g. to rotate the token on an `ApiResource`.
    pub fn sender_mut(&mut self) -> &mut S {
        &mut self.sender
    }

    pub fn into_inner(self) -> S {
        self.sender
    }

    /// Load a ticket by ID.
    ///
    /// Error pages that are not JSON surface as [`ApiError::Decode`]; a
    /// missing ticket is not distinguished from any other failure.
    pub async fn get(&self, ticket_id: TicketId) -> Result<Value> {
        let response = self
            .sender
            .send_request(
                Method::GET,
                &format!("ticket/{ticket_id}"),
                None,
                HeaderMap::new(),
            )
            .await?;

        decode_json(&response)
    }

    /// Create a ticket. `CustomFields` are not merged here; RT ignores them on
    /// creation, so attach them with a follow-up [`update`](Self::update).
    pub async fn create(&self, properties: &TicketProperties) -> Result<Value> {
        let body = serde_json::to_string(properties).map_err(ApiError::Serialize)?;
        let response = self
            .sender
            .send_request(Method::POST, "ticket", Some(body), json_headers())
            .await?;

        decode_json(&response)
    }

    /// Update a ticket. Non-empty `custom_fields` replace whatever sits under
    /// the `CustomFields` key of `properties`.
    pub async fn update(
        &self,
        ticket_id: TicketId,
        mut properties: TicketProperties,
        custom_fields: TicketProperties,
    ) -> Result<Value> {
        if !custom_fields.is_empty() {
            properties.insert(CUSTOM_FIELDS_KEY.to_string(), Value::Object(custom_fields));
        }

        let body = serde_json::to_string(&properties).map_err(ApiError::Serialize)?;
        let response = self
            .sender
            .send_request(
                Method::PUT,
                &format!("ticket/{ticket_id}"),
                Some(body),
                json_headers(),
            )
            .await?;

        decode_json(&response)
    }

    pub async fn add_html_comment(&self, ticket_id: TicketId, html: &str) -> Result<TransactionId> {
        self.add_comment(ticket_id, html, "text/html").await
    }

    pub async fn add_text_comment(&self, ticket_id: TicketId, text: &str) -> Result<TransactionId> {
        self.add_comment(ticket_id, text, "text/plain").await
    }

    /// Search a ticket's comment transactions whose content matches
    /// `data_text`. The decoded response is returned as-is.
    pub async fn search_transactions(&self, ticket_id: TicketId, data_text: &str) -> Result<Value> {
        let filters = comment_search_filters(ticket_id, data_text);
        let body = serde_json::to_string(&filters).map_err(ApiError::Serialize)?;
        let response = self
            .sender
            .send_request(Method::POST, "transactions", Some(body), HeaderMap::new())
            .await?;

        decode_json(&response)
    }

    async fn add_comment(
        &self,
        ticket_id: TicketId,
        comment: &str,
        mime_type: &'static str,
    ) -> Result<TransactionId> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(mime_type));

        let response = self
            .sender
            .send_request(
                Method::POST,
                &format!("ticket/{ticket_id}/comment"),
                Some(comment.to_string()),
                headers,
            )
            .await?;

        let transaction_id = transaction_id_from_response(&response)?;
        debug!(ticket_id, transaction_id = %transaction_id, mime_type, "Comment added");
        Ok(transaction_id)
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn decode_json(response: &ApiResponse) -> Result<Value> {
    serde_json::from_slice(&response.body).map_err(ApiError::Decode)
}

fn transaction_id_from_response(response: &ApiResponse) -> Result<TransactionId> {
    let values = response.header_values(LOCATION.as_str());
    let [location] = values.as_slice() else {
        return Err(ApiError::Protocol("missing 'Location' header".to_string()));
    };

    let location = location.to_str().map_err(|_| {
        ApiError::Protocol("unexpected value in 'Location' header".to_string())
    })?;
    parse_transaction_id(location)
}

/// Extract the transaction ID from a `.../REST/2.0/transaction/<id>` URL.
///
/// Everything after the first `/REST/2.0/transaction/` must be ASCII digits
/// only; signs, slashes and query strings are rejected.
pub fn parse_transaction_id(location: &str) -> Result<TransactionId> {
    let start = location.find(TRANSACTION_PATH).ok_or_else(|| {
        ApiError::Protocol("unexpected value in 'Location' header".to_string())
    })?;
    let digits = &location[start + TRANSACTION_PATH.len()..];

    let non_numeric = || {
        ApiError::Protocol(format!(
            "non-numeric transaction id in 'Location' header: {location}"
        ))
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(non_numeric());
    }

    digits
        .parse::<u64>()
        .map(TransactionId)
        .map_err(|_| non_numeric())
}
