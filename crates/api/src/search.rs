//! Filter payloads for the `transactions` search endpoint.

use crate::ticket::TicketId;
use serde::Serialize;
use serde_json::Value;

/// One `{field, operator?, value}` clause. RT treats a missing operator as
/// equality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionFilter {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    pub value: Value,
}

impl TransactionFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: None,
            value: value.into(),
        }
    }

    pub fn like(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: Some("LIKE".to_string()),
            value: value.into(),
        }
    }
}

/// Comments on `ticket_id` whose content contains `data_text`.
pub fn comment_search_filters(ticket_id: TicketId, data_text: &str) -> Vec<TransactionFilter> {
    vec![
        TransactionFilter::like("Data", data_text),
        TransactionFilter::equals("Type", "Comment"),
        TransactionFilter::equals("ObjectType", "RT::Ticket"),
        TransactionFilter::equals("ObjectId", ticket_id),
    ]
}
