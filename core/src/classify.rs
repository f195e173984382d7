//! Success/failure classification of a parsed response body.
//!
//! The body's `errors` array wins over the HTTP status: the server embeds
//! redirect targets and richer detail there, sometimes inside a 2xx.

use serde_json::Value;

use crate::error::ClientError;

pub const UNKNOWN_ERROR_TITLE: &str = "Unknown error";

/// Decide whether `body` (already parsed) with `status` is a success.
pub fn classify(body: &Value, status: u16) -> Result<(), ClientError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            return Err(from_error_entry(&errors[0], status));
        }
    }

    if !(200..300).contains(&status) {
        return Err(ClientError::Api {
            status,
            title: UNKNOWN_ERROR_TITLE.to_string(),
            detail: String::new(),
        });
    }

    Ok(())
}

fn from_error_entry(entry: &Value, http_status: u16) -> ClientError {
    let Some(entry) = entry.as_object() else {
        return ClientError::Api {
            status: http_status,
            title: UNKNOWN_ERROR_TITLE.to_string(),
            detail: String::new(),
        };
    };

    let status = entry.get("status").and_then(status_code).unwrap_or(http_status);
    let detail = entry
        .get("detail")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if (300..400).contains(&status) {
        return ClientError::Redirect {
            status,
            location: detail,
        };
    }

    let title = entry
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_ERROR_TITLE)
        .to_string();
    ClientError::Api {
        status,
        title,
        detail,
    }
}

/// JSON:API allows the status as a number or a numeric string.
fn status_code(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
