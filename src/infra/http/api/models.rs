use serde::{Deserialize, Serialize};

use crate::domain::identifiers::IdentifierInput;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchProductRequest {
    pub asin: IdentifierInput,
    #[serde(default)]
    pub test_connection: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProductRequest {
    pub asin: String,
    #[serde(default)]
    pub post_status: Option<String>,
    #[serde(default)]
    pub post_type: Option<String>,
}

/// `{status, message}` body used by import and clear-cache.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMessage {
    pub status: String,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Legacy lookup failure body: a numeric `status` of 500 regardless of the HTTP status.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupFailure {
    pub status: u16,
    pub message: String,
}

impl LookupFailure {
    pub const STATUS: u16 = 500;

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Self::STATUS,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_request_accepts_camel_case_flag() {
        let request: FetchProductRequest =
            serde_json::from_str(r#"{"asin":"B08N5WRWNW","testConnection":true}"#)
                .expect("request");
        assert!(request.test_connection);
        assert_eq!(request.asin, IdentifierInput::Single("B08N5WRWNW".into()));
    }

    #[test]
    fn import_request_defaults_optional_fields() {
        let request: ImportProductRequest =
            serde_json::from_str(r#"{"asin":"B08N5WRWNW"}"#).expect("request");
        assert!(request.post_status.is_none());
        assert!(request.post_type.is_none());
    }
}
