use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::OutlookError;

/// Uniform `{successful, data, error}` result of every tool.
///
/// `error` is present exactly when `successful` is false; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    successful: bool,
    data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ResponseEnvelope {
    pub fn success(data: Value) -> Self {
        let data = if data.is_null() { json!({}) } else { data };
        Self {
            successful: true,
            data,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            successful: false,
            data: json!({}),
            error: Some(message.into()),
        }
    }

    pub fn from_result(result: Result<Value, OutlookError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failure(e.to_string()),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.successful
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Wire form; `error` is omitted on success.
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "successful": self.successful,
            "data": self.data,
        });
        if let Some(error) = &self.error {
            value["error"] = json!(error);
        }
        value
    }
}

impl From<ResponseEnvelope> for CallToolResult {
    fn from(envelope: ResponseEnvelope) -> Self {
        let value = envelope.to_value();
        CallToolResult {
            content: vec![Content::text(value.to_string())],
            structured_content: Some(value),
            is_error: Some(!envelope.successful),
            meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_present_only_on_failure() {
        let ok = ResponseEnvelope::success(json!({"id": "1"}));
        assert!(ok.is_successful());
        assert!(ok.error().is_none());

        let failed = ResponseEnvelope::from_result(Err(OutlookError::AuthenticationRequired));
        assert!(!failed.is_successful());
        assert_eq!(
            failed.error(),
            Some("Not authenticated. Please authenticate first.")
        );
        assert_eq!(failed.data(), &json!({}));
    }

    #[test]
    fn success_omits_error_key() {
        let ok = ResponseEnvelope::success(json!({"message": "Email sent successfully"}));
        let expected = json!({"successful": true, "data": {"message": "Email sent successfully"}});
        assert_eq!(ok.to_value(), expected);
        assert_eq!(serde_json::to_value(&ok).unwrap(), expected);

        let failed = ResponseEnvelope::failure("boom").to_value();
        assert_eq!(failed, json!({"successful": false, "data": {}, "error": "boom"}));
    }

    #[test]
    fn null_data_normalizes_to_object() {
        assert_eq!(ResponseEnvelope::success(Value::Null).data(), &json!({}));
    }

    #[test]
    fn call_tool_result_carries_envelope() {
        let result: CallToolResult = ResponseEnvelope::failure("boom").into();
        assert_eq!(result.is_error, Some(true));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["successful"], false);
        assert_eq!(structured["error"], "boom");
    }
}
