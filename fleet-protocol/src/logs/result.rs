use serde::{Deserialize, Serialize};

/// First frame of a log stream: empty on success, carrying an error otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorResult {
    pub fn ok() -> Self {
        Self { error: None }
    }

    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorInfo {
                message: message.into(),
            }),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_is_an_empty_object() {
        let encoded = serde_json::to_string(&ErrorResult::ok()).unwrap();
        assert_eq!(encoded, "{}");
    }

    #[test]
    fn error_result_carries_message() {
        let encoded = serde_json::to_string(&ErrorResult::from_message("boom")).unwrap();
        assert_eq!(encoded, r#"{"error":{"message":"boom"}}"#);
        let decoded: ErrorResult = serde_json::from_str(&encoded).unwrap();
        assert!(!decoded.is_ok());
    }
}
