use serde::{Deserialize, Serialize};

/// 统一响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            error: None,
            remaining_requests: None,
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            error: Some(message.to_string()),
            remaining_requests: None,
            data: None,
        }
    }

    pub fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining_requests = Some(remaining);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_shape() {
        let body = serde_json::to_value(ApiResult::<()>::error("nope").with_remaining(0)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "error": "nope", "remaining_requests": 0 })
        );
    }
}
