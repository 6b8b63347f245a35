use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

/// Error envelope returned by every JSON endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_in_snake_case() {
        let err = ApiError::new(ErrorCode::NotFound, "no counter named 'x'");
        let json = serde_json::to_value(&err).expect("json");
        assert_eq!(json["code"], "not_found");
        assert_eq!(err.to_string(), "no counter named 'x'");
    }

    #[test]
    fn api_error_propagates_as_std_error() {
        fn lookup() -> Result<(), Box<dyn std::error::Error>> {
            Err(ApiError::new(ErrorCode::Conflict, "name taken"))?;
            Ok(())
        }
        let err = lookup().expect_err("conflict");
        assert_eq!(err.to_string(), "name taken");
        let api = err.downcast_ref::<ApiError>().expect("ApiError");
        assert_eq!(api.code, ErrorCode::Conflict);
    }
}
