use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidConfig,
    MalformedEvent,
    Io,
    Internal,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
            ErrorCode::MalformedEvent => "MALFORMED_EVENT",
            ErrorCode::Io => "IO",
            ErrorCode::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

pub trait SpendgraphError: std::error::Error {
    fn error_code(&self) -> ErrorCode;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_in_screaming_snake_case() {
        assert_eq!(ErrorCode::InvalidConfig.to_string(), "INVALID_CONFIG");
        assert_eq!(
            serde_json::to_string(&ErrorCode::MalformedEvent).unwrap(),
            "\"MALFORMED_EVENT\""
        );
    }
}
