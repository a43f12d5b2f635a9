//! Conversion from `mnemo-core`'s `MemoryError` to MCP protocol errors.

use mnemo_core::MemoryError;
use rmcp::ErrorData as McpError;

/// Converts a core error into an MCP internal error, except validation
/// failures, which map to `invalid_params` so the client sees them as a
/// request-shape problem rather than a server fault.
pub fn to_mcp_error(err: MemoryError) -> McpError {
    match err {
        MemoryError::Validation { field, message } => {
            validation_error(&format!("{field}: {message}"))
        }
        other => McpError::internal_error(other.to_string(), None),
    }
}

pub fn validation_error(msg: &str) -> McpError {
    McpError::invalid_params(msg.to_string(), None)
}

pub fn not_found_error(msg: &str) -> McpError {
    McpError::internal_error(format!("not found: {msg}"), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn validation_errors_map_to_invalid_params() {
        let err = to_mcp_error(MemoryError::validation("key", "must not be empty"));
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("key"));
    }

    #[test]
    fn other_errors_map_to_internal_error() {
        let err = to_mcp_error(MemoryError::invariant("multiple ACTIVE threads"));
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn not_found_error_wraps_message() {
        let err = not_found_error("block-123");
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("block-123"));
    }
}
