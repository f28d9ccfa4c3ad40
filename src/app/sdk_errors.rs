//! Failure categorization for control-plane errors.
//!
//! The SDK retries transient failures itself (bounded by `AWS_MAX_ATTEMPTS`).
//! What reaches the application is final, and this module only labels it:
//! fail-list records carry the label, and the ingestion trigger uses it to tell
//! a concurrency limit apart from a real failure.

use serde::{Deserialize, Serialize};

/// Categorized error types for AWS SDK errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request was throttled or hit a service quota
    Throttled { service: String, error_code: String },
    /// Request timed out
    Timeout { operation: String },
    /// Network connectivity issues
    NetworkError { message: String },
    /// AWS service temporarily unavailable
    ServiceUnavailable { service: String, message: String },
    /// The addressed resource does not exist
    NotFound { code: String },
    /// The resource already exists
    Conflict { code: String },
    /// Permissions, validation and everything else
    NonRetryable {
        code: String,
        message: String,
        is_permission_error: bool,
    },
}

impl ErrorCategory {
    /// Returns true if this error category is transient
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Throttled { .. }
                | ErrorCategory::Timeout { .. }
                | ErrorCategory::NetworkError { .. }
                | ErrorCategory::ServiceUnavailable { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            ErrorCategory::Throttled { service, .. } => format!("{} rate limited", service),
            ErrorCategory::Timeout { operation } => format!("{} timeout", operation),
            ErrorCategory::NetworkError { .. } => "Network error".to_string(),
            ErrorCategory::ServiceUnavailable { service, .. } => {
                format!("{} unavailable", service)
            }
            ErrorCategory::NotFound { code }
            | ErrorCategory::Conflict { code }
            | ErrorCategory::NonRetryable { code, .. } => code.clone(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ErrorCategory::Throttled { .. } => FailureKind::Throttled,
            ErrorCategory::Timeout { .. } => FailureKind::Timeout,
            ErrorCategory::NetworkError { .. } => FailureKind::Network,
            ErrorCategory::ServiceUnavailable { .. } => FailureKind::Unavailable,
            ErrorCategory::NotFound { .. } => FailureKind::NotFound,
            ErrorCategory::Conflict { .. } => FailureKind::Conflict,
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            } => FailureKind::Permission,
            ErrorCategory::NonRetryable { .. } => FailureKind::Error,
        }
    }
}

/// Compact label stored on fail-list records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Throttled,
    Timeout,
    Network,
    Unavailable,
    NotFound,
    Conflict,
    Permission,
    Error,
}

/// Categorize an `anyhow::Error`, looking through its whole context chain.
pub fn categorize_error(error: &anyhow::Error, service: &str, operation: &str) -> ErrorCategory {
    categorize_error_string(&format!("{:#}", error), service, operation)
}

/// Categorize an error based on its string representation
pub fn categorize_error_string(error_str: &str, service: &str, operation: &str) -> ErrorCategory {
    if error_str.contains("ThrottlingException")
        || error_str.contains("Throttling")
        || error_str.contains("TooManyRequestsException")
        || error_str.contains("LimitExceededException")
        || error_str.contains("RateExceeded")
    {
        let error_code = extract_error_code(error_str).unwrap_or_else(|| "Throttling".to_string());
        return ErrorCategory::Throttled {
            service: service.to_string(),
            error_code,
        };
    }

    if error_str.contains("ResourceNotFoundException") {
        return ErrorCategory::NotFound {
            code: "ResourceNotFoundException".to_string(),
        };
    }

    if error_str.contains("ResourceExistsException") || error_str.contains("ConflictException") {
        let code = extract_error_code(error_str)
            .unwrap_or_else(|| "ResourceExistsException".to_string());
        return ErrorCategory::Conflict { code };
    }

    if error_str.contains("TimeoutError")
        || error_str.contains("timeout")
        || error_str.contains("timed out")
    {
        return ErrorCategory::Timeout {
            operation: operation.to_string(),
        };
    }

    let lower = error_str.to_ascii_lowercase();
    if error_str.contains("DispatchFailure")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("connection closed")
        || lower.contains("dns error")
    {
        return ErrorCategory::NetworkError {
            message: truncate_message(error_str, 100),
        };
    }

    if error_str.contains("ServiceUnavailable")
        || error_str.contains("InternalFailureException")
        || error_str.contains("InternalServerException")
        || error_str.contains("Service Unavailable")
    {
        return ErrorCategory::ServiceUnavailable {
            service: service.to_string(),
            message: truncate_message(error_str, 100),
        };
    }

    let is_permission_error = error_str.contains("AccessDenied")
        || error_str.contains("UnauthorizedOperation")
        || error_str.contains("InvalidClientTokenId")
        || error_str.contains("ExpiredToken");

    let code = extract_error_code(error_str).unwrap_or_else(|| {
        if is_permission_error {
            "AccessDenied".to_string()
        } else {
            "Error".to_string()
        }
    });

    ErrorCategory::NonRetryable {
        code,
        message: truncate_message(error_str, 200),
        is_permission_error,
    }
}

/// Extract the AWS error code from a rendered SDK error.
///
/// `DisplayErrorContext` renders as
/// `service error: ResourceExistsException: Group already exists (...)`, and
/// anyhow context chains put `context: ` in front, so the first segment that
/// looks like an error name wins.
fn extract_error_code(error_str: &str) -> Option<String> {
    for segment in error_str.split(':') {
        let candidate = segment.trim();
        let candidate = candidate.rsplit("::").next().unwrap_or(candidate);
        if (candidate.ends_with("Exception") || candidate.ends_with("Error"))
            && !candidate.contains(' ')
            && candidate.len() < 64
        {
            return Some(candidate.to_string());
        }
    }

    // Debug output: code: "ErrorName"
    if let Some(start) = error_str.find("code:") {
        let after_code = &error_str[start + 5..];
        if let Some(quote_start) = after_code.find('"') {
            let after_quote = &after_code[quote_start + 1..];
            if let Some(quote_end) = after_quote.find('"') {
                let code = &after_quote[..quote_end];
                if !code.is_empty() && code.len() < 64 {
                    return Some(code.to_string());
                }
            }
        }
    }

    None
}

/// Truncate a message to max length, adding ellipsis if truncated
fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        return msg.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &msg[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_limit_exceeded_as_throttled() {
        let error = "service error: LimitExceededException: too many concurrent ingestions";
        let cat = categorize_error_string(error, "QuickSight", "CreateIngestion");
        assert_eq!(
            cat,
            ErrorCategory::Throttled {
                service: "QuickSight".to_string(),
                error_code: "LimitExceededException".to_string(),
            }
        );
        assert!(cat.is_retryable());
        assert_eq!(cat.kind(), FailureKind::Throttled);
    }

    #[test]
    fn test_categorize_existing_group() {
        let error = "Failed to create group Sales: service error: ResourceExistsException: Group already exists";
        let cat = categorize_error_string(error, "QuickSight", "CreateGroup");
        assert_eq!(cat.kind(), FailureKind::Conflict);
        assert_eq!(cat.user_message(), "ResourceExistsException");
    }

    #[test]
    fn test_categorize_not_found() {
        let error = anyhow::anyhow!("ResourceNotFoundException: no such dashboard")
            .context("Failed to describe dashboard sales");
        let cat = categorize_error(&error, "QuickSight", "DescribeDashboard");
        assert_eq!(cat.kind(), FailureKind::NotFound);
        assert!(!cat.is_retryable());
    }

    #[test]
    fn test_categorize_access_denied() {
        let error = "AccessDeniedException: User is not authorized";
        let cat = categorize_error_string(error, "QuickSight", "CreateDataSet");
        assert!(matches!(
            cat,
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            }
        ));
        assert_eq!(cat.kind(), FailureKind::Permission);
    }

    #[test]
    fn test_categorize_generic_error() {
        let error = "InvalidParameterValueException: Invalid placeholder";
        let cat = categorize_error_string(error, "QuickSight", "CreateAnalysis");
        assert_eq!(cat.kind(), FailureKind::Error);
        assert_eq!(cat.user_message(), "InvalidParameterValueException");
    }

    #[test]
    fn test_categorize_network_only_on_transport_failures() {
        let dispatch = "dispatch failure: DispatchFailure(io error: Connection refused (os error 111))";
        assert_eq!(
            categorize_error_string(dispatch, "QuickSight", "ListDataSets").kind(),
            FailureKind::Network
        );

        let config = "data source orders uses a VPC connection but no target VPC connection is configured";
        assert_eq!(
            categorize_error_string(config, "quicksight", "transform").kind(),
            FailureKind::Error
        );
    }

    #[test]
    fn test_extract_error_code() {
        assert_eq!(
            extract_error_code("ThrottlingException: Rate exceeded"),
            Some("ThrottlingException".to_string())
        );
        assert_eq!(
            extract_error_code("code: \"ValidationException\""),
            Some("ValidationException".to_string())
        );
        assert_eq!(extract_error_code("plain failure"), None);
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(truncate_message("abcdefghijkl", 8), "abcde...");
    }
}
