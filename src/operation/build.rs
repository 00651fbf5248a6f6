use super::types::{Operation, ParamLocation, SUPPORTED_METHODS};
use crate::router::pattern_tokens;
use crate::validator::ValidationIssue;
use std::collections::HashSet;

/// Check one operation's internal consistency.
///
/// Reports, without stopping at the first problem:
/// - an unsupported method
/// - a pattern that does not start with `/` or has an empty segment
/// - a failure sharing the success code
/// - url params that differ from the pattern's `:name` tokens (name or order)
/// - a parameter name declared twice in the same location
pub fn check_operation(op: &Operation) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let location = format!("{} {}", op.method, op.url_pattern);

    if !SUPPORTED_METHODS.contains(&op.method) {
        issues.push(ValidationIssue::new(
            &location,
            "UnsupportedMethod",
            format!(
                "operation '{}' uses {}; only DELETE, GET, PATCH, POST and PUT are supported",
                op.operation_id, op.method
            ),
        ));
    }

    if !op.url_pattern.starts_with('/') {
        issues.push(ValidationIssue::new(
            &location,
            "InvalidPattern",
            format!("url pattern of '{}' must start with '/'", op.operation_id),
        ));
    }
    if op.url_pattern.contains("//") || (op.url_pattern.len() > 1 && op.url_pattern.ends_with('/')) {
        issues.push(ValidationIssue::new(
            &location,
            "InvalidPattern",
            format!(
                "url pattern of '{}' has an empty segment (trailing or doubled '/')",
                op.operation_id
            ),
        ));
    }

    if op.failures.iter().any(|f| f.code == op.success_code) {
        issues.push(ValidationIssue::new(
            &location,
            "FailureCodeConflict",
            format!(
                "operation '{}' declares a failure with its success code {}",
                op.operation_id, op.success_code
            ),
        ));
    }

    let tokens = pattern_tokens(&op.url_pattern);
    let declared: Vec<&str> = op.url_params.iter().map(|p| p.name.as_str()).collect();
    if tokens != declared {
        issues.push(ValidationIssue::new(
            &location,
            "UrlParamMismatch",
            format!(
                "operation '{}' declares url params {:?} but its pattern has {:?}",
                op.operation_id, declared, tokens
            ),
        ));
    }

    for loc in [ParamLocation::Url, ParamLocation::Header, ParamLocation::Query] {
        let mut seen = HashSet::new();
        for p in op.params(loc) {
            // Header names compare case-insensitively on the wire.
            let key = if loc == ParamLocation::Header {
                p.name.to_ascii_lowercase()
            } else {
                p.name.clone()
            };
            if !seen.insert(key) {
                issues.push(ValidationIssue::new(
                    &location,
                    "DuplicateParam",
                    format!(
                        "operation '{}' declares {} param '{}' more than once",
                        op.operation_id, loc, p.name
                    ),
                ));
            }
        }
    }

    issues
}
