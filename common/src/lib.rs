pub mod config;
pub mod logger;

use validator::ValidationErrors;

/// Collect every code attached to failed validation rules, in field order.
/// Codes are stable machine-readable identifiers (e.g. `SUBJECT_TOO_LONG`),
/// so the first one is what callers surface to clients.
pub fn validation_error_codes(errors: &ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter().map(|e| e.code.to_string()))
        .collect()
}
