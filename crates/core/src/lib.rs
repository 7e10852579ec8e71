//! Shared primitives for all Rust crates in Linkletter.

#![forbid(unsafe_code)]

use thiserror::Error;

/// Result type used across Linkletter crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
///
/// The display strings of the flow variants are user-facing: they are
/// serialized verbatim into the `{error, now}` JSON envelope returned to
/// clients. Token mismatch and token expiry stay distinct so the UI can
/// offer "request another link" only where it helps.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed user input (missing email, unknown subscriber,
    /// bad unsubscribe signature). Deliberately generic.
    #[error("Bad data")]
    BadData,

    /// Requested opt-in channel ids that do not exist or are inactive.
    #[error("Invalid input: {0}")]
    InvalidOptIns(String),

    /// Authenticated caller does not match the target subscriber email.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Presented token does not match the stored hash, or no verification
    /// is in flight for the subscriber.
    #[error("Token not verified")]
    TokenNotVerified,

    /// Presented token matched but its expiry timestamp has passed.
    #[error("Token expired")]
    TokenExpired,

    /// The email collaborator returned no usable send result.
    #[error("Unknown email result")]
    EmailFailed,

    /// The delegated host login call failed; carries the best-available
    /// diagnostic text from the host.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Invalid configuration or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn flow_errors_render_their_wire_messages() {
        assert_eq!(AppError::BadData.to_string(), "Bad data");
        assert_eq!(AppError::TokenNotVerified.to_string(), "Token not verified");
        assert_eq!(AppError::TokenExpired.to_string(), "Token expired");
        assert_eq!(AppError::EmailFailed.to_string(), "Unknown email result");
    }

    #[test]
    fn unauthorized_includes_the_target_email() {
        let error = AppError::Unauthorized("a@x.com".to_owned());
        assert_eq!(error.to_string(), "Unauthorized: a@x.com");
    }

    #[test]
    fn invalid_opt_ins_lists_the_offending_ids() {
        let error = AppError::InvalidOptIns("[\"bogus-id\"]".to_owned());
        assert!(error.to_string().contains("bogus-id"));
    }
}
