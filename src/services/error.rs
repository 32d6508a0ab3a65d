// SPDX-License-Identifier: MIT

//! Typed errors for the external service clients

use thiserror::Error;

/// Errors surfaced by the agent RPC and the document store
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller is not permitted to touch the requested resource
    #[error("Access denied to {resource}")]
    AccessDenied { resource: String },

    /// The requested document or endpoint does not exist
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The call exceeded its time bound
    #[error("Timed out after {seconds}s calling {service}")]
    Timeout { service: String, seconds: u64 },

    /// The agent RPC completed but reported a failure
    #[error("Agent execution failed: {message}")]
    Agent { message: String },

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Anything else the remote side reported
    #[error("{0}")]
    Other(String),
}

impl ServiceError {
    /// Create an access denied error
    pub fn access_denied(resource: impl Into<String>) -> Self {
        Self::AccessDenied {
            resource: resource.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a generic service error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_resource() {
        let err = ServiceError::access_denied("projects/p1/knowledge");
        assert_eq!(err.to_string(), "Access denied to projects/p1/knowledge");

        let err = ServiceError::not_found("workflows/w1");
        assert_eq!(err.to_string(), "Not found: workflows/w1");
    }

    #[test]
    fn test_timeout_message() {
        let err = ServiceError::Timeout {
            service: "executeSubAgent".to_string(),
            seconds: 540,
        };
        assert!(err.to_string().contains("540"));
        assert!(err.to_string().contains("executeSubAgent"));
    }
}
