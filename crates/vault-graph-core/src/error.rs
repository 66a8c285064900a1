//! Error types for the core crate.
//!
//! Only configuration mistakes are errors here. Malformed note text,
//! dangling links, and ambiguous titles are diagnostics carried as data in
//! [`crate::models::Diagnostics`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("domain name must not be empty")]
    EmptyDomainName,

    #[error("domain '{0}' is defined more than once")]
    DuplicateDomain(String),

    #[error("rule in domain '{domain}' targets '{pattern}', which matches no configured domain")]
    UnknownRuleTarget { domain: String, pattern: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}
