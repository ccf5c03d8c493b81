//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for domain identifiers and values. Each newtype
//! ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Account identifier
// ============================================================================

/// Identifier for provider accounts (database row ID)
///
/// Opaque integer assigned by the provider store at insert time. Never
/// synthesized by domain code; `AccountId::new` exists for reconstitution
/// from storage and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    /// Create an AccountId from an i64 value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid AccountId: {e}")))
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Email type
// ============================================================================

/// Validated email address (RFC 5322 basic validation)
///
/// The email address is the reconciliation join key between the provider
/// store and the account registry, so it is normalized to lowercase at
/// construction. Structural validation only:
/// - Contains exactly one @
/// - Has non-empty local part
/// - Has non-empty domain with at least one dot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Create a new validated Email
    ///
    /// # Errors
    /// Returns error if the email format is invalid
    pub fn new(email: String) -> Result<Self, DomainError> {
        Self::validate(&email)?;
        // Lowercase so equality matches the registry's case handling
        Ok(Self(email.to_lowercase()))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the local part (before @)
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or("")
    }

    /// Get the domain part (after @)
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or("")
    }

    /// Validate email format
    fn validate(email: &str) -> Result<(), DomainError> {
        if email.is_empty() {
            return Err(DomainError::InvalidEmail(
                "Email cannot be empty".to_string(),
            ));
        }

        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return Err(DomainError::InvalidEmail(format!(
                "Email must contain exactly one '@': {email}"
            )));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() || local.len() > 64 {
            return Err(DomainError::InvalidEmail(format!(
                "Email local part must be 1-64 characters: {email}"
            )));
        }

        if !local
            .chars()
            .all(|c| c.is_alphanumeric() || ".+-_".contains(c))
        {
            return Err(DomainError::InvalidEmail(format!(
                "Email local part contains invalid characters: {email}"
            )));
        }

        if domain.is_empty() || domain.len() > 255 {
            return Err(DomainError::InvalidEmail(format!(
                "Email domain must be 1-255 characters: {email}"
            )));
        }

        if !domain.contains('.') {
            return Err(DomainError::InvalidEmail(format!(
                "Email domain must contain at least one dot: {email}"
            )));
        }

        if !domain
            .chars()
            .all(|c| c.is_alphanumeric() || ".-".contains(c))
        {
            return Err(DomainError::InvalidEmail(format!(
                "Email domain contains invalid characters: {email}"
            )));
        }

        for label in domain.split('.') {
            if label.is_empty() {
                return Err(DomainError::InvalidEmail(format!(
                    "Email domain contains empty label: {email}"
                )));
            }
            if label.starts_with('-') || label.ends_with('-') {
                return Err(DomainError::InvalidEmail(format!(
                    "Email domain label cannot start or end with hyphen: {email}"
                )));
            }
        }

        Ok(())
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Email {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod account_id_tests {
        use super::*;

        #[test]
        fn test_new() {
            let id = AccountId::new(42);
            assert_eq!(id.as_i64(), 42);
        }

        #[test]
        fn test_display() {
            let id = AccountId::new(123);
            assert_eq!(id.to_string(), "123");
        }

        #[test]
        fn test_from_str() {
            let id: AccountId = "456".parse().unwrap();
            assert_eq!(id.as_i64(), 456);
        }

        #[test]
        fn test_from_str_invalid() {
            let result: Result<AccountId, _> = "not-a-number".parse();
            assert!(result.is_err());
        }

        #[test]
        fn test_from_i64() {
            let id: AccountId = 789i64.into();
            assert_eq!(id.as_i64(), 789);
        }

        #[test]
        fn test_serde_roundtrip() {
            let id = AccountId::new(7);
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, "7");
            let parsed: AccountId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, parsed);
        }
    }

    mod email_tests {
        use super::*;

        #[test]
        fn test_valid_email() {
            let email = Email::new("user@example.com".to_string()).unwrap();
            assert_eq!(email.as_str(), "user@example.com");
        }

        #[test]
        fn test_case_normalization() {
            let email = Email::new("User@EXAMPLE.COM".to_string()).unwrap();
            assert_eq!(email.as_str(), "user@example.com");
        }

        #[test]
        fn test_local_and_domain_parts() {
            let email = Email::new("user.name+tag@sub.example.com".to_string()).unwrap();
            assert_eq!(email.local_part(), "user.name+tag");
            assert_eq!(email.domain(), "sub.example.com");
        }

        #[test]
        fn test_empty_fails() {
            assert!(Email::new(String::new()).is_err());
        }

        #[test]
        fn test_no_at_fails() {
            assert!(Email::new("userexample.com".to_string()).is_err());
        }

        #[test]
        fn test_multiple_at_fails() {
            assert!(Email::new("user@name@example.com".to_string()).is_err());
        }

        #[test]
        fn test_no_domain_dot_fails() {
            assert!(Email::new("user@localhost".to_string()).is_err());
        }

        #[test]
        fn test_empty_local_fails() {
            assert!(Email::new("@example.com".to_string()).is_err());
        }

        #[test]
        fn test_domain_hyphen_edge_fails() {
            assert!(Email::new("user@-example.com".to_string()).is_err());
            assert!(Email::new("user@example-.com".to_string()).is_err());
        }

        #[test]
        fn test_serde_roundtrip() {
            let email = Email::new("test@example.com".to_string()).unwrap();
            let json = serde_json::to_string(&email).unwrap();
            let parsed: Email = serde_json::from_str(&json).unwrap();
            assert_eq!(email, parsed);
        }
    }
}
