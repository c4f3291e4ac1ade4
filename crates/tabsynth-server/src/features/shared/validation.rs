//! Shared validation utilities
//!
//! Boundary checks for names supplied by callers before anything touches the
//! database or the filesystem.
//!
//! # Examples
//!
//! ```rust,ignore
//! use tabsynth_server::features::shared::validation::{validate_filename, validate_username};
//!
//! validate_filename("iris.csv")?;
//! validate_username("ada")?;
//! ```

use thiserror::Error;

/// Longest accepted upload file name, in bytes.
///
/// Stored names gain an `<id>_` or `<id>_s_` prefix and must still fit the
/// 255-byte file name limit of common filesystems.
pub const MAX_FILENAME_LENGTH: usize = 255 - STORED_PREFIX_RESERVE;

/// Widest prefix added to a stored name: 19 digits of an `i64` id plus `_s_`.
const STORED_PREFIX_RESERVE: usize = 24;

pub const USERNAME_LENGTH: (usize, usize) = (2, 50);
pub const PASSWORD_LENGTH: (usize, usize) = (4, 50);

/// Errors that can occur during upload file name validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilenameValidationError {
    #[error("File name is required and cannot be empty")]
    Required,

    #[error("File name must be at most {max_length} bytes")]
    TooLong { max_length: usize },

    #[error("File name cannot contain path separators or '..'")]
    PathComponent,
}

/// Errors that can occur during credential validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialValidationError {
    #[error("Username must be between {min} and {max} characters")]
    UsernameLength { min: usize, max: usize },

    #[error("Username can only contain letters, numbers, '.', '-' and '_'")]
    UsernameFormat,

    #[error("Password must be between {min} and {max} characters")]
    PasswordLength { min: usize, max: usize },
}

/// Validate an upload file name
///
/// # Rules
/// - Must not be empty
/// - Must not exceed [`MAX_FILENAME_LENGTH`] bytes
/// - Must be a bare name: no `/`, `\` or `..`
pub fn validate_filename(name: &str) -> Result<(), FilenameValidationError> {
    if name.trim().is_empty() {
        return Err(FilenameValidationError::Required);
    }

    if name.len() > MAX_FILENAME_LENGTH {
        return Err(FilenameValidationError::TooLong {
            max_length: MAX_FILENAME_LENGTH,
        });
    }

    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(FilenameValidationError::PathComponent);
    }

    Ok(())
}

/// Validate a username
///
/// # Rules
/// - 2 to 50 characters
/// - ASCII letters, digits, `.`, `-` and `_`
pub fn validate_username(username: &str) -> Result<(), CredentialValidationError> {
    let (min, max) = USERNAME_LENGTH;
    let len = username.chars().count();
    if len < min || len > max {
        return Err(CredentialValidationError::UsernameLength { min, max });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(CredentialValidationError::UsernameFormat);
    }

    Ok(())
}

/// Validate a password (4 to 50 characters)
pub fn validate_password(password: &str) -> Result<(), CredentialValidationError> {
    let (min, max) = PASSWORD_LENGTH;
    let len = password.chars().count();
    if len < min || len > max {
        return Err(CredentialValidationError::PasswordLength { min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("iris.csv").is_ok());
        assert!(validate_filename("my data (2).csv").is_ok());
        assert_eq!(validate_filename(""), Err(FilenameValidationError::Required));
        assert_eq!(validate_filename("  "), Err(FilenameValidationError::Required));
        assert_eq!(
            validate_filename("../etc/passwd.csv"),
            Err(FilenameValidationError::PathComponent)
        );
        assert_eq!(
            validate_filename("a\\b.csv"),
            Err(FilenameValidationError::PathComponent)
        );
        assert_eq!(
            validate_filename(&format!("{}.csv", "x".repeat(MAX_FILENAME_LENGTH))),
            Err(FilenameValidationError::TooLong {
                max_length: MAX_FILENAME_LENGTH
            })
        );
        let longest = format!("{}.csv", "x".repeat(MAX_FILENAME_LENGTH - 4));
        assert!(validate_filename(&longest).is_ok());
        assert!(format!("{}_s_{longest}", i64::MAX).len() <= 255);
        // Multi-byte names are measured in bytes
        assert!(validate_filename(&format!("{}.csv", "é".repeat(120))).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ada").is_ok());
        assert!(validate_username("ada.lovelace_1").is_ok());
        assert!(validate_username("a").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert_eq!(
            validate_username("ada lovelace"),
            Err(CredentialValidationError::UsernameFormat)
        );
        assert_eq!(validate_username("a:b"), Err(CredentialValidationError::UsernameFormat));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("abcd").is_ok());
        assert!(validate_password("abc").is_err());
        assert!(validate_password(&"p".repeat(51)).is_err());
    }
}
