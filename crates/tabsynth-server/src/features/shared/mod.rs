//! Shared utilities and types for feature modules

pub mod validation;

pub use validation::{
    validate_filename, validate_password, validate_username, CredentialValidationError,
    FilenameValidationError,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub mod test_helpers;
