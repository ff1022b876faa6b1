//! Credential checks run before anything reaches the identity provider.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

const EMAIL_PATTERN: &str = r"^[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

/// Minimum password length accepted at login.
pub const LOGIN_MIN_PASSWORD: usize = 6;
/// Minimum password length required at sign-up.
pub const SIGNUP_MIN_PASSWORD: usize = 8;

/// Why a set of credentials was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Enter your full name")]
    MissingName,

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Password must contain a letter and a number")]
    WeakPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Accept the terms to continue")]
    TermsNotAccepted,
}

/// Sign-up form input.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accepted_terms: bool,
}

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

/// Login needs a valid email and a password of at least six characters.
pub fn check_login(email: &str, password: &str) -> Result<(), CredentialError> {
    if !is_valid_email(email) {
        return Err(CredentialError::InvalidEmail);
    }
    if password.chars().count() < LOGIN_MIN_PASSWORD {
        return Err(CredentialError::PasswordTooShort(LOGIN_MIN_PASSWORD));
    }
    Ok(())
}

/// Sign-up rules; reports the first failing rule.
pub fn check_signup(form: &SignupForm) -> Result<(), CredentialError> {
    if form.full_name.trim().is_empty() {
        return Err(CredentialError::MissingName);
    }
    if !is_valid_email(&form.email) {
        return Err(CredentialError::InvalidEmail);
    }
    if form.password.chars().count() < SIGNUP_MIN_PASSWORD {
        return Err(CredentialError::PasswordTooShort(SIGNUP_MIN_PASSWORD));
    }
    let has_digit = form.password.chars().any(|c| c.is_ascii_digit());
    let has_letter = form.password.chars().any(|c| c.is_ascii_alphabetic());
    if !has_digit || !has_letter {
        return Err(CredentialError::WeakPassword);
    }
    if form.password != form.confirm_password {
        return Err(CredentialError::PasswordMismatch);
    }
    if !form.accepted_terms {
        return Err(CredentialError::TermsNotAccepted);
    }
    Ok(())
}

/// Strength score from 0 to 5: length, digit, upper, lower, symbol.
pub fn password_strength(password: &str) -> u8 {
    let checks = [
        password.chars().count() >= SIGNUP_MIN_PASSWORD,
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    checks.iter().filter(|&&ok| ok).count() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> SignupForm {
        SignupForm {
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            password: "engine42".into(),
            confirm_password: "engine42".into(),
            accepted_terms: true,
        }
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a@b.c"));
        assert!(!is_valid_email(" ada@example.com"));
    }

    #[test]
    fn test_login_rules() {
        assert!(check_login("ada@example.com", "secret").is_ok());
        assert_eq!(
            check_login("ada@example.com", "short"),
            Err(CredentialError::PasswordTooShort(6))
        );
        assert_eq!(
            check_login("ada", "secret"),
            Err(CredentialError::InvalidEmail)
        );
    }

    #[test]
    fn test_signup_accepts_valid_form() {
        assert!(check_signup(&valid_form()).is_ok());
    }

    #[test]
    fn test_signup_rules() {
        let mut form = valid_form();
        form.full_name = "  ".into();
        assert_eq!(check_signup(&form), Err(CredentialError::MissingName));

        let mut form = valid_form();
        form.password = "abcdefgh".into();
        form.confirm_password = "abcdefgh".into();
        assert_eq!(check_signup(&form), Err(CredentialError::WeakPassword));

        let mut form = valid_form();
        form.confirm_password = "engine43".into();
        assert_eq!(check_signup(&form), Err(CredentialError::PasswordMismatch));

        let mut form = valid_form();
        form.accepted_terms = false;
        assert_eq!(check_signup(&form), Err(CredentialError::TermsNotAccepted));
    }

    #[test]
    fn test_password_strength() {
        assert_eq!(password_strength(""), 0);
        assert_eq!(password_strength("abc"), 1);
        assert_eq!(password_strength("engine42"), 3);
        assert_eq!(password_strength("Engine42!"), 5);
    }
}
