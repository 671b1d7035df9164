//! User accounts: identity, credentials and profile created as one unit.
//!
//! Error payloads go back to the caller, so the submitted password is
//! replaced in the echoed row and in any message the store produced.

use serde_json::{Value, json};

use crate::import::importers::enumerated;
use crate::import::{ImportContext, Row, RowError, fields};
use crate::models::{NewUserAccount, UserType};

pub const REDACTED: &str = "[REDACTED]";
const SENSITIVE_FIELDS: &[&str] = &["password"];
const MIN_PASSWORD_LEN: usize = 6;

pub async fn import_row(ctx: &ImportContext<'_>, row: &Row) -> Result<(), RowError> {
    let email = fields::required_text(row, "email")?.to_lowercase();
    if !is_plausible_email(&email) {
        return Err(RowError::Invalid(format!("email '{email}' is not valid")));
    }

    let password = fields::required_string(row, "password")?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RowError::Invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user_type = enumerated(
        row,
        "user_type",
        UserType::parse,
        &["student", "instructor", "admin"],
    )?
    .unwrap_or_default();
    let full_name = fields::text(row, "full_name");

    let password_hash = ctx
        .passwords
        .hash_password(&password)
        .map_err(|err| RowError::Internal(format!("could not secure password: {err}")))?;

    let account = NewUserAccount {
        email,
        password_hash,
        metadata: json!({ "full_name": full_name }),
        full_name,
        user_type,
        bio: fields::text(row, "bio"),
    };

    let user_id = ctx.store.create_user_account(&account).await?;
    log::debug!("created {} account {}", account.user_type.as_str(), user_id);
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Copy of `row` with sensitive fields replaced.
pub fn redact(row: &Row) -> Row {
    let mut redacted = row.clone();
    for field in SENSITIVE_FIELDS {
        if let Some(value) = redacted.get_mut(*field) {
            *value = Value::String(REDACTED.to_string());
        }
    }
    redacted
}

/// Remove any submitted sensitive value from a store error message.
///
/// Importer messages are fixed text and never quote the password, so only
/// store messages go through here.
pub fn scrub(message: &str, row: &Row) -> String {
    let mut scrubbed = message.to_string();
    for field in SENSITIVE_FIELDS {
        if let Some(secret) = fields::text(row, field) {
            scrubbed = scrubbed.replace(&secret, REDACTED);
        }
    }
    scrubbed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(value: Value) -> Row {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn redacts_only_sensitive_fields() {
        let original = row(json!({"email": "a@b.co", "password": "s3cret!", "full_name": "A"}));
        let redacted = redact(&original);
        assert_eq!(redacted["password"], json!(REDACTED));
        assert_eq!(redacted["email"], json!("a@b.co"));
        assert_eq!(original["password"], json!("s3cret!"));
    }

    #[test]
    fn scrubs_passwords_from_messages() {
        let original = row(json!({"email": "a@b.co", "password": "s3cret!"}));
        assert_eq!(
            scrub("value s3cret! rejected", &original),
            "value [REDACTED] rejected"
        );
    }

    #[test]
    fn empty_secrets_leave_messages_alone() {
        let original = row(json!({"password": ""}));
        assert_eq!(scrub("password is required", &original), "password is required");
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("ana@ejemplo.com"));
        assert!(!is_plausible_email("ana.ejemplo.com"));
        assert!(!is_plausible_email("@ejemplo.com"));
        assert!(!is_plausible_email("ana@localhost"));
        assert!(!is_plausible_email("ana maria@ejemplo.com"));
    }
}
