use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;
use serde::de::DeserializeOwned;

use crate::errors::AppError;

const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::invalid_argument(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|err| AppError::internal(format!("invalid password hash: {err}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Parses a JSON request body, reporting the offending field path.
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    if body.is_empty() {
        return Err(AppError::invalid_argument("request body is required"));
    }

    let de = &mut serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let path = err.path().to_string();
        let inner = err.into_inner();
        if path == "." {
            AppError::invalid_argument(inner.to_string())
        } else {
            AppError::invalid_argument(format!("{}: {}", path, inner))
        }
    })
}

/// Lower-cased, trimmed email for comparisons and storage.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Payload {
        #[allow(dead_code)]
        target_id: String,
        is_admin: bool,
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(hash_password("short"), Err(AppError::InvalidArgument(_))));
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn body_errors_name_the_field() {
        let err = parse_json_body::<Payload>(br#"{"targetId":"a","isAdmin":"true"}"#).unwrap_err();
        match err {
            AppError::InvalidArgument(msg) => assert!(msg.starts_with("isAdmin"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }

        let ok: Payload = parse_json_body(br#"{"targetId":"a","isAdmin":true}"#).unwrap();
        assert!(ok.is_admin);
    }

    #[test]
    fn empty_or_malformed_body_is_invalid() {
        assert!(matches!(parse_json_body::<Payload>(b""), Err(AppError::InvalidArgument(_))));
        assert!(matches!(parse_json_body::<Payload>(b"{"), Err(AppError::InvalidArgument(_))));
    }
}
