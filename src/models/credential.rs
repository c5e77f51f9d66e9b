use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Claim key mirrored from the account record into issued tokens.
pub const ADMIN_CLAIM: &str = "isAdmin";

/// Login credential and its custom claims: the second source of truth for
/// the admin flag, and the place the session-level disable flag lives.
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub custom_claims: Map<String, Value>,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// The admin claim, if one has ever been written. Non-boolean values
    /// are ignored.
    pub fn admin_claim(&self) -> Option<bool> {
        self.custom_claims.get(ADMIN_CLAIM).and_then(Value::as_bool)
    }
}

pub fn parse_claims(raw: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_claims_read_as_empty() {
        assert!(parse_claims("not json").is_empty());
        assert!(parse_claims("[1,2]").is_empty());
        assert_eq!(parse_claims(r#"{"isAdmin":true}"#).get(ADMIN_CLAIM), Some(&Value::Bool(true)));
    }

    #[test]
    fn non_boolean_admin_claim_is_ignored() {
        let credential = Credential {
            id: Uuid::new_v4(),
            email: "x@example.com".into(),
            password_hash: String::new(),
            custom_claims: parse_claims(r#"{"isAdmin":"yes"}"#),
            disabled: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(credential.admin_claim(), None);
    }
}
