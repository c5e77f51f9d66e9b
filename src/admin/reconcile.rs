//! Offline comparison of credentials against account records.

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::account::Account;
use crate::models::credential::Credential;
use crate::store::{accounts, credentials};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDrift {
    pub account_id: Uuid,
    pub email: String,
    pub field: &'static str,
    pub claim_value: Option<bool>,
    pub record_value: Option<bool>,
}

/// Differences for one credential/record pair. A credential with no admin
/// claim yet is not drift as long as the record says "not admin".
fn compare(credential: &Credential, account: Option<&Account>) -> Vec<ClaimDrift> {
    let drift = |field, claim_value, record_value| ClaimDrift {
        account_id: credential.id,
        email: credential.email.clone(),
        field,
        claim_value,
        record_value,
    };

    let Some(account) = account else {
        return vec![drift("account", credential.admin_claim(), None)];
    };

    let mut found = Vec::new();
    if credential.admin_claim().unwrap_or(false) != account.is_admin {
        found.push(drift("isAdmin", credential.admin_claim(), Some(account.is_admin)));
    }
    if credential.disabled != account.disabled {
        found.push(drift("disabled", Some(credential.disabled), Some(account.disabled)));
    }
    found
}

pub async fn find_claim_drift(pool: &SqlitePool) -> AppResult<Vec<ClaimDrift>> {
    let mut drift = Vec::new();
    for credential in credentials::list_credentials(pool).await? {
        let account = accounts::find_account(pool, credential.id).await?;
        drift.extend(compare(&credential, account.as_ref()));
    }
    Ok(drift)
}
