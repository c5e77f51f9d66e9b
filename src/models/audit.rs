use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    RoleChange,
    DisableChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::RoleChange => "role-change",
            AuditAction::DisableChange => "disable-change",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "role-change" => Some(AuditAction::RoleChange),
            "disable-change" => Some(AuditAction::DisableChange),
            _ => None,
        }
    }
}

/// One Role Mutation Service invocation, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub action: AuditAction,
    pub actor_id: Uuid,
    pub actor_email: String,
    /// Admin status at the moment the call was made.
    pub actor_was_admin: bool,
    pub target_id: Uuid,
    pub target_email: Option<String>,
    pub previous_value: Option<bool>,
    pub new_value: bool,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
}

/// A dual write that left the claim and the record disagreeing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSyncIssue {
    pub id: Uuid,
    pub target_id: Uuid,
    pub field: String,
    pub claim_value: bool,
    pub record_value: Option<bool>,
    pub detail: String,
    pub detected_at: DateTime<Utc>,
}
