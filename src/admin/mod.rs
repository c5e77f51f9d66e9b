//! Privileged account administration: role and disable changes, the audit
//! trail they leave, and drift reporting between claims and records.

pub mod audit;
pub mod backend;
pub mod reconcile;
mod service;

pub use backend::{AccountDirectory, AuditSink, CredentialStore, SqliteBackend, SyncIssueLog};
pub use service::{
    DisableUserRequest, DisableUserResponse, RoleMutationService, SetAdminRoleRequest, SetAdminRoleResponse,
};
