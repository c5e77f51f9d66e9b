//! Authorization core
//!
//! - `ClaimResolver`: is the caller an admin (claim first, own record second)
//! - `PolicyEvaluator`: allow/deny for every account and order operation
//! - `ownership`: creator stamping and owner-editable order fields
//! - `Document`: null-safe view of a record

mod claims;
mod document;
mod evaluator;
pub mod ownership;

pub use claims::{ClaimResolver, OwnRecordLookup};
pub use document::Document;
pub use evaluator::{
    Decision, DefaultPolicyEvaluator, DenyReason, EvaluationContext, Operation, PolicyEvaluator, RecordType,
};

/// Wire names of the fields the policy inspects.
pub mod fields {
    pub mod account {
        pub const ID: &str = "id";
        pub const EMAIL: &str = "email";
        pub const DISPLAY_NAME: &str = "displayName";
        pub const IS_ADMIN: &str = "isAdmin";
        pub const DISABLED: &str = "disabled";
        pub const DISABLED_AT: &str = "disabledAt";
        pub const DISABLED_BY: &str = "disabledBy";
        pub const CREATED_AT: &str = "createdAt";
        pub const UPDATED_AT: &str = "updatedAt";
    }

    pub mod order {
        pub const ID: &str = "id";
        pub const CREATOR_ID: &str = "creatorId";
        pub const CREATOR_EMAIL: &str = "creatorEmail";
        pub const CREATED_AT: &str = "createdAt";
        pub const UPDATED_AT: &str = "updatedAt";
        pub const STATUS: &str = "status";
        pub const CUSTOMER_NAME: &str = "customerName";
        pub const CUSTOMER_PHONE: &str = "customerPhone";
        pub const CUSTOMER_EMAIL: &str = "customerEmail";
        pub const NOTES: &str = "notes";
    }
}
