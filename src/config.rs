use std::collections::HashSet;

use crate::errors::AppError;
use crate::jwt::JwtConfig;

/// Runtime configuration assembled from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub admin_allow_list: AdminAllowList,
}

impl AppConfig {
    pub fn new(jwt: JwtConfig, admin_allow_list: AdminAllowList) -> Self {
        Self { jwt, admin_allow_list }
    }

    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            jwt: JwtConfig::from_env()?,
            admin_allow_list: AdminAllowList::from_env(),
        })
    }
}

/// Operator-controlled emails whose account is created as an admin.
///
/// Only consulted when an account record is first created; an address added
/// later never promotes an existing account.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    emails: HashSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Reads the comma separated `ADMIN_EMAILS` variable.
    pub fn from_env() -> Self {
        let raw = std::env::var("ADMIN_EMAILS").unwrap_or_default();
        Self::new(raw.split(','))
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
