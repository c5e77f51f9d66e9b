use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;

/// Reads flags from the caller's *own* account record and credential.
///
/// The methods take the authenticated caller rather than an id, so the
/// lookup can not be pointed at someone else's record. Implementations read
/// by primary key directly, without going back through the policy evaluator.
#[async_trait]
pub trait OwnRecordLookup: Send + Sync {
    /// `None` when the record is missing or the flag is unreadable.
    async fn own_admin_flag(&self, caller: &AuthUser) -> AppResult<Option<bool>>;

    /// Session-level disable flag on the caller's credential. `None` when
    /// the credential no longer exists.
    async fn own_session_disabled(&self, caller: &AuthUser) -> AppResult<Option<bool>>;
}

/// Answers "is this caller an admin" without recursive lookups.
///
/// The signed claim in the caller's token wins when present. Only when the
/// token carries no claim is the caller's own record consulted; any failure
/// on that path answers `false`.
#[derive(Clone)]
pub struct ClaimResolver {
    lookup: Arc<dyn OwnRecordLookup>,
}

impl ClaimResolver {
    pub fn new(lookup: Arc<dyn OwnRecordLookup>) -> Self {
        Self { lookup }
    }

    pub async fn resolve_is_admin(&self, caller: &AuthUser) -> bool {
        if let Some(is_admin) = caller.admin_claim {
            tracing::debug!(user_id = %caller.user_id, is_admin, "admin status from claim");
            return is_admin;
        }

        self.record_is_admin(caller).await
    }

    /// A valid signature is not enough: the credential behind the token must
    /// still exist and must not be disabled. Lookup errors propagate.
    pub async fn ensure_active(&self, caller: &AuthUser) -> AppResult<()> {
        match self.lookup.own_session_disabled(caller).await? {
            Some(false) => Ok(()),
            Some(true) => {
                tracing::info!(user_id = %caller.user_id, "request from disabled account refused");
                Err(AppError::unauthenticated("account disabled"))
            }
            None => Err(AppError::unauthenticated("credential no longer exists")),
        }
    }

    /// The record-only half of the resolver. Exposed for callers that need
    /// the authoritative value even when a (possibly stale) claim exists.
    pub async fn record_is_admin(&self, caller: &AuthUser) -> bool {
        match self.lookup.own_admin_flag(caller).await {
            Ok(flag) => {
                let is_admin = flag.unwrap_or(false);
                tracing::debug!(user_id = %caller.user_id, is_admin, "admin status from own record");
                is_admin
            }
            Err(err) => {
                tracing::warn!(user_id = %caller.user_id, error = %err, "own record lookup failed; treating caller as non-admin");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct CountingLookup {
        calls: AtomicUsize,
        answer: AppResult<Option<bool>>,
        disabled: Option<bool>,
    }

    impl CountingLookup {
        fn new(answer: AppResult<Option<bool>>) -> Arc<Self> {
            Self::with_session(answer, Some(false))
        }

        fn with_session(answer: AppResult<Option<bool>>, disabled: Option<bool>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer,
                disabled,
            })
        }
    }

    #[async_trait]
    impl OwnRecordLookup for CountingLookup {
        async fn own_admin_flag(&self, _caller: &AuthUser) -> AppResult<Option<bool>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answer {
                Ok(v) => Ok(*v),
                Err(e) => Err(AppError::internal(e.to_string())),
            }
        }

        async fn own_session_disabled(&self, _caller: &AuthUser) -> AppResult<Option<bool>> {
            Ok(self.disabled)
        }
    }

    fn caller() -> AuthUser {
        AuthUser::new(Uuid::new_v4(), "c@example.com")
    }

    #[tokio::test]
    async fn claim_short_circuits_the_lookup() {
        let lookup = CountingLookup::new(Ok(Some(false)));
        let resolver = ClaimResolver::new(lookup.clone());

        assert!(resolver.resolve_is_admin(&caller().with_admin_claim(true)).await);
        assert!(!resolver.resolve_is_admin(&caller().with_admin_claim(false)).await);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_claim_reads_own_record_once() {
        let lookup = CountingLookup::new(Ok(Some(true)));
        let resolver = ClaimResolver::new(lookup.clone());

        assert!(resolver.resolve_is_admin(&caller()).await);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_record_or_flag_means_not_admin() {
        let resolver = ClaimResolver::new(CountingLookup::new(Ok(None)));
        assert!(!resolver.resolve_is_admin(&caller()).await);
    }

    #[tokio::test]
    async fn lookup_failure_means_not_admin() {
        let resolver = ClaimResolver::new(CountingLookup::new(Err(AppError::internal("db down"))));
        assert!(!resolver.resolve_is_admin(&caller()).await);
    }

    #[tokio::test]
    async fn disabled_or_missing_credential_is_not_an_active_caller() {
        let active = ClaimResolver::new(CountingLookup::new(Ok(Some(true))));
        assert!(active.ensure_active(&caller()).await.is_ok());

        let disabled = ClaimResolver::new(CountingLookup::with_session(Ok(Some(true)), Some(true)));
        let err = disabled.ensure_active(&caller().with_admin_claim(true)).await.unwrap_err();
        assert_eq!(err.code(), "unauthenticated");

        let gone = ClaimResolver::new(CountingLookup::with_session(Ok(None), None));
        assert_eq!(gone.ensure_active(&caller()).await.unwrap_err().code(), "unauthenticated");
    }
}
