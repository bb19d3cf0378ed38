use axum_helpers::{Caller, CredentialRealm, Role};
use observability::IdentityMetrics;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::config::LookupConfig;
use crate::error::{IdentityError, IdentityResult};
use crate::lookup::AsyncLookupScheduler;
use crate::models::{NewUser, Status, UserPatch, UserRecord};
use crate::store::IdentityRepository;
use crate::wait::BoundedWait;

/// Service layer for directory operations.
///
/// Checks the caller's role once per operation, then calls the store or the
/// async lookup path. Credential side effects (grant on create, revoke on
/// delete or deactivation) are applied to the realm here and only ever touch
/// credentials the directory granted; operator accounts are off limits.
pub struct IdentityService<R: IdentityRepository> {
    store: Arc<R>,
    scheduler: AsyncLookupScheduler<R>,
    wait: BoundedWait,
    realm: CredentialRealm,
}

impl<R: IdentityRepository + 'static> IdentityService<R> {
    /// Must be called from within a Tokio runtime; lookups are dispatched onto it.
    pub fn new(store: R, realm: CredentialRealm, config: &LookupConfig) -> IdentityResult<Self> {
        let store = Arc::new(store);
        let scheduler = AsyncLookupScheduler::new(Arc::clone(&store), config.max_in_flight)?;

        Ok(Self {
            store,
            scheduler,
            wait: BoundedWait::new(config.timeout),
            realm,
        })
    }

    pub fn realm(&self) -> &CredentialRealm {
        &self.realm
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    pub fn scheduler(&self) -> &AsyncLookupScheduler<R> {
        &self.scheduler
    }

    /// Create a user and grant it USER credentials.
    ///
    /// Names held by operator accounts are rejected as taken.
    pub async fn create_user(&self, caller: &Caller, input: NewUser) -> IdentityResult<UserRecord> {
        require(caller, Role::Admin)?;
        input
            .validate()
            .map_err(|e| IdentityError::Validation(e.to_string()))?;

        if self.realm.is_operator(&input.username) || self.store.exists(&input.username).await {
            IdentityMetrics::record_save_conflict();
            return Err(IdentityError::AlreadyExists(input.username));
        }

        let created = self.store.save(input).await.inspect_err(|e| {
            if matches!(e, IdentityError::AlreadyExists(_)) {
                IdentityMetrics::record_save_conflict();
            }
        })?;

        if created.is_active()
            && !self
                .realm
                .grant_managed(&created.username, &created.password, vec![Role::User])
        {
            tracing::warn!(username = %created.username, "Credential already present, left unchanged");
        }

        IdentityMetrics::record_user_created();
        self.refresh_size().await;
        tracing::info!(
            requested_by = caller.username(),
            username = %created.username,
            "User created"
        );
        Ok(created)
    }

    /// All users in id order
    pub async fn list_users(&self, caller: &Caller) -> IdentityResult<Vec<UserRecord>> {
        require(caller, Role::User)?;
        Ok(self.store.list_all().await)
    }

    pub async fn get_user(&self, caller: &Caller, username: &str) -> IdentityResult<UserRecord> {
        require(caller, Role::User)?;
        self.store
            .find_by_username(username)
            .await
            .ok_or_else(|| IdentityError::NotFound(username.to_string()))
    }

    /// Apply a partial update and keep the credential in step with it
    pub async fn update_user(
        &self,
        caller: &Caller,
        username: &str,
        patch: UserPatch,
    ) -> IdentityResult<UserRecord> {
        require(caller, Role::Admin)?;
        patch
            .validate()
            .map_err(|e| IdentityError::Validation(e.to_string()))?;

        let status_change = patch.status;
        let password_changed = patch.password.is_some();
        let updated = self.store.patch(username, patch).await?;

        match status_change {
            Some(Status::Inactive) => {
                if self.realm.revoke_managed(&updated.username) {
                    tracing::info!(username = %updated.username, "Credentials revoked on deactivation");
                }
            }
            Some(Status::Active) => {
                if self
                    .realm
                    .grant_managed(&updated.username, &updated.password, vec![Role::User])
                {
                    tracing::info!(username = %updated.username, "Credentials granted on activation");
                }
            }
            None => {}
        }

        if password_changed && updated.is_active() {
            self.realm
                .set_managed_password(&updated.username, &updated.password);
        }

        tracing::info!(
            requested_by = caller.username(),
            username = %updated.username,
            "User updated"
        );
        Ok(updated)
    }

    pub async fn delete_user(&self, caller: &Caller, username: &str) -> IdentityResult<()> {
        require(caller, Role::Admin)?;

        let user = self
            .store
            .find_by_username(username)
            .await
            .ok_or_else(|| IdentityError::NotFound(username.to_string()))?;

        self.store
            .delete_by_id(user.id)
            .await
            .map_err(|_| IdentityError::NotFound(username.to_string()))?;
        self.realm.revoke_managed(&user.username);

        IdentityMetrics::record_users_deleted(1);
        self.refresh_size().await;
        tracing::info!(
            requested_by = caller.username(),
            username = %user.username,
            "User deleted"
        );
        Ok(())
    }

    /// Remove every user and revoke the credentials granted for them.
    /// Returns the count removed.
    pub async fn delete_all_users(&self, caller: &Caller) -> IdentityResult<usize> {
        require(caller, Role::Admin)?;

        let removed = self.store.delete_all().await;
        for user in &removed {
            self.realm.revoke_managed(&user.username);
        }

        IdentityMetrics::record_users_deleted(removed.len());
        self.refresh_size().await;
        tracing::info!(
            requested_by = caller.username(),
            count = removed.len(),
            "All users deleted"
        );
        Ok(removed.len())
    }

    /// Look a user up on the worker runtime and wait for the configured deadline.
    ///
    /// With `delay`, the lookup sleeps that long before reading the store.
    pub async fn get_user_async(
        &self,
        caller: &Caller,
        username: &str,
        delay: Option<Duration>,
    ) -> IdentityResult<UserRecord> {
        require(caller, Role::User)?;

        let handle = match delay {
            Some(delay) => self.scheduler.lookup_delayed(username, delay).await?,
            None => self.scheduler.lookup(username).await?,
        };

        match self.wait.wait(handle).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(IdentityError::NotFound(username.to_string())),
            Err(wait) => {
                tracing::error!(username, error = ?wait, "Async lookup failed");
                Err(IdentityError::Lookup(wait))
            }
        }
    }

    /// Greeting for any authenticated caller
    pub fn info(&self, caller: &Caller) -> String {
        format!(
            "Hello {}! \nI am:\n {{'name': 'Simple User Identity Service', 'version': '1.0'}}\n",
            caller.username()
        )
    }

    async fn refresh_size(&self) {
        IdentityMetrics::set_directory_size(self.store.len().await);
    }
}

fn require(caller: &Caller, role: Role) -> IdentityResult<()> {
    if caller.has_role(role) {
        Ok(())
    } else {
        tracing::debug!(username = caller.username(), required = %role, "Role check failed");
        Err(IdentityError::Forbidden(format!("{role} role required")))
    }
}
