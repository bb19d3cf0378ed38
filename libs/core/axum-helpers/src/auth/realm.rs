use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::caller::{Caller, Role};

/// Realm name advertised in `WWW-Authenticate` challenges.
pub const DEFAULT_REALM: &str = "IDENTITY_DEMO_REALM";

#[derive(Debug, Clone)]
struct Credential {
    username: String,
    password: String,
    roles: Vec<Role>,
    /// Granted on behalf of a directory record rather than configured up front
    managed: bool,
}

/// In-memory credential registry backing HTTP Basic authentication.
///
/// Keys are lower-cased usernames. Passwords are compared as plain text; this
/// mirrors the directory it fronts and is not meant for real secrets.
///
/// Entries come in two kinds. Operator accounts are added with [`grant`] and
/// are never touched by the `*_managed` methods, which only create, update or
/// remove entries granted for directory records.
///
/// [`grant`]: CredentialRealm::grant
///
/// Cloning is cheap: all clones share the same registry.
#[derive(Debug, Clone)]
pub struct CredentialRealm {
    name: Arc<str>,
    entries: Arc<RwLock<HashMap<String, Credential>>>,
}

impl Default for CredentialRealm {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

impl CredentialRealm {
    /// Empty realm.
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Realm seeded with the two operator accounts:
    /// `admin/admin` (USER, ADMIN) and `john/doe` (USER).
    pub fn with_defaults() -> Self {
        let realm = Self::default();
        realm.grant("admin", "admin", vec![Role::User, Role::Admin]);
        realm.grant("john", "doe", vec![Role::User]);
        realm
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace an operator account for `username`.
    pub fn grant(&self, username: &str, password: &str, roles: Vec<Role>) {
        let credential = Credential {
            username: username.to_string(),
            password: password.to_string(),
            roles,
            managed: false,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(username.to_lowercase(), credential);
        tracing::debug!(username, "Granted operator credential");
    }

    /// Insert a directory-managed credential when no entry of either kind
    /// exists. Returns `true` if inserted.
    pub fn grant_managed(&self, username: &str, password: &str, roles: Vec<Role>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let key = username.to_lowercase();
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(
            key,
            Credential {
                username: username.to_string(),
                password: password.to_string(),
                roles,
                managed: true,
            },
        );
        tracing::debug!(username, "Granted credential");
        true
    }

    /// Remove a directory-managed credential. Operator accounts are left alone.
    /// Returns `true` if one was removed.
    pub fn revoke_managed(&self, username: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let key = username.to_lowercase();
        let removed = match entries.get(&key) {
            Some(credential) if credential.managed => entries.remove(&key).is_some(),
            _ => false,
        };
        if removed {
            tracing::debug!(username, "Revoked credential");
        }
        removed
    }

    /// Replace the password of a directory-managed credential.
    /// Returns `false` if absent or an operator account.
    pub fn set_managed_password(&self, username: &str, password: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(&username.to_lowercase()) {
            Some(credential) if credential.managed => {
                credential.password = password.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, username: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&username.to_lowercase())
    }

    /// `true` when `username` names an operator account.
    pub fn is_operator(&self, username: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&username.to_lowercase())
            .is_some_and(|credential| !credential.managed)
    }

    /// Verify a username/password pair and return the authenticated caller.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Caller> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let credential = entries.get(&username.to_lowercase())?;
        if credential.password != password {
            return None;
        }
        Some(Caller::new(
            credential.username.clone(),
            credential.roles.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_authenticate() {
        let realm = CredentialRealm::with_defaults();

        let admin = realm.authenticate("admin", "admin").unwrap();
        assert!(admin.is_admin());

        let john = realm.authenticate("JOHN", "doe").unwrap();
        assert_eq!(john.username(), "john");
        assert!(john.has_role(Role::User));
        assert!(!john.is_admin());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let realm = CredentialRealm::with_defaults();
        assert!(realm.authenticate("admin", "nope").is_none());
        assert!(realm.authenticate("ghost", "admin").is_none());
    }

    #[test]
    fn test_grant_managed_keeps_existing() {
        let realm = CredentialRealm::default();
        assert!(realm.grant_managed("zoe", "first", vec![Role::User]));
        assert!(!realm.grant_managed("Zoe", "second", vec![Role::User]));
        assert!(realm.authenticate("zoe", "first").is_some());
    }

    #[test]
    fn test_revoke_and_set_password() {
        let realm = CredentialRealm::default();
        realm.grant_managed("zoe", "pw", vec![Role::User]);

        assert!(realm.set_managed_password("zoe", "new-pw"));
        assert!(realm.authenticate("zoe", "pw").is_none());
        assert!(realm.authenticate("zoe", "new-pw").is_some());

        assert!(realm.revoke_managed("ZOE"));
        assert!(!realm.contains("zoe"));
        assert!(!realm.revoke_managed("zoe"));
        assert!(!realm.set_managed_password("zoe", "x"));
    }

    #[test]
    fn test_operator_accounts_survive_managed_changes() {
        let realm = CredentialRealm::with_defaults();

        assert!(realm.is_operator("ADMIN"));
        assert!(!realm.grant_managed("john", "hijacked", vec![Role::User]));
        assert!(!realm.set_managed_password("admin", "changed"));
        assert!(!realm.revoke_managed("admin"));

        assert!(realm.authenticate("john", "doe").is_some());
        let admin = realm.authenticate("admin", "admin").unwrap();
        assert!(admin.is_admin());
    }

    #[test]
    fn test_clones_share_entries() {
        let realm = CredentialRealm::default();
        let other = realm.clone();
        realm.grant_managed("zoe", "pw", vec![Role::User]);
        assert!(other.contains("zoe"));
        assert!(!other.is_operator("zoe"));
    }
}
