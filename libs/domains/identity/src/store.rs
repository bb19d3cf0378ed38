use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::error::{IdentityError, IdentityResult};
use crate::models::{NewUser, UserPatch, UserRecord, default_email};

/// Directory of user records.
///
/// Usernames are unique without regard to case. Callers always receive
/// clones; the store owns the records.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Find a user by its store-assigned id
    async fn find_by_id(&self, id: u64) -> Option<UserRecord>;

    /// Find a user by username (case-insensitive)
    async fn find_by_username(&self, username: &str) -> Option<UserRecord>;

    /// Point-in-time existence check
    async fn exists(&self, username: &str) -> bool;

    /// Insert a new user. Fails with `AlreadyExists` when the username is taken.
    async fn save(&self, input: NewUser) -> IdentityResult<UserRecord>;

    /// Replace the stored record with the same username.
    ///
    /// `id` and `create_date` are kept from the stored entry and
    /// `update_date` is refreshed.
    async fn update(&self, record: UserRecord) -> IdentityResult<UserRecord>;

    /// Apply `patch` to the stored record in one step, so concurrent patches
    /// touching different fields both land.
    async fn patch(&self, username: &str, patch: UserPatch) -> IdentityResult<UserRecord>;

    /// Remove a user by id
    async fn delete_by_id(&self, id: u64) -> IdentityResult<()>;

    /// Remove every user, returning what was removed
    async fn delete_all(&self) -> Vec<UserRecord>;

    /// All users in ascending id order
    async fn list_all(&self) -> Vec<UserRecord>;

    /// Number of users currently stored
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn key(username: &str) -> String {
    username.to_lowercase()
}

/// In-memory implementation of IdentityRepository.
///
/// One reader-writer lock guards the whole directory. Reads run concurrently,
/// a write excludes everything else.
#[derive(Debug, Clone)]
pub struct InMemoryIdentityStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Store pre-populated with the demo users `admin` and `guest`.
    pub fn with_demo_records() -> Self {
        let store = Self::new();
        let now = Utc::now();

        let seeded: HashMap<String, UserRecord> = ["admin", "guest"]
            .into_iter()
            .map(|name| {
                let record = UserRecord {
                    id: store.next_id.fetch_add(1, Ordering::Relaxed),
                    username: name.to_string(),
                    first_name: name.to_string(),
                    last_name: name.to_string(),
                    email: default_email(name),
                    password: name.to_string(),
                    status: Default::default(),
                    create_date: now,
                    update_date: now,
                };
                (key(name), record)
            })
            .collect();

        Self {
            users: Arc::new(RwLock::new(seeded)),
            next_id: store.next_id,
        }
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityStore {
    async fn find_by_id(&self, id: u64) -> Option<UserRecord> {
        let users = self.users.read().await;
        users.values().find(|u| u.id == id).cloned()
    }

    async fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        let users = self.users.read().await;
        users.get(&key(username)).cloned()
    }

    async fn exists(&self, username: &str) -> bool {
        let users = self.users.read().await;
        users.contains_key(&key(username))
    }

    async fn save(&self, input: NewUser) -> IdentityResult<UserRecord> {
        let mut users = self.users.write().await;

        // Duplicate check and insert share the write guard
        let k = key(&input.username);
        if users.contains_key(&k) {
            return Err(IdentityError::AlreadyExists(input.username));
        }

        let now = Utc::now();
        let email = input
            .email
            .unwrap_or_else(|| default_email(&input.username));
        let record = UserRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            username: input.username,
            first_name: input.first_name,
            last_name: input.last_name,
            email,
            password: input.password,
            status: input.status.unwrap_or_default(),
            create_date: now,
            update_date: now,
        };

        users.insert(k, record.clone());

        tracing::info!(user_id = record.id, username = %record.username, "Created user");
        Ok(record)
    }

    async fn update(&self, mut record: UserRecord) -> IdentityResult<UserRecord> {
        let mut users = self.users.write().await;

        let k = key(&record.username);
        let Some(stored) = users.get(&k) else {
            return Err(IdentityError::NotFound(record.username));
        };

        record.id = stored.id;
        record.username = stored.username.clone();
        record.create_date = stored.create_date;
        record.update_date = Utc::now().max(stored.update_date);

        users.insert(k, record.clone());

        tracing::info!(user_id = record.id, username = %record.username, "Updated user");
        Ok(record)
    }

    async fn patch(&self, username: &str, patch: UserPatch) -> IdentityResult<UserRecord> {
        let mut users = self.users.write().await;

        let Some(stored) = users.get_mut(&key(username)) else {
            return Err(IdentityError::NotFound(username.to_string()));
        };

        let prior = stored.update_date;
        stored.apply_patch(patch);
        stored.update_date = Utc::now().max(prior);

        tracing::info!(user_id = stored.id, username = %stored.username, "Patched user");
        Ok(stored.clone())
    }

    async fn delete_by_id(&self, id: u64) -> IdentityResult<()> {
        let mut users = self.users.write().await;

        let k = users
            .iter()
            .find(|(_, u)| u.id == id)
            .map(|(k, _)| k.clone())
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
        users.remove(&k);

        tracing::info!(user_id = id, "Deleted user");
        Ok(())
    }

    async fn delete_all(&self) -> Vec<UserRecord> {
        let mut users = self.users.write().await;

        let mut removed: Vec<UserRecord> = users.drain().map(|(_, u)| u).collect();
        removed.sort_by_key(|u| u.id);

        tracing::info!(count = removed.len(), "Deleted all users");
        removed
    }

    async fn list_all(&self) -> Vec<UserRecord> {
        let users = self.users.read().await;

        let mut result: Vec<UserRecord> = users.values().cloned().collect();
        result.sort_by_key(|u| u.id);
        result
    }

    async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn new_user(name: &str) -> NewUser {
        NewUser::new(name, "first", "last", "secret")
    }

    #[tokio::test]
    async fn test_save_assigns_defaults() {
        let store = InMemoryIdentityStore::new();

        let saved = store.save(new_user("alice")).await.unwrap();

        assert_eq!(saved.email, "alice@identityservice.com");
        assert_eq!(saved.status, Status::Active);
        assert_eq!(saved.create_date, saved.update_date);
        assert_eq!(store.find_by_username("alice").await, Some(saved));
    }

    #[tokio::test]
    async fn test_save_keeps_supplied_email_and_status() {
        let store = InMemoryIdentityStore::new();

        let saved = store
            .save(
                new_user("bob")
                    .with_email("bob@example.com")
                    .with_status(Status::Inactive),
            )
            .await
            .unwrap();

        assert_eq!(saved.email, "bob@example.com");
        assert_eq!(saved.status, Status::Inactive);
    }

    #[tokio::test]
    async fn test_save_rejects_duplicate_ignoring_case() {
        let store = InMemoryIdentityStore::new();
        let first = store.save(new_user("alice")).await.unwrap();

        let result = store.save(new_user("ALICE")).await;

        assert!(matches!(result, Err(IdentityError::AlreadyExists(name)) if name == "ALICE"));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.find_by_username("alice").await, Some(first));
    }

    #[tokio::test]
    async fn test_ids_are_unique_and_never_reused() {
        let store = InMemoryIdentityStore::new();
        let a = store.save(new_user("a")).await.unwrap();
        store.delete_by_id(a.id).await.unwrap();

        let b = store.save(new_user("a")).await.unwrap();

        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_lookups_are_case_insensitive() {
        let store = InMemoryIdentityStore::new();
        store.save(new_user("Carol")).await.unwrap();

        assert!(store.exists("carol").await);
        assert!(store.exists("CAROL").await);
        assert_eq!(
            store.find_by_username("cArOl").await.map(|u| u.username),
            Some("Carol".to_string())
        );
    }

    #[tokio::test]
    async fn test_reads_do_not_create_records() {
        let store = InMemoryIdentityStore::new();

        assert_eq!(store.find_by_username("ghost").await, None);
        assert_eq!(store.find_by_id(42).await, None);
        assert!(!store.exists("ghost").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_preserves_identity_fields() {
        let store = InMemoryIdentityStore::new();
        let saved = store.save(new_user("dave")).await.unwrap();

        let mut changed = saved.clone();
        changed.id = 999;
        changed.create_date = saved.create_date - chrono::Duration::days(30);
        changed.first_name = "David".to_string();

        let updated = store.update(changed).await.unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.create_date, saved.create_date);
        assert_eq!(updated.first_name, "David");
        assert!(updated.update_date >= saved.update_date);
        assert_eq!(store.find_by_id(saved.id).await, Some(updated));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_found() {
        let store = InMemoryIdentityStore::new();
        let saved = store.save(new_user("erin")).await.unwrap();
        store.delete_by_id(saved.id).await.unwrap();

        let result = store.update(saved).await;

        assert!(matches!(result, Err(IdentityError::NotFound(name)) if name == "erin"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_not_found() {
        let store = InMemoryIdentityStore::new();
        assert!(matches!(
            store.delete_by_id(7).await,
            Err(IdentityError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_all_returns_removed() {
        let store = InMemoryIdentityStore::with_demo_records();

        let removed = store.delete_all().await;

        let names: Vec<_> = removed.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["admin", "guest"]);
        assert!(store.is_empty().await);
        assert!(store.delete_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_all_in_insertion_order() {
        let store = InMemoryIdentityStore::new();
        for name in ["b", "a", "c"] {
            store.save(new_user(name)).await.unwrap();
        }

        let names: Vec<String> = store
            .list_all()
            .await
            .into_iter()
            .map(|u| u.username)
            .collect();

        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_alice_lifecycle() {
        let store = InMemoryIdentityStore::new();
        let alice = store
            .save(NewUser::new("alice", "A", "A", "pw"))
            .await
            .unwrap();

        let found = store.find_by_username("alice").await.unwrap();
        assert_eq!(found.status, Status::Active);
        assert_eq!(found.email, "alice@identityservice.com");

        let again = store.save(NewUser::new("alice", "A2", "A2", "pw2")).await;
        assert!(matches!(again, Err(IdentityError::AlreadyExists(_))));
        assert_eq!(store.find_by_username("alice").await, Some(found));

        store.delete_by_id(alice.id).await.unwrap();
        assert_eq!(store.find_by_username("alice").await, None);
        assert_eq!(store.find_by_id(alice.id).await, None);
    }

    #[tokio::test]
    async fn test_patch_updates_in_place() {
        let store = InMemoryIdentityStore::new();
        let saved = store.save(new_user("fay")).await.unwrap();

        let patched = store
            .patch(
                "FAY",
                UserPatch {
                    last_name: Some("Jones".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(patched.id, saved.id);
        assert_eq!(patched.first_name, "first");
        assert_eq!(patched.last_name, "Jones");
        assert!(patched.update_date >= saved.update_date);
        assert!(matches!(
            store.patch("ghost", UserPatch::default()).await,
            Err(IdentityError::NotFound(name)) if name == "ghost"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_patches_of_different_fields_both_land() {
        let store = InMemoryIdentityStore::new();
        store.save(new_user("gus")).await.unwrap();

        let first = {
            let store = store.clone();
            tokio::spawn(async move {
                let patch = UserPatch {
                    first_name: Some("Gustav".to_string()),
                    ..Default::default()
                };
                store.patch("gus", patch).await
            })
        };
        let last = {
            let store = store.clone();
            tokio::spawn(async move {
                let patch = UserPatch {
                    last_name: Some("Mahler".to_string()),
                    ..Default::default()
                };
                store.patch("gus", patch).await
            })
        };
        first.await.unwrap().unwrap();
        last.await.unwrap().unwrap();

        let stored = store.find_by_username("gus").await.unwrap();
        assert_eq!(stored.first_name, "Gustav");
        assert_eq!(stored.last_name, "Mahler");
    }

    #[tokio::test]
    async fn test_demo_records() {
        let store = InMemoryIdentityStore::with_demo_records();

        let admin = store.find_by_username("admin").await.unwrap();
        assert_eq!(admin.first_name, "admin");
        assert_eq!(admin.password, "admin");
        assert!(store.exists("guest").await);

        // ids continue after the seeded ones
        let next = store.save(new_user("new")).await.unwrap();
        assert!(next.id > admin.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_see_same_record() {
        let store = InMemoryIdentityStore::new();
        let saved = store.save(new_user("shared")).await.unwrap();

        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.find_by_username("shared").await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), Some(saved.clone()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_saves_all_land() {
        let store = InMemoryIdentityStore::new();

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.save(new_user(&format!("user{i}"))).await })
            })
            .collect();

        let mut ids = std::collections::HashSet::new();
        for task in tasks {
            let saved = task.await.unwrap().unwrap();
            assert!(ids.insert(saved.id));
        }

        assert_eq!(store.len().await, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_duplicate_save_has_one_winner() {
        let store = InMemoryIdentityStore::new();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.save(new_user("race")).await })
            })
            .collect();

        let mut ok = 0;
        let mut conflicts = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(IdentityError::AlreadyExists(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(store.len().await, 1);
    }
}
