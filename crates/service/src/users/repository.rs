use async_trait::async_trait;

use super::domain::{NewUser, UserPatch, UserRecord};
use crate::errors::StoreError;

/// Record store abstraction for user persistence, keyed by username.
///
/// The store does not enforce username uniqueness; callers check first.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError>;
    /// Shallow-merge `fields` into the matching record; returns 0 or 1.
    async fn update_by_username(&self, username: &str, fields: UserPatch) -> Result<u64, StoreError>;
    /// Returns 0 or 1.
    async fn delete_by_username(&self, username: &str) -> Result<u64, StoreError>;
}

/// Simple in-memory mock repository for tests and doc examples
pub mod mock {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use serde_json::Value;
    use uuid::Uuid;

    #[derive(Default)]
    pub struct MockUserRepository {
        users: Mutex<Vec<UserRecord>>,
        failing: bool,
    }

    impl MockUserRepository {
        /// A repository whose every call fails with an IO error.
        pub fn failing() -> Self {
            Self { users: Mutex::default(), failing: true }
        }

        fn users(&self) -> Result<MutexGuard<'_, Vec<UserRecord>>, StoreError> {
            if self.failing {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "mock storage failure").into());
            }
            Ok(self.users.lock().unwrap_or_else(PoisonError::into_inner))
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
            Ok(self.users()?.clone())
        }

        async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
            Ok(self.users()?.iter().find(|u| u.username == username).cloned())
        }

        async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
            let rec = UserRecord {
                id: Uuid::new_v4().simple().to_string(),
                username: Value::String(user.username),
                password: Value::String(user.password),
                email: Value::String(user.email),
                name: Value::String(user.name),
                extra: Default::default(),
            };
            self.users()?.push(rec.clone());
            Ok(rec)
        }

        async fn update_by_username(&self, username: &str, fields: UserPatch) -> Result<u64, StoreError> {
            let mut users = self.users()?;
            let Some(rec) = users.iter_mut().find(|u| u.username == username) else {
                return Ok(0);
            };
            let mut doc = rec.clone().into_document();
            doc.extend(fields);
            *rec = UserRecord::from_document(doc)?;
            Ok(1)
        }

        async fn delete_by_username(&self, username: &str) -> Result<u64, StoreError> {
            let mut users = self.users()?;
            match users.iter().position(|u| u.username == username) {
                Some(i) => {
                    users.remove(i);
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }
}
