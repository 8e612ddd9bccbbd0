use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use super::domain::{NewUser, UserPatch, UserRecord, USERNAME_FIELD};
use super::repository::UserRepository;
use crate::errors::StoreError;
use crate::storage::document_store::{DocumentStore, StoreOptions};

/// File-backed user collection.
/// Keeps user documents in a JSON lines file keyed by `username`.
#[derive(Clone)]
pub struct UserStore {
    store: Arc<DocumentStore>,
}

impl UserStore {
    /// Open the collection at the given file path. Creates the file if missing.
    pub async fn new<P: Into<PathBuf>>(path: P, options: StoreOptions) -> Result<Arc<Self>, StoreError> {
        let store = DocumentStore::open(path, options).await?;
        Ok(Arc::new(Self { store }))
    }

    /// Underlying document collection (compaction, raw access).
    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.store
    }
}

fn key(username: &str) -> Value {
    Value::String(username.to_string())
}

#[async_trait]
impl UserRepository for UserStore {
    async fn list_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        self.store.all().await.into_iter().map(UserRecord::from_document).collect()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.store
            .find_one(USERNAME_FIELD, &key(username))
            .await
            .map(UserRecord::from_document)
            .transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let doc = self.store.insert(user.into_document()).await?;
        UserRecord::from_document(doc)
    }

    async fn update_by_username(&self, username: &str, fields: UserPatch) -> Result<u64, StoreError> {
        self.store.update_one(USERNAME_FIELD, &key(username), &fields).await
    }

    async fn delete_by_username(&self, username: &str) -> Result<u64, StoreError> {
        self.store.remove_one(USERNAME_FIELD, &key(username)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn patch(value: Value) -> UserPatch {
        match value {
            Value::Object(m) => m,
            _ => UserPatch::new(),
        }
    }

    fn alice() -> NewUser {
        NewUser { username: "alice".into(), password: "pw1".into(), email: "a@x.com".into(), name: "Alice".into() }
    }

    #[tokio::test]
    async fn user_store_basic_crud() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("svc_users_{}.jsonl", Uuid::new_v4()));
        let store = UserStore::new(&tmp, StoreOptions::default()).await?;

        // initially empty
        assert!(store.list_all().await?.is_empty());
        assert!(store.find_by_username("alice").await?.is_none());

        // insert assigns an id
        let created = store.insert(alice()).await?;
        assert!(!created.id.is_empty());
        assert_eq!(created.username, "alice");

        // partial update
        let n = store.update_by_username("alice", patch(json!({"email": "new@x.com", "age": 30}))).await?;
        assert_eq!(n, 1);
        let found = store.find_by_username("alice").await?.expect("alice");
        assert_eq!(found.email, "new@x.com");
        assert_eq!(found.password, "pw1");
        assert_eq!(found.id, created.id);
        assert_eq!(found.extra.get("age"), Some(&json!(30)));
        assert_eq!(store.update_by_username("bob", patch(json!({"email": "b"}))).await?, 0);

        // reload store from disk to ensure persistence
        let reopened = UserStore::new(&tmp, StoreOptions::default()).await?;
        assert_eq!(reopened.list_all().await?, vec![found]);

        // delete
        assert_eq!(reopened.delete_by_username("alice").await?, 1);
        assert_eq!(reopened.delete_by_username("alice").await?, 0);
        assert!(reopened.list_all().await?.is_empty());

        // cleanup
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn renaming_username_moves_the_key() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("svc_users_{}.jsonl", Uuid::new_v4()));
        let store = UserStore::new(&tmp, StoreOptions::default()).await?;
        store.insert(alice()).await?;

        assert_eq!(store.update_by_username("alice", patch(json!({"username": "alicia"}))).await?, 1);
        assert!(store.find_by_username("alice").await?.is_none());
        assert_eq!(store.find_by_username("alicia").await?.map(|u| u.name), Some(json!("Alice")));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn patched_null_or_number_reads_back_for_everyone() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("svc_users_{}.jsonl", Uuid::new_v4()));
        let store = UserStore::new(&tmp, StoreOptions::default()).await?;
        store.insert(alice()).await?;
        store
            .insert(NewUser { username: "bob".into(), password: "pw2".into(), email: "b@x.com".into(), name: "Bob".into() })
            .await?;

        assert_eq!(store.update_by_username("alice", patch(json!({"email": null, "password": 42}))).await?, 1);
        assert_eq!(store.list_all().await?.len(), 2);
        let found = store.find_by_username("alice").await?.expect("alice");
        assert_eq!(found.email, Value::Null);
        assert_eq!(found.password, json!(42));
        assert_eq!(found.name, "Alice");

        // the stored values survive a reload
        let reopened = UserStore::new(&tmp, StoreOptions::default()).await?;
        assert_eq!(reopened.find_by_username("alice").await?, Some(found));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
