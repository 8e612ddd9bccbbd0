use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::domain::{CreateUserInput, UserPatch, UserRecord};
use super::errors::UserError;
use super::repository::UserRepository;

/// User record business service independent of web framework
///
/// Create is a check-then-insert without a lock spanning both steps: two
/// concurrent creates for the same username can both pass the check and both
/// insert.
pub struct UserService<R: UserRepository> {
    repo: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: Arc<R>) -> Self { Self { repo } }

    /// Every stored user, in no particular order.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserRecord>, UserError> {
        let users = self.repo.list_all().await?;
        debug!(count = users.len(), "users listed");
        Ok(users)
    }

    /// Fetch one user; a missing username is `NotFound`.
    #[instrument(skip(self))]
    pub async fn get_user(&self, username: &str) -> Result<UserRecord, UserError> {
        self.repo.find_by_username(username).await?.ok_or(UserError::NotFound)
    }

    /// Validate and insert a new user.
    ///
    /// # Examples
    /// ```
    /// use service::users::{UserService, domain::CreateUserInput, repository::mock::MockUserRepository};
    /// use std::sync::Arc;
    /// let svc = UserService::new(Arc::new(MockUserRepository::default()));
    /// let user = tokio_test::block_on(svc.create_user(CreateUserInput::new("alice", "pw1", "a@x.com", "Alice"))).unwrap();
    /// assert_eq!(user.username, "alice");
    /// let again = tokio_test::block_on(svc.create_user(CreateUserInput::new("alice", "pw2", "b@x.com", "Al")));
    /// assert!(again.is_err());
    /// ```
    #[instrument(skip(self, input), fields(username = ?input.username))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<UserRecord, UserError> {
        let new_user = input.validate()?;
        if self.repo.find_by_username(&new_user.username).await?.is_some() {
            debug!("username taken");
            return Err(UserError::Conflict);
        }
        let user = self.repo.insert(new_user).await?;
        info!(id = %user.id, username = %user.username, "user_created");
        Ok(user)
    }

    /// Shallow-merge `fields` into the user's record.
    ///
    /// `username` may be among the fields; uniqueness is not re-checked.
    #[instrument(skip(self, fields), fields(field_count = fields.len()))]
    pub async fn update_user(&self, username: &str, fields: UserPatch) -> Result<(), UserError> {
        if fields.contains_key("username") {
            warn!("update rewrites the username key without a uniqueness check");
        }
        match self.repo.update_by_username(username, fields).await? {
            0 => Err(UserError::OperationFailed),
            _ => {
                info!("user_updated");
                Ok(())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, username: &str) -> Result<(), UserError> {
        match self.repo.delete_by_username(username).await? {
            0 => Err(UserError::OperationFailed),
            _ => {
                info!("user_deleted");
                Ok(())
            }
        }
    }
}
