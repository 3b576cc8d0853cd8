use async_trait::async_trait;

use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserPage;
use crate::user::errors::UserError;

/// Persistence operations for the user aggregate.
///
/// Every lookup excludes soft-deleted records. Email uniqueness among
/// non-deleted records is enforced by the store itself; callers may pre-check
/// but must treat the store as the authoritative guard.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, UserError>;

    /// Retrieve a user by identifier.
    ///
    /// # Returns
    /// Optional user entity (None if not found or deleted)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError>;

    /// Retrieve a user by email address.
    ///
    /// # Returns
    /// Optional user entity (None if not found or deleted)
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;

    /// Retrieve one page of users together with the total count.
    ///
    /// # Arguments
    /// * `offset` - Number of records to skip
    /// * `limit` - Maximum number of records to return
    ///
    /// # Errors
    /// * `DatabaseError` - Database operation failed
    async fn list(&self, offset: i64, limit: i64) -> Result<UserPage, UserError>;

    /// Update an existing user.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist or is deleted
    /// * `DatabaseError` - Database operation failed
    async fn update(&self, user: User) -> Result<User, UserError>;

    /// Soft-delete a user. The record stays in storage but disappears from
    /// every lookup.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist or is already deleted
    /// * `DatabaseError` - Database operation failed
    async fn delete(&self, id: &UserId) -> Result<(), UserError>;
}
