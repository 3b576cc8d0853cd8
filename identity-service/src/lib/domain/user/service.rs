use std::sync::Arc;

use auth::AuthenticationError;
use auth::Authenticator;
use chrono::Utc;

use crate::domain::user::models::AccessClaims;
use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::Identity;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::Role;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserPage;
use crate::domain::user::policy;
use crate::user::errors::UserError;
use crate::user::ports::UserRepository;

/// Domain service for account and authentication operations.
///
/// Composes the repository, password hashing, and token issuance. Every
/// operation that acts on behalf of a caller takes the caller's [`Identity`]
/// explicitly and consults the access policy before touching storage.
pub struct UserService<UR>
where
    UR: UserRepository,
{
    repository: Arc<UR>,
    authenticator: Arc<Authenticator>,
    token_ttl_minutes: i64,
}

impl<UR> UserService<UR>
where
    UR: UserRepository,
{
    /// Create a new user service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `authenticator` - Password hashing and token issuance
    /// * `token_ttl_minutes` - Lifetime of issued access tokens
    pub fn new(repository: Arc<UR>, authenticator: Arc<Authenticator>, token_ttl_minutes: i64) -> Self {
        Self {
            repository,
            authenticator,
            token_ttl_minutes,
        }
    }

    /// Register a self-service account with role `user`.
    ///
    /// The email lookup is a fast-path check; the store's unique constraint
    /// on non-deleted emails remains the authoritative guard against a
    /// concurrent registration of the same address.
    ///
    /// # Errors
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Password` - Hashing failed
    /// * `DatabaseError` - Database operation failed
    pub async fn register(&self, command: RegisterUserCommand) -> Result<User, UserError> {
        if self
            .repository
            .find_by_email(command.email.as_str())
            .await?
            .is_some()
        {
            return Err(UserError::EmailAlreadyExists(
                command.email.as_str().to_string(),
            ));
        }

        let password_hash = self.authenticator.hash_password(&command.password)?;

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: command.email,
            password_hash,
            full_name: command.full_name,
            role: Role::User,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };

        self.repository.create(user).await
    }

    /// Verify credentials and issue an access token.
    ///
    /// An unknown email and a wrong password produce the identical error, so
    /// a caller cannot probe which addresses are registered.
    ///
    /// # Errors
    /// * `InvalidCredentials` - No such account or password mismatch
    /// * `Password` / `Token` - Internal hashing or signing failure
    pub async fn login(&self, email: &str, password: &str) -> Result<String, UserError> {
        let user = self
            .repository
            .find_by_email(email)
            .await?
            .ok_or(UserError::InvalidCredentials)?;

        let claims = AccessClaims::for_user(&user, self.token_ttl_minutes);

        self.authenticator
            .authenticate(password, &user.password_hash, &claims)
            .map_err(|e| match e {
                AuthenticationError::InvalidCredentials => UserError::InvalidCredentials,
                AuthenticationError::PasswordError(err) => UserError::Password(err),
                AuthenticationError::JwtError(err) => UserError::Token(err),
            })
    }

    /// Fetch one user record on behalf of `caller`.
    ///
    /// The owner-or-admin gate runs against the claimed id before the
    /// lookup, so an unauthorized caller gets `Forbidden` whether or not the
    /// target exists.
    ///
    /// # Errors
    /// * `Forbidden` - Caller is neither admin nor owner
    /// * `NotFound` - No such user
    /// * `DatabaseError` - Database operation failed
    pub async fn get_user(&self, caller: &Identity, id: &UserId) -> Result<User, UserError> {
        if !policy::can_access_user(caller, id) {
            return Err(UserError::Forbidden);
        }

        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))
    }

    /// List one page of users. Admin only.
    ///
    /// # Errors
    /// * `Forbidden` - Caller is not an admin
    /// * `DatabaseError` - Database operation failed
    pub async fn list_users(
        &self,
        caller: &Identity,
        page: i64,
        size: i64,
    ) -> Result<UserPage, UserError> {
        if !policy::can_list_users(caller) {
            return Err(UserError::Forbidden);
        }

        let offset = (page - 1) * size;
        self.repository.list(offset, size).await
    }

    /// Create an account with an explicit role. Admin only.
    ///
    /// # Errors
    /// * `Forbidden` - Caller is not an admin
    /// * `EmailAlreadyExists` - Email is already registered
    /// * `Password` - Hashing failed
    /// * `DatabaseError` - Database operation failed
    pub async fn create_user(
        &self,
        caller: &Identity,
        command: CreateUserCommand,
    ) -> Result<User, UserError> {
        if !policy::can_create_users(caller) {
            return Err(UserError::Forbidden);
        }

        if self
            .repository
            .find_by_email(command.email.as_str())
            .await?
            .is_some()
        {
            return Err(UserError::EmailAlreadyExists(
                command.email.as_str().to_string(),
            ));
        }

        let password_hash = self.authenticator.hash_password(&command.password)?;

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: command.email,
            password_hash,
            full_name: command.full_name,
            role: command.role,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };

        self.repository.create(user).await
    }

    /// Apply a partial update on behalf of `caller`.
    ///
    /// A role change is gated independently: a non-admin sending any role
    /// value is rejected before the record is fetched or any field applied,
    /// including on their own record.
    ///
    /// # Errors
    /// * `Forbidden` - Caller is neither admin nor owner, or a non-admin
    ///   attempted a role change
    /// * `NotFound` - No such user
    /// * `Password` - Hashing failed
    /// * `DatabaseError` - Database operation failed
    pub async fn update_user(
        &self,
        caller: &Identity,
        id: &UserId,
        command: UpdateUserCommand,
    ) -> Result<User, UserError> {
        if !policy::can_access_user(caller, id) {
            return Err(UserError::Forbidden);
        }

        if command.role.is_some() && !policy::can_change_role(caller) {
            return Err(UserError::Forbidden);
        }

        let mut user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))?;

        if let Some(full_name) = command.full_name {
            user.full_name = Some(full_name);
        }

        if let Some(password) = command.password {
            user.password_hash = self.authenticator.hash_password(&password)?;
        }

        if let Some(role) = command.role {
            user.role = role;
        }

        user.updated_at = Utc::now();

        self.repository.update(user).await
    }

    /// Soft-delete a user record on behalf of `caller`.
    ///
    /// # Errors
    /// * `Forbidden` - Caller is neither admin nor owner
    /// * `NotFound` - No such user
    /// * `DatabaseError` - Database operation failed
    pub async fn delete_user(&self, caller: &Identity, id: &UserId) -> Result<(), UserError> {
        if !policy::can_access_user(caller, id) {
            return Err(UserError::Forbidden);
        }

        self.repository.delete(id).await
    }
}
