use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use auth::Authenticator;
use chrono::Utc;
use identity_service::domain::user::models::AccessClaims;
use identity_service::domain::user::models::EmailAddress;
use identity_service::domain::user::models::Role;
use identity_service::domain::user::models::User;
use identity_service::domain::user::models::UserId;
use identity_service::domain::user::models::UserPage;
use identity_service::domain::user::ports::UserRepository;
use identity_service::domain::user::service::UserService;
use identity_service::inbound::http::router::create_router;
use identity_service::user::errors::UserError;
use uuid::Uuid;

pub const TEST_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const TOKEN_TTL_MINUTES: i64 = 60;

/// In-memory repository backing the HTTP tests.
///
/// Mirrors the Postgres adapter's semantics: email uniqueness among
/// non-deleted rows, soft delete, and deleted rows excluded from every
/// lookup.
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap();
        let duplicate = users
            .values()
            .any(|u| !u.is_deleted && u.email.as_str() == user.email.as_str());
        if duplicate {
            return Err(UserError::EmailAlreadyExists(
                user.email.as_str().to_string(),
            ));
        }
        users.insert(user.id.0, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserError> {
        let users = self.users.lock().unwrap();
        Ok(users.get(&id.0).filter(|u| !u.is_deleted).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| !u.is_deleted && u.email.as_str() == email)
            .cloned())
    }

    async fn list(&self, offset: i64, limit: i64) -> Result<UserPage, UserError> {
        let users = self.users.lock().unwrap();
        let mut live: Vec<User> = users.values().filter(|u| !u.is_deleted).cloned().collect();
        live.sort_by_key(|u| u.created_at);

        let total = live.len() as i64;
        let page = live
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        Ok(UserPage { users: page, total })
    }

    async fn update(&self, user: User) -> Result<User, UserError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&user.id.0) {
            Some(existing) if !existing.is_deleted => {
                *existing = user.clone();
                Ok(user)
            }
            _ => Err(UserError::NotFound(user.id.to_string())),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<(), UserError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id.0) {
            Some(existing) if !existing.is_deleted => {
                existing.is_deleted = true;
                Ok(())
            }
            _ => Err(UserError::NotFound(id.to_string())),
        }
    }
}

/// Test application that spawns a real server on a random port.
pub struct TestApp {
    pub address: String,
    pub repository: Arc<InMemoryUserRepository>,
    pub authenticator: Arc<Authenticator>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryUserRepository::new());
        let authenticator = Arc::new(Authenticator::new(TEST_SECRET));
        let user_service = Arc::new(UserService::new(
            Arc::clone(&repository),
            Arc::clone(&authenticator),
            TOKEN_TTL_MINUTES,
        ));

        let router = create_router(user_service, Arc::clone(&authenticator));

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            repository,
            authenticator,
            api_client: reqwest::Client::new(),
        }
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(format!("{}{}", self.address, path))
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.delete(format!("{}{}", self.address, path))
    }

    /// Insert a user directly into the store, bypassing the HTTP surface.
    pub async fn insert_user(&self, email: &str, password: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: EmailAddress::new(email.to_string()).expect("invalid test email"),
            password_hash: self
                .authenticator
                .hash_password(password)
                .expect("hashing failed"),
            full_name: None,
            role,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        };
        self.repository
            .create(user)
            .await
            .expect("failed to insert test user")
    }

    /// Log in over HTTP and return the bearer token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/api/v1/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute login request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["data"]["token"]
            .as_str()
            .expect("token missing from login response")
            .to_string()
    }

    /// Forge a token for a user without going through login.
    ///
    /// A negative `ttl_minutes` yields an already-expired token.
    pub fn token_for(&self, user: &User, ttl_minutes: i64) -> String {
        let claims = AccessClaims::for_user(user, ttl_minutes);
        self.authenticator
            .generate_token(&claims)
            .expect("failed to sign test token")
    }
}
