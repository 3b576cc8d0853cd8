use std::sync::Arc;

use auth::Authenticator;
use chrono::Utc;
use identity_service::config::Config;
use identity_service::domain::user::models::EmailAddress;
use identity_service::domain::user::models::Role;
use identity_service::domain::user::models::User;
use identity_service::domain::user::models::UserId;
use identity_service::domain::user::ports::UserRepository;
use identity_service::domain::user::service::UserService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::repositories::PostgresUserRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const SEED_ADMIN_EMAIL: &str = "admin@example.com";
const SEED_ADMIN_PASSWORD: &str = "admin123";

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        token_ttl_minutes = config.jwt.ttl_minutes,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let authenticator = Arc::new(Authenticator::new(config.jwt.secret.as_bytes()));
    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool));

    seed_admin(user_repository.as_ref(), &authenticator).await?;

    let user_service = Arc::new(UserService::new(
        Arc::clone(&user_repository),
        Arc::clone(&authenticator),
        config.jwt.ttl_minutes,
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let application = create_router(user_service, authenticator);
    axum::serve(http_listener, application).await?;

    Ok(())
}

/// Ensure a bootstrap admin account exists so a fresh deployment is usable.
async fn seed_admin<UR: UserRepository>(
    repository: &UR,
    authenticator: &Authenticator,
) -> Result<(), anyhow::Error> {
    if repository.find_by_email(SEED_ADMIN_EMAIL).await?.is_some() {
        return Ok(());
    }

    let now = Utc::now();
    let admin = User {
        id: UserId::new(),
        email: EmailAddress::new(SEED_ADMIN_EMAIL.to_string())?,
        password_hash: authenticator.hash_password(SEED_ADMIN_PASSWORD)?,
        full_name: Some("Admin".to_string()),
        role: Role::Admin,
        created_at: now,
        updated_at: now,
        is_deleted: false,
    };
    repository.create(admin).await?;

    tracing::info!(email = SEED_ADMIN_EMAIL, "Seeded bootstrap admin account");
    Ok(())
}
