//! Jana Vedhi API - Citizen Engagement Portal
//!
//! Backend for the Jana Vedhi portal: participatory-budget voting with an
//! atomic per-proposal vote ledger, grievance submission and triage with a
//! public heatmap, a discussion forum, and fund-transparency / politician
//! tracker dashboards, behind JWT accounts.

mod auth;
mod budget;
mod config;
mod error;
mod forum;
mod grievance;
mod models;
mod routes;
mod state;
mod transparency;
mod users;

use crate::auth::{hash_password, Role};
use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use crate::users::UserService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Jana Vedhi - Citizen Engagement Portal API...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    if std::env::var("JWT_SECRET").is_err() {
        warn!("⚠️  JWT_SECRET not set, using default (INSECURE - set in production!)");
    }

    // Initialize database pool - REQUIRED
    let state = match init_database_pool(&settings).await {
        Ok(pool) => {
            info!("✅ Database pool created successfully");

            create_database_tables(&pool).await?;

            let state = Arc::new(AppState::new(pool));
            bootstrap_admin(&state.users).await?;
            state
        }
        Err(e) => {
            error!("❌ FATAL: Failed to initialize database pool: {}", e);
            error!("DATABASE_URL must be set in .env and database must be accessible");
            return Err(e);
        }
    };

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   ─── Authentication ───");
    info!("   POST /api/auth/register          - Register citizen account");
    info!("   POST /api/auth/login             - Login with email/password");
    info!("   POST /api/auth/refresh           - Refresh access token");
    info!("   GET  /api/auth/me                - Get current user");
    info!("");
    info!("   ─── Participatory Budget ───");
    info!("   GET  /api/budgets                - List proposals (ballot)");
    info!("   POST /api/budgets/:id/vote       - Toggle my vote");
    info!("   POST /api/budgets                - Create proposal (Admin)");
    info!("   POST /api/budgets/:id/close      - Close voting (Admin)");
    info!("");
    info!("   ─── Grievances ───");
    info!("   POST /api/grievances             - Submit grievance");
    info!("   GET  /api/grievances/mine        - My grievances");
    info!("   GET  /api/grievances/locations   - Heatmap locations");
    info!("   GET  /api/admin/grievances       - Triage list (Official)");
    info!("");
    info!("   ─── Forum & Transparency ───");
    info!("   GET  /api/forum/topics           - List topics");
    info!("   GET  /api/funds                  - Fund records");
    info!("   GET  /api/funds/departments      - Departmental rollup");
    info!("   GET  /api/politicians            - Politician tracker");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,janavedhi_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Initialize database pool from settings
async fn init_database_pool(settings: &Settings) -> anyhow::Result<deadpool_postgres::Pool> {
    use deadpool_postgres::{Config, ManagerConfig, RecyclingMethod};

    let db = &settings.database;

    // Hosted Postgres providers require TLS
    let use_tls = db.host.contains("neon.tech")
        || db.host.contains("supabase.co")
        || std::env::var("DATABASE_URL")
            .map(|u| u.contains("sslmode=require"))
            .unwrap_or(false);

    let mut cfg = Config::new();
    cfg.host = Some(db.host.clone());
    cfg.port = Some(db.port);
    cfg.user = Some(db.user.clone());
    cfg.password = Some(db.password.clone());
    cfg.dbname = Some(db.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let pool = if use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(deadpool_postgres::Runtime::Tokio1), tls)
            .map_err(|e| anyhow::anyhow!("Failed to create TLS pool: {}", e))?
    } else {
        cfg.create_pool(Some(deadpool_postgres::Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create pool: {}", e))?
    };

    // Test the connection
    let client = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get pool connection: {}", e))?;

    let _row = client
        .query_one("SELECT 1 as ok", &[])
        .await
        .map_err(|e| anyhow::anyhow!("Failed to verify database connection: {}", e))?;

    info!("✅ Database connection successful (TLS: {})", use_tls);
    Ok(pool)
}

/// Create database tables if they don't exist
async fn create_database_tables(pool: &deadpool_postgres::Pool) -> anyhow::Result<()> {
    let client = pool.get().await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(255) UNIQUE NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                name VARCHAR(255) NOT NULL,
                aadhaar VARCHAR(12) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'citizen',
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS budgets (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                status VARCHAR(10) NOT NULL DEFAULT 'open',
                vote_count BIGINT NOT NULL DEFAULT 0,
                version BIGINT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL
            )",
            &[],
        )
        .await?;

    // Set semantics for voter membership via the composite primary key
    client
        .execute(
            "CREATE TABLE IF NOT EXISTS budget_votes (
                budget_id UUID NOT NULL REFERENCES budgets(id) ON DELETE CASCADE,
                user_id UUID NOT NULL,
                cast_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (budget_id, user_id)
            )",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS grievances (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category VARCHAR(100) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'submitted',
                lat DOUBLE PRECISION NOT NULL,
                lng DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS forum_topics (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                user_id UUID NOT NULL,
                user_name VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                last_reply_user VARCHAR(255),
                last_reply_at TIMESTAMPTZ
            )",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS forum_replies (
                id UUID PRIMARY KEY,
                topic_id UUID NOT NULL REFERENCES forum_topics(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                user_id UUID NOT NULL,
                user_name VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS funds (
                id UUID PRIMARY KEY,
                department VARCHAR(100) NOT NULL,
                project VARCHAR(200) NOT NULL,
                allocated DOUBLE PRECISION NOT NULL,
                utilized DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
            &[],
        )
        .await?;

    client
        .execute(
            "CREATE TABLE IF NOT EXISTS politicians (
                id UUID PRIMARY KEY,
                name VARCHAR(200) NOT NULL,
                constituency VARCHAR(200) NOT NULL,
                party VARCHAR(200) NOT NULL,
                projects INTEGER NOT NULL,
                funds_utilized DOUBLE PRECISION NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
            &[],
        )
        .await?;

    // Indexes for the hot read paths
    let _ = client
        .execute(
            "CREATE INDEX IF NOT EXISTS idx_grievances_user_id ON grievances(user_id)",
            &[],
        )
        .await;
    let _ = client
        .execute(
            "CREATE INDEX IF NOT EXISTS idx_forum_replies_topic_id ON forum_replies(topic_id)",
            &[],
        )
        .await;
    let _ = client
        .execute(
            "CREATE INDEX IF NOT EXISTS idx_budget_votes_user_id ON budget_votes(user_id)",
            &[],
        )
        .await;

    info!("✅ Database tables initialized");
    Ok(())
}

/// Create the initial administrator account from ADMIN_EMAIL/ADMIN_PASSWORD
/// if it does not exist yet. Role changes afterwards go through the API.
async fn bootstrap_admin(users: &UserService) -> anyhow::Result<()> {
    let (email, password) = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
        (Ok(email), Ok(password)) => (email, password),
        _ => return Ok(()),
    };

    if users.find_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(&password)?;
    users
        .create(&email, &password_hash, "Administrator", "000000000000", Role::Admin)
        .await?;
    info!("✅ Bootstrap administrator account created: {}", email);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
