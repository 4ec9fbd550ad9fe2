use configuration::DatabaseSettings;
use futures::future::BoxFuture;
use serde::Serialize;
use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::session::{Session, scoped};

/// Embedded schema migrations (`crates/database/migrations`).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Owns the process-wide PostgreSQL pool and hands out transactional sessions.
///
/// Construct one at startup, call [`initialize`](Self::initialize) once, share
/// clones with whatever needs database access, and call
/// [`shutdown`](Self::shutdown) before exiting. Clones share the same pool.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    settings: DatabaseSettings,
    pool: RwLock<Option<PgPool>>,
}

/// Snapshot of pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub size: u32,
    pub idle: usize,
    pub max_connections: u32,
}

impl ConnectionManager {
    /// Stores the settings. Nothing is opened until [`initialize`](Self::initialize).
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                pool: RwLock::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.inner.settings
    }

    /// Builds the connection pool.
    ///
    /// Connections are opened on demand, so this only fails on invalid
    /// configuration or when the manager is already initialized. Use
    /// [`ping`](Self::ping) to check reachability at startup.
    pub async fn initialize(&self) -> Result<(), DbError> {
        let mut slot = self.inner.pool.write().await;
        if slot.is_some() {
            return Err(DbError::AlreadyInitialized);
        }

        let settings = &self.inner.settings;
        let connect_options = connect_options(settings)?;
        let pool = pool_options(settings).connect_lazy_with(connect_options);
        *slot = Some(pool);

        tracing::info!(
            pool_size = settings.pool_size,
            max_overflow = settings.max_overflow,
            pre_ping = settings.pre_ping,
            recycle_secs = settings.recycle_secs,
            "Database connection pool initialized."
        );
        Ok(())
    }

    /// Closes the pool, waiting for checked-out connections to come back.
    /// Calling it on a manager that is not initialized does nothing.
    pub async fn shutdown(&self) {
        let pool = self.inner.pool.write().await.take();
        match pool {
            Some(pool) => {
                pool.close().await;
                tracing::info!("Database connection pool closed.");
            }
            None => tracing::debug!("Database shutdown requested but no pool is open."),
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.inner.pool.read().await.is_some()
    }

    /// A handle to the underlying pool, for callers that need raw access.
    pub async fn pool(&self) -> Result<PgPool, DbError> {
        self.inner
            .pool
            .read()
            .await
            .clone()
            .ok_or(DbError::NotInitialized)
    }

    /// Begins a transaction on a pooled connection.
    ///
    /// The session must be finished with [`Session::commit`] or
    /// [`Session::rollback`]; dropping it rolls back. Waits up to the
    /// configured acquire timeout when every connection is in use.
    pub async fn acquire_session(&self) -> Result<Session, DbError> {
        let pool = self.pool().await?;
        let tx = pool.begin().await?;
        Ok(Session::new(tx))
    }

    /// Runs `f` in a fresh session: commit on `Ok`, rollback on `Err`.
    /// See [`scoped`] for the exact contract.
    pub async fn with_session<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<DbError>,
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
    {
        let session = self.acquire_session().await.map_err(E::from)?;
        scoped(session, f).await
    }

    /// Round-trips `SELECT 1` on a pooled connection.
    pub async fn ping(&self) -> Result<(), DbError> {
        let pool = self.pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Applies pending schema migrations.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        let pool = self.pool().await?;
        tracing::info!("Running database migrations...");
        MIGRATOR.run(&pool).await?;
        tracing::info!("Migrations completed successfully.");
        Ok(())
    }

    pub async fn pool_status(&self) -> Option<PoolStatus> {
        self.inner.pool.read().await.as_ref().map(|pool| PoolStatus {
            size: pool.size(),
            idle: pool.num_idle(),
            max_connections: self.inner.settings.max_connections(),
        })
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL carries credentials; leave it out.
        f.debug_struct("ConnectionManager")
            .field("max_connections", &self.inner.settings.max_connections())
            .finish_non_exhaustive()
    }
}

fn pool_options(settings: &DatabaseSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections())
        .min_connections(settings.min_idle)
        .test_before_acquire(settings.pre_ping)
        .max_lifetime(settings.recycle())
        .idle_timeout(settings.idle_timeout())
        .acquire_timeout(settings.acquire_timeout())
}

fn connect_options(settings: &DatabaseSettings) -> Result<PgConnectOptions, DbError> {
    let target = normalize_url(&settings.url, &settings.ssl_required_hosts)?;
    let mut options =
        PgConnectOptions::from_str(&target.url).map_err(|e| DbError::Config(e.to_string()))?;

    if target.require_tls {
        options = options.ssl_mode(PgSslMode::Require);
    }
    if !settings.log_statements {
        options = options.disable_statement_logging();
    }
    Ok(options)
}

/// A connection URL the Postgres driver accepts, plus whether TLS must be forced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    pub url: String,
    pub require_tls: bool,
}

/// Rewrites a relational connection URL for the async Postgres driver.
///
/// - `postgresql+asyncpg://…` and other `+driver` schemes become `postgres://…`.
/// - Hosts matching `ssl_required_hosts` (exactly or as a subdomain) lose any
///   `sslmode` query parameter and are flagged for mandatory TLS instead.
///   Other parameters are kept.
pub fn normalize_url(raw: &str, ssl_required_hosts: &[String]) -> Result<NormalizedUrl, DbError> {
    let raw = raw.trim();
    let (scheme, rest) = raw
        .split_once("://")
        .ok_or_else(|| DbError::Config("connection URL has no scheme".to_string()))?;

    let (base_scheme, driver) = match scheme.split_once('+') {
        Some((base, driver)) => (base, Some(driver)),
        None => (scheme, None),
    };
    let base_scheme = base_scheme.to_ascii_lowercase();
    if base_scheme != "postgres" && base_scheme != "postgresql" {
        return Err(DbError::Config(format!(
            "unsupported connection scheme '{scheme}', expected postgres:// or postgresql://"
        )));
    }
    let scheme = match driver {
        Some(_) => "postgres".to_string(),
        None => base_scheme,
    };

    let host = host_of(rest).to_ascii_lowercase();
    let require_tls = ssl_required_hosts.iter().any(|provider| {
        let provider = provider.to_ascii_lowercase();
        host == provider || host.ends_with(&format!(".{provider}"))
    });

    let rest = if require_tls {
        strip_query_param(rest, "sslmode")
    } else {
        rest.to_string()
    };

    Ok(NormalizedUrl {
        url: format!("{scheme}://{rest}"),
        require_tls,
    })
}

/// Host part of `user:pass@host:port/db?query`.
fn host_of(rest: &str) -> &str {
    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    if let Some(bracketed) = host_port.strip_prefix('[') {
        return bracketed.split(']').next().unwrap_or_default();
    }
    host_port.split(':').next().unwrap_or_default()
}

fn strip_query_param(rest: &str, key: &str) -> String {
    let Some((path, query)) = rest.split_once('?') else {
        return rest.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(key))
        .collect();

    if kept.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", kept.join("&"))
    }
}
