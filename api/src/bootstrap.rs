//! Process bootstrap
//!
//! Connects the database, wires the service container, and runs the HTTP server
//! until a shutdown signal arrives.
//!
//! # Process
//! 1. Connect the MySQL pool and ping it
//! 2. Optionally create missing tables
//! 3. Register the `UserService` capability
//! 4. Bind the listener and serve until shutdown
//! 5. Close the pool

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use crate::adapters::{ensure_schema, MySqlUserRepository};
use crate::app::{RepositoryUserService, UserService};
use crate::config::{Config, DatabaseConfig};
use crate::container::ServiceRegistry;
use crate::error::{RegistryError, StartupError};
use crate::router;
use crate::AppState;

/// Construct the `UserService` singleton over the shared pool.
pub fn provide_user_service(db: DatabaseConnection) -> Arc<dyn UserService> {
    let user_repo = Arc::new(MySqlUserRepository::new(db));
    Arc::new(RepositoryUserService::new(user_repo))
}

/// Build the container holding every capability the server needs.
pub fn build_registry(db: &DatabaseConnection) -> Result<ServiceRegistry, RegistryError> {
    let db = db.clone();

    Ok(ServiceRegistry::builder()
        .provide::<dyn UserService, _>(move || Ok(provide_user_service(db)))?
        .build())
}

/// Open the connection pool and verify the server answers.
pub async fn connect(cfg: &DatabaseConfig) -> Result<DatabaseConnection, StartupError> {
    let mut options = ConnectOptions::new(cfg.url.clone());
    options
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(cfg.connect_timeout)
        .acquire_timeout(cfg.connect_timeout)
        .sqlx_logging(cfg.sql_logging);

    info!(
        max_connections = cfg.max_connections,
        timeout_secs = cfg.connect_timeout.as_secs(),
        "Connecting to database..."
    );
    let db = Database::connect(options)
        .await
        .map_err(StartupError::Database)?;

    if let Err(e) = db.ping().await {
        close_pool(db).await;
        return Err(StartupError::Database(e));
    }

    info!("Database connected");
    Ok(db)
}

async fn close_pool(db: DatabaseConnection) {
    if let Err(e) = db.close().await {
        warn!(error = %e, "Failed to close database pool");
    }
}

/// A fully wired application: pool, container and shared state.
pub struct Application {
    state: AppState,
    db: DatabaseConnection,
}

impl Application {
    /// Run the startup sequence. Nothing is registered unless every step succeeds.
    ///
    /// # Errors
    /// Returns an error if:
    /// * the database is unreachable or rejects the credentials
    /// * schema initialization fails
    /// * a capability cannot be registered
    pub async fn bootstrap(config: Config) -> Result<Self, StartupError> {
        let db = connect(&config.database).await?;

        if config.database.init_schema {
            if let Err(e) = ensure_schema(&db).await {
                close_pool(db).await;
                return Err(StartupError::Schema(e));
            }
        }

        let state = match build_registry(&db)
            .and_then(|registry| AppState::from_registry(registry, config))
        {
            Ok(state) => state,
            Err(e) => {
                close_pool(db).await;
                return Err(e.into());
            }
        };

        info!(
            count = state.registry.len(),
            capabilities = ?state.registry.capabilities(),
            "Service container ready"
        );
        Ok(Self { state, db })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` resolves, then release the pool.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self { state, db } = self;

        let result = match Server::bind(state).await {
            Ok(server) => server.run_until(shutdown).await,
            Err(e) => Err(e),
        };

        close_pool(db).await;
        info!("Database pool closed");
        result
    }
}

/// A bound listener ready to serve the router.
pub struct Server {
    listener: TcpListener,
    app: Router,
}

impl Server {
    /// Build the router, then bind the listener. Nothing is bound if the router fails.
    pub async fn bind(state: AppState) -> Result<Self, StartupError> {
        let addr = state.config.listen_addr();
        let app = router::build(state)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;

        Ok(Self { listener, app })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve requests until `shutdown` resolves; in-flight requests are drained.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), StartupError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr().map_err(StartupError::Serve)?;

        info!("Listening on {}", addr);
        axum::serve(
            self.listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(StartupError::Serve)?;

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use crate::config::RateLimit;
    use crate::test_utils::{
        in_memory_user_service, test_config, test_state_with, unreachable_database,
    };

    async fn send(addr: SocketAddr, request: String) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    async fn http_get(addr: SocketAddr, path: &str) -> String {
        send(
            addr,
            format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
        )
        .await
    }

    async fn http_post_json(addr: SocketAddr, path: &str, body: &str) -> String {
        send(
            addr,
            format!(
                "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            ),
        )
        .await
    }

    #[tokio::test]
    async fn unreachable_database_fails_before_running() {
        let mut config = test_config("mysql://unused@localhost/unused");
        config.database = unreachable_database();

        let result = Application::bootstrap(config).await;
        assert!(matches!(result, Err(StartupError::Database(_))));
    }

    #[tokio::test]
    async fn malformed_database_url_fails_fast() {
        let config = test_config("not-a-database-url");

        let result = Application::bootstrap(config).await;
        assert!(matches!(result, Err(StartupError::Database(_))));
    }

    #[tokio::test]
    async fn bind_conflict_is_a_startup_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let mut state = test_state_with(in_memory_user_service());
        let mut config = (*state.config).clone();
        config.port = port;
        state.config = Arc::new(config);

        let result = Server::bind(state).await;
        assert!(matches!(result, Err(StartupError::Bind { .. })));
    }

    #[tokio::test]
    async fn invalid_rate_limit_fails_before_binding() {
        let mut state = test_state_with(in_memory_user_service());
        let mut config = (*state.config).clone();
        config.rate_limit = Some(RateLimit {
            per_second: 1,
            burst: 0,
        });
        state.config = Arc::new(config);

        let result = Server::bind(state).await;
        assert!(matches!(result, Err(StartupError::RateLimit(_))));
    }

    #[tokio::test]
    async fn write_routes_are_rate_limited_per_client() {
        let mut state = test_state_with(in_memory_user_service());
        let mut config = (*state.config).clone();
        config.rate_limit = Some(RateLimit {
            per_second: 1,
            burst: 1,
        });
        state.config = Arc::new(config);

        let server = Server::bind(state).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let running = tokio::spawn(server.run_until(async {
            stop_rx.await.ok();
        }));

        let first = http_post_json(
            addr,
            "/users",
            r#"{"name":"First","email":"first@example.com"}"#,
        )
        .await;
        assert!(first.starts_with("HTTP/1.1 201"), "got: {first}");

        let second = http_post_json(
            addr,
            "/users",
            r#"{"name":"Second","email":"second@example.com"}"#,
        )
        .await;
        assert!(second.starts_with("HTTP/1.1 429"), "got: {second}");

        // Reads are never limited
        for _ in 0..3 {
            let listed = http_get(addr, "/users").await;
            assert!(listed.starts_with("HTTP/1.1 200"), "got: {listed}");
        }

        stop_tx.send(()).unwrap();
        running.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn serves_until_shutdown_and_releases_state() {
        let service = in_memory_user_service();

        for _ in 0..3 {
            let server = Server::bind(test_state_with(service.clone())).await.unwrap();
            let addr = server.local_addr().unwrap();
            let (stop_tx, stop_rx) = oneshot::channel::<()>();

            let running = tokio::spawn(server.run_until(async {
                stop_rx.await.ok();
            }));

            let response = http_get(addr, "/health").await;
            assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
            assert!(response.contains("UserService"));

            stop_tx.send(()).unwrap();
            running.await.unwrap().unwrap();

            // Only the test's handle survives a full start/stop cycle
            assert_eq!(Arc::strong_count(&service), 1);
            assert!(TcpStream::connect(addr).await.is_err());
        }
    }
}
