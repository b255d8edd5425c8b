use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use catalog::{
    AppState,
    cache::RedisStore,
    config::Config,
    database::{PgProductRepository, PgUserRepository},
    router::create_router,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const MAX_DB_CONNECTIONS: u32 = 10;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("invalid configuration");
    if cfg!(debug_assertions) {
        tracing::info!("Debug build, permissive CORS enabled");
    }

    let pool = connect_postgres(&config)
        .await
        .expect("could not connect to Postgres");

    let cache = RedisStore::connect(&config.redis_url, config.cache_timeout())
        .await
        .expect("could not connect to Redis");

    let state = AppState::new(
        config.clone(),
        Arc::new(cache),
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgProductRepository::new(pool)),
    );

    let addr = bind_address(&config);
    let listener = TcpListener::bind(addr).await.expect("could not bind listener");
    tracing::info!(%addr, base = %config.api_base_uri, "Catalog API listening");

    axum::serve(
        listener,
        create_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    tracing::info!("Server stopped");
}

async fn connect_postgres(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'catalog';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    Ok(pool)
}

/// Unparseable hosts fall back to the dual-stack wildcard.
fn bind_address(config: &Config) -> SocketAddr {
    let ip = config.server_host.parse().unwrap_or_else(|_| {
        tracing::warn!(host = %config.server_host, "Invalid SERVER_HOST, binding to [::]");
        IpAddr::V6(Ipv6Addr::UNSPECIFIED)
    });
    SocketAddr::new(ip, config.server_port)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, draining connections");
}
