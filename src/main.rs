use campus_api::state::AppState;
use campus_api::{config, database, is_development, permissions, routes};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_api=info,tower_http=info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("starting Campus API in {:?} mode", config.environment);

    // The development default secret never leaves a local checkout.
    if !is_development!() && config.security.jwt_secret.is_empty() {
        panic!("JWT_SECRET must be set outside development");
    }

    let pool = database::connect()
        .await
        .unwrap_or_else(|e| panic!("failed to connect to database: {}", e));

    if config.database.run_migrations_on_start {
        database::run_migrations(&pool)
            .await
            .unwrap_or_else(|e| panic!("failed to run migrations: {}", e));
    }

    // Refuse to serve requests against a permissions table that disagrees
    // with the compiled-in catalog.
    permissions::verify_catalog(&pool)
        .await
        .unwrap_or_else(|e| panic!("permission catalog check failed: {}", e));

    let app = routes::app(AppState::new(pool));

    // Allow tests or deployments to override port via env
    let port = std::env::var("CAMPUS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 Campus API server listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
