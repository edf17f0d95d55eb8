use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workforce::{
    config::Config,
    database::{self, Repositories, seed},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");
    let pool = database::connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    match seed::run(&Repositories::postgres(pool), config.bcrypt_cost).await {
        Ok(true) => tracing::info!("Seed data inserted"),
        Ok(false) => tracing::info!("Seed users already exist, nothing to do"),
        Err(e) => {
            tracing::error!("Seeding failed: {}", e);
            std::process::exit(1);
        }
    }
}
