//! CLI subcommands.

pub mod migrate;
pub mod users;

use secrecy::SecretString;

/// Errors shared by commands that need the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read `FIXFLOW_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) fn database_url() -> Result<SecretString, ConnectError> {
    dotenvy::dotenv().ok();

    std::env::var("FIXFLOW_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar("FIXFLOW_DATABASE_URL"))
}

/// Connect using the server's pool settings.
pub(crate) async fn connect() -> Result<sqlx::PgPool, ConnectError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(fixflow_server::db::create_pool(&url).await?)
}
