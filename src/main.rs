use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use k1s0_schema_engine::domain::repository::{MetadataRegistrar, SchemaCatalog};
use k1s0_schema_engine::infrastructure::config::Config;
use k1s0_schema_engine::infrastructure::persistence::{
    MetadataRegistrarPostgres, SchemaCatalogPostgres,
};
use k1s0_schema_engine::infrastructure::{database, logger};
use k1s0_schema_engine::usecase::{GetTableRegistryUseCase, ValidateSchemaUseCase};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let config_content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config: {config_path}"))?;
    let cfg = Config::from_yaml(&config_content)?;

    logger::init_logger(&cfg.app.environment, &cfg.logging.format);

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting schema engine"
    );

    // Database
    let (url, max_connections) = match (std::env::var("DATABASE_URL"), cfg.database.as_ref()) {
        (Ok(url), Some(db)) => (url, db.max_connections),
        (Ok(url), None) => (url, 25),
        (Err(_), Some(db)) => (db.connection_url(), db.max_connections),
        (Err(_), None) => anyhow::bail!("no database configured and DATABASE_URL is not set"),
    };
    let pool = database::connect(&url, max_connections).await?;
    info!("database connection pool established");

    database::run_migrations(&pool).await?;
    info!("registry migrations applied");

    // Repositories
    let catalog: Arc<dyn SchemaCatalog> = Arc::new(SchemaCatalogPostgres::new(pool.clone()));
    let registrar: Arc<dyn MetadataRegistrar> = Arc::new(MetadataRegistrarPostgres::new(
        pool.clone(),
        &cfg.schema_engine,
    ));

    // Use cases
    let validate_uc = ValidateSchemaUseCase::new(catalog, registrar.clone());
    let registry_uc = GetTableRegistryUseCase::new(registrar);

    let registry = registry_uc.execute().await?;
    info!(tables = registry.len(), "table registry loaded");

    let health = validate_uc.validate_schema_registry().await?;
    if health.is_healthy() {
        info!(
            status = %health.status,
            expected = health.expected_count,
            actual = health.actual_count,
            "schema registry audit finished"
        );
    } else {
        warn!(
            status = %health.status,
            expected = health.expected_count,
            actual = health.actual_count,
            missing = ?health.missing_tables,
            "schema registry has missing tables"
        );
    }

    pool.close().await;
    Ok(())
}
