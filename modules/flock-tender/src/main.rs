use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, Instrument};
use tracing_subscriber::EnvFilter;

use flock_common::{FlockConfig, TenderConfig};
use flock_store::Store;
use flock_tender::tender::Tender;
use flock_tender::traits::{FlockStore, Platform};
use roost_client::RoostClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("flock=info".parse()?))
        .init();

    info!("Flock tender starting...");

    // Load config
    let config = FlockConfig::from_env();

    // Connect to Postgres and run migrations (idempotent)
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await?;
    flock_store::migrate(&pool).await?;

    let client = match &config.roost_base_url {
        Some(base_url) => RoostClient::with_base_url(base_url.clone()),
        None => RoostClient::new(),
    };
    let platform: Arc<dyn Platform> = Arc::new(client);

    let store = Store::new(pool);
    let accounts = store.accounts().await?;
    if accounts.is_empty() {
        anyhow::bail!("No accounts provisioned. Insert accounts and mentors first.");
    }
    info!(accounts = accounts.len(), "Tending accounts");

    let store: Arc<dyn FlockStore> = Arc::new(store);
    let tender_config = TenderConfig::default();

    // One independent tending loop per account; a failed account never
    // takes its siblings down.
    let mut handles = Vec::with_capacity(accounts.len());
    for account in accounts {
        let name = account.screen_name.clone();
        let tender = Tender::new(
            platform.clone(),
            store.clone(),
            account,
            tender_config.clone(),
        );
        let span = tracing::info_span!("tend", account = %name);
        handles.push(tokio::spawn(
            async move { (name, tender.run_forever().await) }.instrument(span),
        ));
    }

    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok((name, Err(err))) => error!(account = %name, error = %err, "Tender stopped"),
            Ok((name, Ok(()))) => info!(account = %name, "Tender finished"),
            Err(join_err) => error!(error = %join_err, "Tender task panicked"),
        }
    }

    Ok(())
}
