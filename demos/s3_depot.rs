use lake_depot::{Depot, PutConsistency, StorageConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let storage_config = StorageConfig::aws()
        .with_option("region", "eu-west-1")
        .with_option("access_key_id", "the_access_key_id")
        .with_option("secret_access_key", "the_secret_access_key")
        .with_option("session_token", "session_token_if_needed");
    let depot = Depot::builder(storage_config)
        .with_consistency(PutConsistency::RequireConditionalPut)
        .build()
        .await?;

    if let Err(e) = depot.validate_connection().await {
        eprintln!("cannot reach S3: {}", e);
        return Ok(());
    }

    let bucket = "my-bucket-1234";
    let outcome = depot.upload_file(bucket, "reports/q1.pdf", "./q1.pdf").await?;
    println!("reports/q1.pdf: {:?}", outcome);

    for key in depot.list_objects(bucket).await {
        println!("{}", key);
    }

    Ok(())
}
