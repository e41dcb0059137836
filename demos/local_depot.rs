use lake_depot::{rows_to_batch, Depot, PutOutcome, StorageConfig};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let root = std::env::temp_dir().join("lake-depot-demo");
    std::fs::create_dir_all(&root)?;

    let storage_config = StorageConfig::local().with_option("path", root.to_string_lossy());
    let depot = Depot::builder(storage_config).build().await?;

    let container = depot
        .create_container_unique("docs")
        .await
        .ok_or("could not create a container")?;

    let rows = rows_to_batch(&[json!({"x": 1}), json!({"x": 2})])?;
    for attempt in 1..=2 {
        match depot.write_table(&container, "a.csv", rows.clone()).await? {
            PutOutcome::Uploaded => println!("attempt {}: uploaded", attempt),
            PutOutcome::AlreadyExists => println!("attempt {}: already there", attempt),
        }
    }

    if let Some(table) = depot.read_table(&container, "a.csv").await {
        println!("read back {} rows, {} columns", table.num_rows(), table.num_columns());
    }
    println!("objects in {}: {:?}", container, depot.list_objects(&container).await);

    Ok(())
}
