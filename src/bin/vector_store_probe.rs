use pgvector_store::config::Config;
use pgvector_store::{QuerySpec, VectorStore};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Config::from_env();
    config.print_summary();

    tracing::info!("Connecting to vector store...");
    let store = VectorStore::connect(config.store_config()).await?;
    store.health_check().await?;

    let count = store.count().await?;
    println!("Rows in {}: {}", config.table_name, count);

    // Unranked sample, no embedding needed
    let sample = store.query(QuerySpec::new().with_top_k(5)).await?;
    for m in &sample {
        println!(
            "  {} [{}] {}",
            m.id,
            m.chunk.kind,
            m.chunk.content.chars().take(60).collect::<String>()
        );
    }

    Ok(())
}
