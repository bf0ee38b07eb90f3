//! Standalone connectivity diagnostic for the queue's backing store.
//!
//! Prints the connection state and per-queue counts. Exit code 0 when the
//! store answers, 1 on any connectivity failure.

use std::time::Duration;

use mentora_core::{JobRepository, QueueName};
use mentora_db::{Database, PoolConfig};

async fn run() -> mentora_core::Result<()> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/mentora".to_string());

    // Short acquire timeout so a dead store reports quickly instead of
    // hanging the diagnostic.
    let config = PoolConfig::new()
        .max_connections(1)
        .connect_timeout(Duration::from_secs(5));
    let db = Database::connect_with_config(&database_url, config).await?;

    db.jobs.ping().await?;
    println!("store: connected");

    for queue in [QueueName::ChapterContent, QueueName::Grading] {
        let counts = db.jobs.counts(queue).await?;
        println!(
            "{queue}: waiting={} active={} completed={} failed={} delayed={}",
            counts.waiting, counts.active, counts.completed, counts.failed, counts.delayed
        );
    }

    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(e) = run().await {
        eprintln!("store: disconnected ({e})");
        std::process::exit(1);
    }
}
