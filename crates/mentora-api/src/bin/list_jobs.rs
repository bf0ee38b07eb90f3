//! Standalone diagnostic: list jobs on both queues grouped by state.
//!
//! Exit code 0 on success, 1 on any connectivity or operational failure.

use mentora_core::{JobRepository, JobStatus, QueueName};
use mentora_db::Database;

async fn run() -> mentora_core::Result<()> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/mentora".to_string());
    let db = Database::connect(&database_url).await?;

    for queue in [QueueName::ChapterContent, QueueName::Grading] {
        println!("queue: {queue}");
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            let jobs = db.jobs.list(queue, &[status], 100).await?;
            println!("  {} ({}):", status.as_str(), jobs.len());
            for job in jobs {
                println!(
                    "    {} entity={} attempts={}/{} error={}",
                    job.id,
                    job.entity_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    job.retry_count,
                    job.max_retries,
                    job.error_message.as_deref().unwrap_or("-"),
                );
            }
        }
    }

    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(e) = run().await {
        eprintln!("Error listing jobs: {e}");
        std::process::exit(1);
    }
}
