//! Standalone maintenance script: delete all non-active jobs from both
//! queues.
//!
//! Exit code 0 on success, 1 on any connectivity or operational failure.

use mentora_core::{JobRepository, JobStatus, QueueCounts, QueueName};
use mentora_db::Database;

fn print_counts(label: &str, counts: &QueueCounts) {
    println!("{label}:");
    println!("  waiting:   {}", counts.waiting);
    println!("  active:    {}", counts.active);
    println!("  completed: {}", counts.completed);
    println!("  failed:    {}", counts.failed);
    println!("  delayed:   {}", counts.delayed);
    println!("  total:     {}", counts.total());
}

async fn run() -> mentora_core::Result<()> {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/mentora".to_string());
    let db = Database::connect(&database_url).await?;

    // Running leases are left alone; their workers still hold them.
    let clearable = [JobStatus::Pending, JobStatus::Completed, JobStatus::Failed];

    for queue in [QueueName::ChapterContent, QueueName::Grading] {
        let before = db.jobs.counts(queue).await?;
        print_counts(&format!("{queue} before"), &before);

        let removed = db.jobs.clear(queue, &clearable).await?;
        for (status, count) in clearable.iter().zip(&removed) {
            println!("deleted {count} {} jobs", status.as_str());
        }

        let after = db.jobs.counts(queue).await?;
        print_counts(&format!("{queue} after"), &after);
        println!();
    }

    db.close().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(e) = run().await {
        eprintln!("Error clearing queue: {e}");
        std::process::exit(1);
    }
}
