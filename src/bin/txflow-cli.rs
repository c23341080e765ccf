use clap::{Parser, Subcommand};
use serde_json::Value;

use txflow::tracker::{HttpTracker, TrackedTransaction, TrackingHandle};

#[derive(Parser)]
#[command(name = "txflow-cli")]
#[command(about = "Query the transaction tracking service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8090")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tracked status of a sequence
    Status {
        /// Tracking record id
        id: String,

        /// Print the raw JSON record
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let tracker = HttpTracker::with_client(reqwest::Client::new(), &cli.url);

    match cli.command {
        Commands::Status { id, json } => {
            let record = tracker.handle(id).get_transaction().await?;
            if json {
                let value: Value = serde_json::to_value(&record)?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_record(&record);
            }
        }
    }

    Ok(())
}

fn print_record(record: &TrackedTransaction) {
    println!("id:      {}", record.id);
    println!("status:  {} ({})", record.status.as_str(), record.display_stage());
    for hash in &record.tx_hashes {
        println!("tx:      {}", hash);
    }
    if let Some(reason) = &record.failure_reason {
        println!("reason:  {}", reason);
    }
}
