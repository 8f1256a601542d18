use std::time::Duration;

use clap::{Parser, Subcommand};
use tabular_fabric_class_infer::client::{call_health, call_predict, parse_features};
use tabular_fabric_class_infer::trace;

#[derive(Parser, Debug)]
#[clap(name = "tabular-class-infer-client", about = "Calls a running prediction server")]
struct Args {
    /// Server host
    #[clap(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[clap(long, default_value_t = 50051)]
    port: u16,

    /// Per-call timeout in seconds
    #[clap(long, default_value_t = 5)]
    timeout_secs: u64,

    #[clap(long, default_value = "INFO")]
    log_level: String,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call Health
    Health,
    /// Call Predict with `name=value` features, or the Iris sample if none are given
    Predict { features: Vec<String> },
}

async fn health(args: &Args, timeout: Duration) {
    println!("Testing Health endpoint...");
    if let Some(response) = call_health(&args.host, args.port, timeout).await {
        println!("   Status: {}", response.status);
        println!("   Model Version: {}", response.model_version);
    }
}

async fn predict(args: &Args, features: &[String], timeout: Duration) {
    println!("Testing Predict endpoint...");
    let features = if features.is_empty() {
        None
    } else {
        match parse_features(features) {
            Ok(features) => Some(features),
            Err(e) => {
                tracing::error!("invalid features: {}", e);
                return;
            }
        }
    };
    if let Some(response) = call_predict(features, &args.host, args.port, timeout).await {
        println!("   Prediction: {}", response.prediction);
        println!("   Confidence: {:.2}%", response.confidence * 100.0);
        println!("   Model Version: {}", response.model_version);
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    trace::init("tabular-class-infer-client", "text", "UTC", &args.log_level);
    let timeout = Duration::from_secs(args.timeout_secs);

    println!("{}", "=".repeat(60));
    match &args.command {
        Some(Command::Health) => health(&args, timeout).await,
        Some(Command::Predict { features }) => predict(&args, features, timeout).await,
        None => {
            health(&args, timeout).await;
            println!();
            predict(&args, &[], timeout).await;
        }
    }
    println!("{}", "=".repeat(60));
}
