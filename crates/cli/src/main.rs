//! Launchpad CLI - admin client for the Launchpad daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9527";

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(about = "Launchpad orchestrator CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "LAUNCHPAD_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the creation workflow for a new business
    Create {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        name: String,

        /// One-line business concept
        #[arg(long)]
        concept: String,

        #[arg(long)]
        target_market: Option<String>,

        /// Skip the market research step
        #[arg(long)]
        skip_research: bool,

        /// Priority (higher = more urgent)
        #[arg(short, long, default_value = "0")]
        priority: i32,
    },

    /// Poll development progress for a business
    Monitor { business_id: String },

    /// Run a marketing evaluation for a business
    Evaluate { business_id: String },

    /// Show queue counts and process metrics
    Status,

    /// Show per-queue health
    Health,

    /// Inspect or manage a single job
    Job {
        #[command(subcommand)]
        action: JobAction,
    },

    /// Pause, resume or clean a queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },

    /// List recurring triggers
    Schedules,
}

#[derive(Subcommand)]
enum JobAction {
    Get { job_id: String },
    /// Re-queue a failed job
    Retry { job_id: String },
    Remove { job_id: String },
}

#[derive(Subcommand)]
enum QueueAction {
    Pause { queue: String },
    Resume { queue: String },
    /// Delete finished jobs
    Clean {
        queue: String,

        /// Only jobs of this kind
        #[arg(long)]
        kind: Option<String>,

        /// Only jobs finished at least this long ago
        #[arg(long, default_value = "0")]
        older_than_ms: i64,

        /// COMPLETED or FAILED
        #[arg(long, default_value = "COMPLETED")]
        state: String,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct JobHandleRow {
    id: String,
    queue: String,
    kind: String,
    state: String,
}

#[derive(Deserialize, Tabled)]
struct QueueRow {
    queue: String,
    waiting: i64,
    active: i64,
    delayed: i64,
    completed: i64,
    failed: i64,
    paused: bool,
}

#[derive(Deserialize, Tabled)]
struct ScheduleRow {
    name: String,
    schedule: String,
    kind: String,
    running: bool,
    #[tabled(display_with = "display_option")]
    next_run: Option<i64>,
    fire_count: u64,
}

fn display_option(value: &Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn print_handle(title: &str, result: Value) -> Result<()> {
    let handle: JobHandleRow = serde_json::from_value(result).context("Unexpected job handle")?;
    println!("{}", format!("✓ {}", title).green().bold());
    println!();
    println!("{}", Table::new(vec![handle]));
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::Create {
            user_id,
            name,
            concept,
            target_market,
            skip_research,
            priority,
        } => {
            let params = json!({
                "userId": user_id,
                "name": name,
                "concept": concept,
                "targetMarket": target_market,
                "skipResearch": skip_research,
                "options": { "priority": priority },
            });
            let result = call_rpc(url, "business.create.v1", params).await?;
            print_handle("Business creation queued", result)?;
        }

        Commands::Monitor { business_id } => {
            let result = call_rpc(
                url,
                "development.monitor.v1",
                json!({ "businessId": business_id }),
            )
            .await?;
            print_handle("Development monitoring queued", result)?;
        }

        Commands::Evaluate { business_id } => {
            let result = call_rpc(
                url,
                "marketing.evaluate.v1",
                json!({ "businessId": business_id }),
            )
            .await?;
            print_handle("Marketing evaluation queued", result)?;
        }

        Commands::Status => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match call_rpc(url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), url);
                    println!("  {} {}", "State:".bold(), stats["state"].as_str().unwrap_or("?").green());
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_secs"]);
                    println!(
                        "  {} {}%",
                        "CPU:".bold(),
                        stats["system"]["cpu_usage_percent"]
                    );
                    println!(
                        "  {} {} MB",
                        "Memory:".bold(),
                        stats["system"]["process_memory_mb"]
                    );
                    println!();

                    let queues: Vec<QueueRow> =
                        serde_json::from_value(stats["queues"].clone()).unwrap_or_default();
                    println!("{}", Table::new(queues));
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }

        Commands::Health => {
            let report = call_rpc(url, "admin.health.v1", json!({})).await?;
            let status = report["status"].as_str().unwrap_or("unknown");
            let colored_status = match status {
                "healthy" => status.green(),
                "degraded" => status.yellow(),
                _ => status.red(),
            };
            println!("{} {}", "Health:".bold(), colored_status);
            if let Some(error) = report["error"].as_str() {
                println!("  {} {}", "Error:".bold(), error);
            }
            for queue in report["queues"].as_array().into_iter().flatten() {
                for issue in queue["issues"].as_array().into_iter().flatten() {
                    println!(
                        "  {} {}: {}",
                        "•".yellow(),
                        queue["queue"].as_str().unwrap_or("?"),
                        issue.as_str().unwrap_or_default()
                    );
                }
            }
        }

        Commands::Job { action } => match action {
            JobAction::Get { job_id } => {
                let job = call_rpc(url, "admin.job.get.v1", json!({ "jobId": job_id })).await?;
                print_json(&job)?;
            }
            JobAction::Retry { job_id } => {
                let job = call_rpc(url, "admin.job.retry.v1", json!({ "jobId": job_id })).await?;
                println!("{}", format!("✓ Job {} re-queued", job_id).green().bold());
                print_json(&job)?;
            }
            JobAction::Remove { job_id } => {
                call_rpc(url, "admin.job.remove.v1", json!({ "jobId": job_id })).await?;
                println!("{}", format!("✓ Job {} removed", job_id).green().bold());
            }
        },

        Commands::Queue { action } => match action {
            QueueAction::Pause { queue } => {
                call_rpc(url, "admin.queue.pause.v1", json!({ "queue": queue })).await?;
                println!("{}", format!("✓ Queue {} paused", queue).green().bold());
            }
            QueueAction::Resume { queue } => {
                call_rpc(url, "admin.queue.resume.v1", json!({ "queue": queue })).await?;
                println!("{}", format!("✓ Queue {} resumed", queue).green().bold());
            }
            QueueAction::Clean {
                queue,
                kind,
                older_than_ms,
                state,
            } => {
                let params = json!({
                    "queue": queue,
                    "kind": kind,
                    "olderThanMs": older_than_ms,
                    "state": state.to_uppercase(),
                });
                let result = call_rpc(url, "admin.queue.clean.v1", params).await?;
                println!(
                    "{}",
                    format!("✓ {} jobs removed from {}", result["removed"], queue)
                        .green()
                        .bold()
                );
            }
        },

        Commands::Schedules => {
            let result = call_rpc(url, "admin.schedule.list.v1", json!({})).await?;
            let rows: Vec<ScheduleRow> =
                serde_json::from_value(result).context("Unexpected schedule listing")?;
            println!("{}", Table::new(rows));
        }
    }

    Ok(())
}
