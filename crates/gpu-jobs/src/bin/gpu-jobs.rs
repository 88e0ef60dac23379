//! GPU jobs CLI - run training and inference jobs on hosted GPU clouds.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gpu_jobs::config::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use gpu_jobs::providers::{lightning, paperspace};
use gpu_jobs::{
    Config, Credentials, JobOptions, JobRunner, ParamOverrides, Platform, PollPolicy, Task,
};

/// GPU jobs CLI - Train and run models on Lightning AI and Paperspace GPUs.
#[derive(Parser)]
#[command(name = "gpu-jobs")]
#[command(about = "Submit and monitor GPU training/inference jobs")]
struct Cli {
    /// GPU platform to use.
    #[arg(long, value_enum)]
    platform: Platform,

    /// Task to perform.
    #[arg(long, value_enum)]
    task: Task,

    /// Model name (e.g., microsoft/phi-2).
    #[arg(long)]
    model: String,

    /// Just check available credits.
    #[arg(long, default_value = "false")]
    check_credits: bool,

    /// Lightning AI API key (or set `LIGHTNING_API_KEY` env var).
    #[arg(long, env = "LIGHTNING_API_KEY", default_value = "", hide_env_values = true)]
    lightning_api_key: String,

    /// Paperspace API key (or set `PAPERSPACE_API_KEY` env var).
    #[arg(long, env = "PAPERSPACE_API_KEY", default_value = "", hide_env_values = true)]
    paperspace_api_key: String,

    /// Hugging Face token passed to the job (or set `HF_TOKEN` env var).
    #[arg(long, env = "HF_TOKEN", default_value = "", hide_env_values = true)]
    hf_token: String,

    /// Lightning AI API base URL.
    #[arg(long, env = "LIGHTNING_API_URL", default_value = lightning::API_BASE_URL, hide = true)]
    lightning_url: String,

    /// Paperspace API base URL.
    #[arg(long, env = "PAPERSPACE_API_URL", default_value = paperspace::API_BASE_URL, hide = true)]
    paperspace_url: String,

    /// Python script to run instead of the built-in template.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Training epochs.
    #[arg(long)]
    epochs: Option<u32>,

    /// Per-device training batch size.
    #[arg(long)]
    batch_size: Option<u32>,

    /// Training learning rate.
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Training dataset as `name` or `name:config`.
    #[arg(long)]
    dataset: Option<String>,

    /// Seconds between status polls.
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval: u64,

    /// Seconds to wait for the job to finish (0 waits indefinitely).
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    // Load .env before parsing so clap sees its values.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        println!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli);
    let runner = JobRunner::new(config);

    if cli.check_credits {
        let report = match runner.check_credits(cli.platform.as_str()).await {
            Ok(credits) => credits,
            Err(e) => e.to_record(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let options = JobOptions {
        script: cli
            .script
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read script {}", path.display()))
            })
            .transpose()?,
        overrides: ParamOverrides {
            epochs: cli.epochs,
            batch_size: cli.batch_size,
            learning_rate: cli.learning_rate,
            dataset: cli.dataset.clone(),
        },
    };

    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl-C, cancelling");
            cancel.cancel();
        }
    });

    info!(platform = %cli.platform, task = %cli.task, model = %cli.model, "Submitting job");

    let handle = runner
        .submit(cli.platform, cli.task, &cli.model, &options)
        .await?;
    println!(
        "✅ {} job submitted: {}",
        handle.platform.display_name(),
        handle.job_id
    );

    let result = runner.monitor(&handle).await?;

    println!("✅ Job completed successfully!");
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn build_config(cli: &Cli) -> Config {
    let credentials = Credentials::new(
        Some(cli.lightning_api_key.clone()),
        Some(cli.paperspace_api_key.clone()),
        Some(cli.hf_token.clone()),
    );

    let poll = PollPolicy {
        interval: Duration::from_secs(cli.poll_interval.max(1)),
        timeout: (cli.timeout > 0).then(|| Duration::from_secs(cli.timeout)),
    };

    Config::new(credentials)
        .with_base_url(Platform::Lightning, cli.lightning_url.clone())
        .with_base_url(Platform::Paperspace, cli.paperspace_url.clone())
        .with_poll_policy(poll)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from([
            "gpu-jobs",
            "--platform",
            "lightning",
            "--task",
            "train",
            "--model",
            "microsoft/phi-2",
        ])
        .unwrap();

        assert_eq!(cli.platform, Platform::Lightning);
        assert_eq!(cli.task, Task::Train);
        assert!(!cli.check_credits);
        assert_eq!(cli.poll_interval, 30);
        assert_eq!(cli.timeout, 43_200);
    }

    #[test]
    fn test_cli_requires_platform_task_model() {
        assert!(Cli::try_parse_from(["gpu-jobs", "--task", "train", "--model", "m"]).is_err());
        assert!(Cli::try_parse_from(["gpu-jobs", "--platform", "paperspace", "--model", "m"]).is_err());
        assert!(Cli::try_parse_from(["gpu-jobs", "--platform", "paperspace", "--task", "train"]).is_err());
        assert!(Cli::try_parse_from([
            "gpu-jobs", "--platform", "colab", "--task", "train", "--model", "m"
        ])
        .is_err());
    }

    #[test]
    fn test_zero_timeout_waits_indefinitely() {
        let cli = Cli::try_parse_from([
            "gpu-jobs",
            "--platform",
            "paperspace",
            "--task",
            "finetune",
            "--model",
            "m",
            "--timeout",
            "0",
            "--poll-interval",
            "5",
            "--check-credits",
        ])
        .unwrap();

        let config = build_config(&cli);
        assert!(cli.check_credits);
        assert_eq!(config.poll.timeout, None);
        assert_eq!(config.poll.interval, Duration::from_secs(5));
    }
}
