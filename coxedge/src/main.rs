use clap::{Parser, Subcommand};
use coxedge::tasks::{TaskId, TaskResolver, TaskStatusSource};
use coxedge::{Context, ProviderConfig};
use serde_json::{Map, Value};

/// Inspect and await Cox Edge asynchronous tasks
#[derive(Parser, Debug)]
#[command(name = "coxedge-tasks")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// API key (defaults to COXEDGE_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL (defaults to COXEDGE_BASE_URL, then the public portal)
    #[arg(long)]
    base_url: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure: bool,

    /// Log request and polling detail
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current status of a task
    Status { task_id: String },
    /// Poll a task until it succeeds or fails, then print its payload
    Await {
        task_id: String,

        /// Seconds between status checks
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

impl Args {
    fn provider_attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        if let Some(api_key) = &self.api_key {
            attrs.insert("api_key".to_string(), Value::from(api_key.as_str()));
        }
        if let Some(base_url) = &self.base_url {
            attrs.insert("base_url".to_string(), Value::from(base_url.as_str()));
        }
        if self.insecure {
            attrs.insert("insecure".to_string(), Value::Bool(true));
        }
        if let Command::Await {
            poll_interval,
            timeout,
            ..
        } = &self.command
        {
            if let Some(seconds) = poll_interval {
                attrs.insert("task_poll_interval_seconds".to_string(), Value::from(*seconds));
            }
            if let Some(seconds) = timeout {
                attrs.insert("task_timeout_seconds".to_string(), Value::from(*seconds));
            }
        }
        attrs
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = ProviderConfig::from_attributes(&args.provider_attributes()).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    })?;
    let client = config.build_client()?;

    match args.command {
        Command::Status { task_id } => {
            let status = client.task_status(&TaskId::from(task_id)).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Await { task_id, .. } => {
            let ctx = Context::new();
            tokio::spawn({
                let ctx = ctx.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("Interrupted, cancelling");
                        ctx.cancel();
                    }
                }
            });

            let resolver = TaskResolver::with_config(client, config.await_config);
            let result = resolver.await_task(&ctx, &TaskId::from(task_id)).await?;
            println!("{}", serde_json::to_string_pretty(&result.data)?);
        }
    }

    Ok(())
}
