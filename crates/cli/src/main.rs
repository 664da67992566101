mod invocations;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use lambda_inspector_server::{ConfigOverrides, ServerConfig};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Lambda invocation inspector.
#[derive(Parser)]
#[command(
    name = "lambda-inspector",
    version,
    about = "Lambda invocation inspector and dashboard WebSocket proxy"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the inspector HTTP API and WebSocket proxy
    Serve {
        /// Interface to bind [env: LAMBDA_INSPECTOR_HOST] [default: 127.0.0.1]
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on [env: LAMBDA_INSPECTOR_PORT] [default: 4599]
        #[arg(long)]
        port: Option<u16>,
        /// Route prefix for every endpoint [env: LAMBDA_INSPECTOR_MOUNT]
        #[arg(long)]
        mount: Option<String>,
        /// Base ws:// or wss:// URL proxied sessions connect to [env: LAMBDA_INSPECTOR_WS_FORWARD]
        #[arg(long)]
        ws_forward: Option<String>,
        /// Execution backend for POST /invoke [env: LAMBDA_INSPECTOR_EXECUTOR_URL]
        #[arg(long)]
        executor_url: Option<String>,
        /// Keep at most this many invocations [env: LAMBDA_INSPECTOR_MAX_INVOCATIONS]
        #[arg(long)]
        max_invocations: Option<usize>,
    },

    /// List invocations recorded by a running inspector
    Invocations {
        /// Inspector base URL, including the mount point
        #[arg(long, default_value = invocations::DEFAULT_ENDPOINT)]
        endpoint: String,
        /// Only show functions whose ARN contains this text (case-insensitive)
        #[arg(long)]
        arn_contains: Option<String>,
        /// Show at most this many, newest first
        #[arg(long)]
        last: Option<usize>,
        /// Output format (text or json)
        #[arg(long, default_value = "text", value_enum)]
        output: OutputFormat,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            mount,
            ws_forward,
            executor_url,
            max_invocations,
        } => {
            let overrides = ConfigOverrides {
                host,
                port,
                mount,
                ws_forward,
                executor_url,
                max_invocations,
            };
            cmd_serve(overrides);
        }
        Commands::Invocations {
            endpoint,
            arn_contains,
            last,
            output,
        } => {
            let options = invocations::ListOptions {
                arn_contains: arn_contains.as_deref(),
                last,
            };
            if let Err(e) = invocations::cmd_invocations(&endpoint, &options, output) {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default `info` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_serve(overrides: ConfigOverrides) {
    let config = match ServerConfig::resolve(overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(lambda_inspector_server::start_server(config)) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
