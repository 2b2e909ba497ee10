use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use fire_tracker::api::{MetricsArgs, ProjectionArgs, run_http_server, run_metrics, run_projection};

#[derive(Parser, Debug)]
#[command(
    name = "fire_tracker",
    about = "FIRE projections, dividend yields and net worth doubling time"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print point-in-time FIRE metrics as JSON
    Metrics(MetricsArgs),
    /// Print a bear/base/bull projection as JSON
    Project(ProjectionArgs),
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Serialization error: {e}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),
        Command::Metrics(args) => run_metrics(args).map(|response| print_json(&response)),
        Command::Project(args) => run_projection(args).map(|result| print_json(&result)),
    };

    if let Err(e) = outcome {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
