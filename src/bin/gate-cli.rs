use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;

use token_gate::auth::Gate;
use token_gate::config::{load_config, SecurityConfig};
use token_gate::keys::KeySource;
use token_gate::precompute::build_snapshot;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Management CLI for the token gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gate liveness
    Status {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Verify a token offline against a local JWKS file
    Check {
        /// The bearer token to verify
        token: String,

        /// Path to the JWKS file with the trusted keys
        #[arg(short, long)]
        jwks: PathBuf,

        /// Trusted issuer (repeatable)
        #[arg(short, long, required = true)]
        issuer: Vec<String>,

        /// Clock skew tolerance in seconds
        #[arg(long, default_value_t = 30)]
        skew: u64,
    },
    /// Run the precompute build pass and write the startup snapshot
    Snapshot {
        /// Path to the gate configuration file
        #[arg(short, long, default_value = "gate.toml")]
        config: PathBuf,

        /// Output path; defaults to precompute.snapshot_path from the config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Status { url } => {
            let res = reqwest::get(format!("{}/healthz", url)).await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: gate returned status {}", status);
                std::process::exit(1);
            }
            let json: Value = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Check {
            token,
            jwks,
            issuer,
            skew,
        } => {
            let keys = Arc::new(KeySource::from_file(&jwks)?);
            let security = SecurityConfig {
                allowed_issuers: issuer,
                clock_skew_tolerance_secs: skew,
                ..Default::default()
            };
            let gate = Gate::new(keys, &security);

            match gate.verify(&token).await {
                Ok(authorized) => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "verdict": "authorized",
                            "subject": authorized.subject,
                            "issuer": authorized.issuer,
                            "exp": authorized.claims.exp,
                        }))?
                    );
                }
                Err(e) => {
                    eprintln!("rejected: {} ({})", e, e.reason());
                    std::process::exit(1);
                }
            }
        }
        Commands::Snapshot { config, output } => {
            let config = load_config(&config)?;
            let snapshot = build_snapshot(&config).await?;

            let path = output
                .or_else(|| config.precompute.snapshot_path.as_ref().map(PathBuf::from))
                .ok_or("no output path: pass --output or set precompute.snapshot_path")?;

            snapshot.save(Path::new(&path))?;
            println!(
                "snapshot written to {} ({} entries)",
                path.display(),
                snapshot.entries.len()
            );
        }
    }

    Ok(())
}
