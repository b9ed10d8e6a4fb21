use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Tollgate LLM gateway
#[derive(Debug, Parser)]
#[command(
    name = "tollgate",
    about = "OpenAI-compatible gateway with key resolution, rate limiting and cost tracking"
)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "tollgate.toml", env = "TOLLGATE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "TOLLGATE_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter, in `RUST_LOG` syntax
    #[arg(long, default_value = "info", env = "TOLLGATE_LOG")]
    pub log: String,
}
