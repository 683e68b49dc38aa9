use clap::Parser;
use std::collections::HashSet;

use crate::rate_limit::FailPolicy;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "items-gateway")]
#[command(about = "Rate limited API gateway with an items CRUD service")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080, env = "PORT")]
    pub port: u16,

    // Sqlite database URL
    #[arg(short, long, default_value = "sqlite://items.db", env = "DATABASE_URL")]
    pub database_url: String,

    // Redis URL for the counter store (in-process store when unset)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    // Public route: max requests per window
    #[arg(long, default_value_t = 10)]
    pub public_limit: u32,

    // Public route: window in seconds
    #[arg(long, default_value_t = 60)]
    pub public_window: u64,

    // Private route: max requests per window
    #[arg(long, default_value_t = 5)]
    pub private_limit: u32,

    // Private route: window in seconds
    #[arg(long, default_value_t = 60)]
    pub private_window: u64,

    // API keys accepted on /private (comma-separated)
    #[arg(long, default_value = "key123,key456", env = "API_KEYS")]
    pub api_keys: String,

    // What to do when the counter store is unreachable
    #[arg(long, value_enum, default_value = "closed")]
    pub on_store_error: FailPolicy,

    // Counter store timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub store_timeout_ms: u64,
}

impl Args {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.public_limit > 0 && self.private_limit > 0,
            "rate limits must be positive"
        );
        anyhow::ensure!(
            self.public_window > 0 && self.private_window > 0,
            "rate windows must be positive"
        );
        anyhow::ensure!(self.store_timeout_ms > 0, "store timeout must be positive");
        Ok(())
    }

    // Parse the comma-separated allow-set, dropping empty entries
    pub fn allowed_keys(&self) -> HashSet<String> {
        self.api_keys
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}
