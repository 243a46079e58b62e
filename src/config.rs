//! Server configuration from flags and environment

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "action-log")]
#[command(about = "Action Log server - approval workflows with time-bounded delegation")]
#[command(version)]
pub struct ServerConfig {
    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:action_log.db")]
    pub database_url: String,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: SocketAddr,

    /// Seconds between expired-delegation sweeps; 0 disables the periodic sweep
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,
}

impl ServerConfig {
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}
