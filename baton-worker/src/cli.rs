use baton_core::LeaseKeys;
use baton_store::StoreConfig;
use baton_worker::WorkerConfig;
use clap::{ArgAction, Parser};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "baton", version, about, long_about = None)]
pub struct Cli {
    /// Print and clear the recorded failed messages, then exit
    #[arg(long)]
    pub get_errors: bool,

    /// Print the error report as JSON (with --get-errors)
    #[arg(long, requires = "get_errors")]
    pub json: bool,

    /// Redis connection URL
    #[arg(long, env = "BATON_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Maximum number of idle pooled connections
    #[arg(long, default_value_t = 5)]
    pub max_idle: usize,

    /// Lease time-to-live in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub lease_ttl_ms: u64,

    /// Chance that a consumed message is recorded as failed
    #[arg(long, default_value_t = 0.05)]
    pub failure_probability: f64,

    /// Seed for payloads and failure injection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Prefix for the lease, queue and error keys
    #[arg(long)]
    pub namespace: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Verbose mode (-v, -vv)
    #[arg(short, action = ArgAction::Count)]
    pub verbosity: u8,
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.redis_url.clone()).with_max_idle(self.max_idle)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        let keys = match &self.namespace {
            Some(namespace) => LeaseKeys::with_namespace(namespace),
            None => LeaseKeys::default(),
        };

        let config = WorkerConfig::default()
            .with_lease_ttl(Duration::from_millis(self.lease_ttl_ms))
            .with_failure_probability(self.failure_probability)
            .with_keys(keys);

        match self.seed {
            Some(seed) => config.with_randomization_seed(seed),
            None => config,
        }
    }

    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_select_run_mode() {
        let cli = Cli::try_parse_from(["baton"]).unwrap();
        assert!(!cli.get_errors);
        assert_eq!(cli.log_filter(), "info");

        let config = cli.worker_config();
        assert_eq!(config.lease_ttl, Duration::from_millis(2000));
        assert_eq!(config.keys, LeaseKeys::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_diagnostic_mode_flags() {
        let cli = Cli::try_parse_from(["baton", "--get-errors", "--json", "-vv"]).unwrap();
        assert!(cli.get_errors);
        assert!(cli.json);
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn test_json_requires_diagnostic_mode() {
        assert!(Cli::try_parse_from(["baton", "--json"]).is_err());
    }

    #[test]
    fn test_tuning_flags_reach_configs() {
        let cli = Cli::try_parse_from([
            "baton",
            "--lease-ttl-ms",
            "500",
            "--seed",
            "9",
            "--namespace",
            "jobs",
            "--max-idle",
            "2",
        ])
        .unwrap();

        let config = cli.worker_config();
        assert_eq!(config.renew_interval(), Duration::from_millis(250));
        assert_eq!(config.randomization_seed, Some(9));
        assert_eq!(config.keys.lease, "jobs:MAIN_KEY");
        assert_eq!(cli.store_config().max_idle, 2);
    }
}
