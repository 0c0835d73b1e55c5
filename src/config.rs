//! Runtime configuration.

use chrono::TimeDelta;
use clap::Parser;
use std::path::PathBuf;

/// Tunables for settlement operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    /// Time a driver has to pay a deferred commission.
    pub penalty_grace: TimeDelta,
    /// Lifetime of a freshly issued QR payment token.
    pub token_ttl: TimeDelta,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            penalty_grace: TimeDelta::hours(24),
            token_ttl: TimeDelta::minutes(15),
        }
    }
}

/// Apply ride settlement commands and print the resulting accounts.
#[derive(Parser, Debug)]
#[command(name = "ridepay", version, about, long_about = None)]
pub struct Cli {
    /// CSV file of settlement commands.
    pub input: PathBuf,

    /// Hours a driver has to pay a deferred commission.
    #[arg(long, env = "RIDEPAY_PENALTY_GRACE_HOURS", default_value_t = 24)]
    pub penalty_grace_hours: u32,

    /// Minutes an issued QR payment token stays valid.
    #[arg(long, env = "RIDEPAY_TOKEN_TTL_MINUTES", default_value_t = 15)]
    pub token_ttl_minutes: u32,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "warn")]
    pub log: String,
}

impl Cli {
    pub fn settlement_config(&self) -> SettlementConfig {
        SettlementConfig {
            penalty_grace: TimeDelta::hours(self.penalty_grace_hours.into()),
            token_ttl: TimeDelta::minutes(self.token_ttl_minutes.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_settlement_policy() {
        let cli = Cli::try_parse_from(["ridepay", "rides.csv"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("rides.csv"));
        assert_eq!(cli.log, "warn");
        assert_eq!(cli.settlement_config(), SettlementConfig::default());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "ridepay",
            "rides.csv",
            "--penalty-grace-hours",
            "48",
            "--token-ttl-minutes",
            "5",
        ])
        .unwrap();
        let config = cli.settlement_config();
        assert_eq!(config.penalty_grace, TimeDelta::hours(48));
        assert_eq!(config.token_ttl, TimeDelta::minutes(5));
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["ridepay"]).is_err());
    }
}
