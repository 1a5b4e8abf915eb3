//! Command-line interface definition.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use regdesk::api::types::PaymentStatus;
use regdesk::config::ConsoleConfig;
use std::path::PathBuf;

/// Admin console for the Vanam event-registration backend.
#[derive(Parser, Debug)]
#[command(name = "regdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the registration backend.
    #[arg(long, env = "REGDESK_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Path to the credentials file.
    #[arg(long, env = "REGDESK_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Console operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a token against the backend and store the session.
    Login {
        /// Bearer token issued by the backend login.
        #[arg(long, env = "REGDESK_TOKEN")]
        token: String,
    },

    /// Clear the stored session.
    Logout,

    /// List registrations, with optional filters.
    List {
        /// Only registrations from this college.
        #[arg(long)]
        college: Option<String>,

        /// Only registrations with this payment status.
        #[arg(long, value_enum)]
        status: Option<CliPaymentStatus>,

        /// Only registrations on or after this date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Only registrations on or before this date (YYYY-MM-DD).
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,

        /// Free-text search over name, email, phone, college, and company.
        #[arg(long)]
        search: Option<String>,
    },

    /// Accept a registration (mark its payment as paid).
    Accept {
        /// Registration id.
        id: String,

        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Reject a registration (mark its payment as failed).
    Reject {
        /// Registration id.
        id: String,

        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Refund a registration's payment.
    Refund {
        /// Registration id.
        id: String,

        /// Skip the confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Check payment status for one or more registrations, polling until
    /// each settles or the attempt budget runs out.
    Status {
        /// Registration ids to check.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Poll the backend even if this process already confirmed the id.
        #[arg(long)]
        recheck: bool,
    },
}

/// Payment status CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliPaymentStatus {
    /// Payment still pending.
    Pending,
    /// Payment confirmed.
    Paid,
    /// Payment failed.
    Failed,
    /// Payment refunded.
    Refunded,
}

impl From<CliPaymentStatus> for PaymentStatus {
    fn from(s: CliPaymentStatus) -> Self {
        match s {
            CliPaymentStatus::Pending => PaymentStatus::Pending,
            CliPaymentStatus::Paid => PaymentStatus::Paid,
            CliPaymentStatus::Failed => PaymentStatus::Failed,
            CliPaymentStatus::Refunded => PaymentStatus::Refunded,
        }
    }
}

impl Cli {
    /// Build the console configuration from defaults, an optional config
    /// file, and CLI overrides, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<ConsoleConfig> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            ConsoleConfig::from_file(path)?
        } else {
            ConsoleConfig::default()
        };

        // Override with CLI arguments
        if let Some(ref backend_url) = self.backend_url {
            config.backend_url = backend_url.clone();
        }
        if let Some(ref credentials) = self.credentials {
            config.credentials_path = Some(credentials.clone());
        }
        config.log_level = self.log_level.clone();

        Ok(config)
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}
