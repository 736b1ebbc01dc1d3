//! Command-line argument parsing for the StaySmart admin tool.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use staysmart::config::Config;
use staysmart::models::Role;
use std::path::PathBuf;

/// Administer a StaySmart database.
#[derive(Parser, Debug)]
#[command(name = "staysmart")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Database file or sqlite: URL (overrides STAYSMART_DATABASE and the config file)
    #[arg(short = 'd', long, value_name = "TARGET", global = true)]
    pub database: Option<String>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Create the database and apply migrations
    Init,

    /// Register a tenant or owner account
    Signup {
        #[arg(long, value_parser = parse_role)]
        role: Role,
        #[arg(long)]
        fullname: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        password: String,
    },

    /// Check a username and password
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Only accept accounts with this role
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
    },

    /// Print the owner dashboard figures
    Stats {
        #[arg(long)]
        owner: i64,
        /// Reference day (defaults to today)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },

    /// Print paid and pending rent for one month
    Earnings {
        #[arg(long)]
        owner: i64,
        #[arg(long)]
        year: i32,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Print the occupancy charts
    Occupancy {
        #[arg(long)]
        owner: i64,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
        #[arg(long, default_value_t = 4)]
        years_back: i64,
    },

    /// Age unpaid payments: promote upcoming ones to DUE and flag late ones OVERDUE
    Billing {
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
}

fn parse_role(s: &str) -> std::result::Result<Role, String> {
    Role::parse(s).ok_or_else(|| format!("Invalid role: {s}. Expected: tenant or owner"))
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}
