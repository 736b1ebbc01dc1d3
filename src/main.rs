//! StaySmart admin tool.

mod cli;

use chrono::{Datelike, Local, NaiveDate};
use cli::{Cli, Command};
use serde::Serialize;
use staysmart::auth::{self, LoginOutcome, SignupRequest};
use staysmart::config::Config;
use staysmart::error::{Result, StaySmartError};
use staysmart::logging;
use staysmart::persistence::{payments, stats};
use staysmart::StaySmartDb;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(&cli).await {
        error!("{}: {}", e.category(), e);
        if cli.log_file {
            eprintln!("{}: {}", e.category(), e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    info!("Database: {}", config.database.display_string());

    let db = StaySmartDb::open(&config).await?;
    let result = execute(&db, &config, &cli.command).await;
    db.close().await;
    result
}

/// Loads the config file and applies overrides:
/// 1. `--database` (highest)
/// 2. `STAYSMART_DATABASE`, including one set through `.env`
/// 3. The config file
/// 4. The platform default path
fn resolve_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    config.database.apply_env_overrides();
    if let Some(target) = &cli.database {
        config.database.set_target(target);
    }
    Ok(config)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| StaySmartError::internal(format!("Failed to render output: {e}")))?;
    println!("{text}");
    Ok(())
}

async fn execute(db: &StaySmartDb, config: &Config, command: &Command) -> Result<()> {
    match command {
        Command::Init => {
            println!("Database ready at {}", config.database.display_string());
        }
        Command::Signup {
            role,
            fullname,
            username,
            email,
            contact,
            password,
        } => {
            let request = SignupRequest {
                fullname: fullname.clone(),
                username: username.clone(),
                contact_no: contact.clone(),
                email: email.clone(),
                password: password.clone(),
            };
            let outcome = auth::signup(db, *role, &request).await?;
            if !outcome.success {
                return Err(StaySmartError::conflict(outcome.message));
            }
            print_json(&outcome)?;
        }
        Command::Login {
            username,
            password,
            role,
        } => {
            let outcome = match role {
                Some(role) => auth::login_as(db, *role, username, password).await?,
                None => auth::login(db, username, password).await?,
            };
            if let LoginOutcome::Failed { message } = outcome {
                return Err(StaySmartError::auth(message));
            }
            print_json(&outcome)?;
        }
        Command::Stats { owner, date } => {
            let stats = stats::owner_stats(db, *owner, date.unwrap_or_else(today)).await?;
            print_json(&stats)?;
        }
        Command::Earnings { owner, year, month } => {
            let summary = stats::monthly_earnings_summary(db, *owner, *year, *month).await?;
            print_json(&summary)?;
        }
        Command::Occupancy {
            owner,
            date,
            years_back,
        } => {
            let day = date.unwrap_or_else(today);
            let weekly = stats::occupancy_weekly(db, *owner, day).await?;
            let monthly = stats::occupancy_monthly(db, *owner, day.year()).await?;
            let (labels, values) = stats::occupancy_yearly(db, *owner, *years_back).await?;
            print_json(&serde_json::json!({
                "weekly": weekly,
                "monthly": monthly,
                "yearly": { "labels": labels, "values": values },
            }))?;
        }
        Command::Billing { date } => {
            let day = date.unwrap_or_else(today);
            let due = payments::mark_due_payments(db, day, config.billing.due_lead_days).await?;
            let overdue = payments::mark_overdue_payments(db, day).await?;
            print_json(&serde_json::json!({
                "date": day,
                "now_due": due,
                "now_overdue": overdue,
            }))?;
        }
    }
    Ok(())
}
