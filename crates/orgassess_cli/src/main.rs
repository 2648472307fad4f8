//! Command-line front end for assessment sessions.
//!
//! # Responsibility
//! - Resolve configuration from file, environment and flags.
//! - Dispatch one subcommand to `orgassess_api` and print its JSON envelope.
//!
//! Exit code is non-zero whenever the envelope reports `ok=false`.

use clap::{Args, Parser, Subcommand};
use orgassess_api::{self as api, ApiContext, ApiResponse};
use orgassess_core::{
    init_logging_from_config, CatalogImport, CoreConfig, GuestDetails, OwnerRef, PendingResponse,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "orgassess", about = "Organizational self-assessment sessions")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file; environment values are ignored when set
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import tools, domains, categories and criteria from a JSON file
    ImportCatalog { file: PathBuf },
    /// List tools
    Tools,
    /// Start an assessment
    Start {
        tool_id: i64,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Record one answer (100=yes, 0=no, 50=na)
    Respond {
        assessment_id: String,
        criterion_id: i64,
        value: i64,
        #[arg(long)]
        note: Option<String>,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Save pending answers and move the assessment to draft
    SaveExit {
        assessment_id: String,
        /// Pending answer as `criterion=value`; an empty value is skipped
        #[arg(long = "response", value_parser = parse_pending_response)]
        responses: Vec<PendingResponse>,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Submit an assessment
    Submit {
        assessment_id: String,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Show the score report
    Results {
        assessment_id: String,
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// List the owner's assessments
    Assessments {
        #[command(flatten)]
        owner: OwnerArgs,
    },
    /// Show the assessment a guest session can resume
    GuestResume { session_token: String },
    /// Update guest contact details
    GuestUpdate {
        session_token: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        organization: Option<String>,
    },
    /// List report templates, or show one by id
    Templates { template_id: Option<String> },
    /// Print core version
    Version,
}

#[derive(Args)]
struct OwnerArgs {
    /// Acting user id
    #[arg(long, conflicts_with = "guest", required_unless_present = "guest")]
    user: Option<String>,

    /// Acting guest session token
    #[arg(long)]
    guest: Option<String>,
}

impl OwnerArgs {
    fn owner(&self) -> OwnerRef {
        match (&self.user, &self.guest) {
            (Some(user), _) => OwnerRef::user(user.as_str()),
            (None, Some(guest)) => OwnerRef::guest(guest.as_str()),
            (None, None) => OwnerRef::guest(""),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    let ctx = ApiContext::from_config(&config);
    match cli.command {
        Commands::ImportCatalog { file } => match read_catalog(&file) {
            Ok(import) => print_envelope(api::catalog_import(&ctx, &import)),
            Err(err) => {
                eprintln!("{err}");
                ExitCode::FAILURE
            }
        },
        Commands::Tools => print_envelope(api::tools_index(&ctx)),
        Commands::Start { tool_id, owner } => {
            print_envelope(api::assessment_start(&ctx, &owner.owner(), tool_id))
        }
        Commands::Respond {
            assessment_id,
            criterion_id,
            value,
            note,
            owner,
        } => print_envelope(api::assessment_response(
            &ctx,
            &owner.owner(),
            &assessment_id,
            criterion_id,
            value,
            note,
        )),
        Commands::SaveExit {
            assessment_id,
            responses,
            owner,
        } => print_envelope(api::assessment_save_and_exit(
            &ctx,
            &owner.owner(),
            &assessment_id,
            &responses,
        )),
        Commands::Submit {
            assessment_id,
            owner,
        } => print_envelope(api::assessment_submit(&ctx, &owner.owner(), &assessment_id)),
        Commands::Results {
            assessment_id,
            owner,
        } => print_envelope(api::assessment_results(&ctx, &owner.owner(), &assessment_id)),
        Commands::Assessments { owner } => {
            print_envelope(api::assessments_index(&ctx, &owner.owner()))
        }
        Commands::GuestResume { session_token } => {
            print_envelope(api::guest_session_resume(&ctx, &session_token))
        }
        Commands::GuestUpdate {
            session_token,
            name,
            email,
            organization,
        } => print_envelope(api::guest_session_update(
            &ctx,
            &session_token,
            &GuestDetails {
                name,
                email,
                organization,
            },
        )),
        Commands::Templates { template_id: None } => print_envelope(api::report_templates()),
        Commands::Templates {
            template_id: Some(template_id),
        } => print_envelope(api::report_template(&template_id)),
        Commands::Version => {
            println!("orgassess_core version={}", api::core_version());
            ExitCode::SUCCESS
        }
    }
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig, String> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::from_json_file(path).map_err(|err| err.to_string())?,
        None => CoreConfig::from_env(),
    };
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    Ok(config)
}

fn read_catalog(path: &Path) -> Result<CatalogImport, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read catalog `{}`: {err}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|err| format!("invalid catalog `{}`: {err}", path.display()))
}

fn parse_pending_response(raw: &str) -> Result<PendingResponse, String> {
    let (criterion, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `criterion=value`, got `{raw}`"))?;
    let criterion_id = criterion
        .trim()
        .parse::<i64>()
        .map_err(|err| format!("invalid criterion id `{criterion}`: {err}"))?;
    let value = value.trim();
    let raw_value = if value.is_empty() {
        None
    } else {
        Some(
            value
                .parse::<i64>()
                .map_err(|err| format!("invalid response value `{value}`: {err}"))?,
        )
    };
    Ok(PendingResponse {
        criterion_id,
        raw_value,
        note: None,
    })
}

fn print_envelope<T: Serialize>(response: ApiResponse<T>) -> ExitCode {
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("failed to encode response: {err}");
            return ExitCode::FAILURE;
        }
    }
    if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
