// leadsync CLI - push lead lists to the platform and reconcile results

mod csv_input;
mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use leadsync_client::{delete_auth, save_auth, Credentials, RestClient};
use leadsync_engine::{run_bulk, run_single, FieldMap, RunReport, SyncConfig};

/// Error carrying its exit code; printed on stderr before exiting.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Parser)]
#[command(name = "leadsync")]
#[command(about = "Push lead lists to the platform and reconcile per-lead results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk create or update leads from a CSV file
    #[command(after_help = "\
Examples:
  leadsync push leads.csv
  leadsync push leads.csv --partition 3 --resolve-duplicates
  leadsync push leads.csv --failed-out failed.csv
  leadsync push leads.csv --json | jq .summary")]
    Push {
        /// CSV file with a header row of platform field names
        file: PathBuf,

        /// Config file (TOML); defaults apply when absent
        #[arg(long, default_value = "leadsync.toml")]
        config: PathBuf,

        /// Partition to create leads in (overrides config)
        #[arg(long)]
        partition: Option<i64>,

        /// Resolve ambiguous duplicates by updating the most recent match
        #[arg(long)]
        resolve_duplicates: bool,

        /// Write failed rows, in their original CSV shape, to this file
        #[arg(long)]
        failed_out: Option<PathBuf>,

        /// Print the full report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Create or update a single lead
    #[command(after_help = "\
Examples:
  leadsync push-one --field email=ann@example.com --field firstName=Ann
  leadsync push-one --field email=ann@example.com --resolve-duplicates")]
    PushOne {
        /// Field values as name=value pairs (repeatable)
        #[arg(long = "field", value_name = "NAME=VALUE", required = true)]
        fields: Vec<String>,

        /// Config file (TOML); defaults apply when absent
        #[arg(long, default_value = "leadsync.toml")]
        config: PathBuf,

        /// Partition to create the lead in (overrides config)
        #[arg(long)]
        partition: Option<i64>,

        /// Resolve an ambiguous duplicate by updating the most recent match
        #[arg(long)]
        resolve_duplicates: bool,

        /// Print the full report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Save platform credentials for later commands
    Login {
        /// Platform REST base URL
        #[arg(long)]
        api_base: String,

        /// OAuth client id
        #[arg(long)]
        client_id: String,

        /// OAuth client secret (or LEADSYNC_CLIENT_SECRET env)
        #[arg(long, env = "LEADSYNC_CLIENT_SECRET")]
        client_secret: String,
    },

    /// Delete saved credentials
    Logout,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Push {
            file,
            config,
            partition,
            resolve_duplicates,
            failed_out,
            json,
        } => cmd_push(&file, &config, partition, resolve_duplicates, failed_out, json),
        Commands::PushOne {
            fields,
            config,
            partition,
            resolve_duplicates,
            json,
        } => cmd_push_one(&fields, &config, partition, resolve_duplicates, json),
        Commands::Login {
            api_base,
            client_id,
            client_secret,
        } => cmd_login(api_base, client_id, client_secret),
        Commands::Logout => cmd_logout(),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(err.code)
        }
    }
}

// ── Commands ────────────────────────────────────────────────────────

fn cmd_push(
    file: &Path,
    config_path: &Path,
    partition: Option<i64>,
    resolve_duplicates: bool,
    failed_out: Option<PathBuf>,
    json: bool,
) -> Result<u8, CliError> {
    let config = load_config(config_path, partition, resolve_duplicates)?;

    let text = std::fs::read_to_string(file).map_err(|e| CliError {
        code: exit_codes::EXIT_USAGE,
        message: format!("cannot read {}: {e}", file.display()),
        hint: None,
    })?;
    let (leads, sidecar) = csv_input::parse_leads(&text)?;

    let client = platform_client(&config)?;
    let report = run_bulk(&config, &leads, Some(&sidecar), &client).map_err(engine_error)?;

    if let Some(out) = failed_out {
        write_failed_export(&out, &report)?;
    }
    render_report(&report, json)?;

    Ok(exit_codes::for_status(report.status))
}

fn cmd_push_one(
    fields: &[String],
    config_path: &Path,
    partition: Option<i64>,
    resolve_duplicates: bool,
    json: bool,
) -> Result<u8, CliError> {
    let config = load_config(config_path, partition, resolve_duplicates)?;
    let lead = parse_fields(fields)?;

    let client = platform_client(&config)?;
    let report = run_single(&config, &lead, &client).map_err(engine_error)?;

    render_report(&report, json)?;
    Ok(exit_codes::for_status(report.status))
}

fn cmd_login(api_base: String, client_id: String, client_secret: String) -> Result<u8, CliError> {
    let creds = Credentials::new(api_base, client_id, client_secret);
    save_auth(&creds).map_err(|message| CliError {
        code: exit_codes::EXIT_ERROR,
        message,
        hint: None,
    })?;
    eprintln!("credentials saved");
    Ok(exit_codes::EXIT_SUCCESS)
}

fn cmd_logout() -> Result<u8, CliError> {
    delete_auth().map_err(|message| CliError {
        code: exit_codes::EXIT_ERROR,
        message,
        hint: None,
    })?;
    eprintln!("credentials deleted");
    Ok(exit_codes::EXIT_SUCCESS)
}

// ── Helpers ─────────────────────────────────────────────────────────

fn engine_error(e: leadsync_engine::SyncError) -> CliError {
    CliError {
        code: exit_codes::EXIT_ERROR,
        message: e.to_string(),
        hint: None,
    }
}

/// Load the TOML config when the file exists, otherwise start from
/// defaults; command-line flags win either way.
fn load_config(
    path: &Path,
    partition: Option<i64>,
    resolve_duplicates: bool,
) -> Result<SyncConfig, CliError> {
    let mut config = if path.exists() {
        let text = std::fs::read_to_string(path).map_err(|e| CliError {
            code: exit_codes::EXIT_USAGE,
            message: format!("cannot read {}: {e}", path.display()),
            hint: None,
        })?;
        SyncConfig::from_toml(&text).map_err(|e| CliError {
            code: exit_codes::EXIT_USAGE,
            message: format!("{}: {e}", path.display()),
            hint: None,
        })?
    } else {
        SyncConfig::default()
    };

    if let Some(partition) = partition {
        config.partition_id = partition;
    }
    if resolve_duplicates {
        config.update_most_recent_match = true;
    }
    Ok(config)
}

fn platform_client(config: &SyncConfig) -> Result<RestClient, CliError> {
    let client = RestClient::from_saved_auth().map_err(|e| CliError {
        code: exit_codes::EXIT_NOT_AUTH,
        message: e.to_string(),
        hint: Some("run `leadsync login --api-base ... --client-id ... --client-secret ...`".into()),
    })?;
    Ok(client
        .with_chunk_size(config.chunk_size)
        .with_lookup_field(config.key_field.clone()))
}

fn parse_fields(fields: &[String]) -> Result<FieldMap, CliError> {
    let mut lead = FieldMap::new();
    for field in fields {
        let Some((name, value)) = field.split_once('=') else {
            return Err(CliError {
                code: exit_codes::EXIT_USAGE,
                message: format!("invalid --field '{field}'"),
                hint: Some("expected NAME=VALUE, e.g. --field email=ann@example.com".into()),
            });
        };
        lead.insert(name.to_string(), value.into());
    }
    Ok(lead)
}

fn write_failed_export(path: &Path, report: &RunReport) -> Result<(), CliError> {
    let Some(export) = &report.failed_export else {
        return Ok(());
    };
    std::fs::write(path, export).map_err(|e| CliError {
        code: exit_codes::EXIT_ERROR,
        message: format!("cannot write {}: {e}", path.display()),
        hint: None,
    })?;
    eprintln!("wrote failed rows to {}", path.display());
    Ok(())
}

fn render_report(report: &RunReport, json: bool) -> Result<(), CliError> {
    if json {
        let body = serde_json::to_string_pretty(report).map_err(|e| CliError {
            code: exit_codes::EXIT_ERROR,
            message: format!("cannot serialize report: {e}"),
            hint: None,
        })?;
        println!("{body}");
        return Ok(());
    }

    println!("{}: {}", report.status, report.message);
    let s = &report.summary;
    println!(
        "passed: {}  duplicates: {}  failed: {}  total: {}",
        s.passed, s.duplicates, s.failed, s.total
    );
    for entry in &report.duplicates {
        println!("duplicate: {} ({})", lead_label(&entry.lead), entry.message);
    }
    for entry in &report.failed {
        println!("failed: {} ({})", lead_label(&entry.lead), entry.message);
    }
    Ok(())
}

/// Something readable to name a lead by in terminal output.
fn lead_label(lead: &FieldMap) -> String {
    lead.get("email")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            lead.values()
                .next()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(empty lead)".into())
        })
}
