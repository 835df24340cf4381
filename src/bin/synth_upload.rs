use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use synth_upload::app::{
    App, BatchCreateRequest, BatchResolveRequest, ResolveStatus, UploadRequest, synthesis_fields,
};
use synth_upload::catalog::{CatalogClient, CatalogHttpClient};
use synth_upload::config::{ConfigLoader, ResolvedConfig};
use synth_upload::domain::{MatchPolicy, Orcid, SynthesisType};
use synth_upload::error::SynthError;
use synth_upload::output::JsonOutput;
use synth_upload::schema::SheetLayout;
use synth_upload::sheets::{SheetMirror, SheetsHttpClient};

#[derive(Parser)]
#[command(name = "synth-upload")]
#[command(about = "Upload laboratory synthesis records to the sample catalog and review sheet")]
#[command(version, author)]
struct Cli {
    /// Path to synth-upload.json
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override the configured match policy
    #[arg(long, global = true, value_enum)]
    policy: Option<MatchPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Upload a JSON array of synthesis rows")]
    Upload(UploadArgs),
    #[command(about = "Resolve or create batches")]
    Batch(BatchArgs),
    #[command(about = "List the fields of every synthesis type")]
    Fields,
}

#[derive(Args)]
struct UploadArgs {
    /// JSON file holding an array of row objects
    rows: String,

    #[arg(long, value_enum)]
    synthesis_type: SynthesisType,

    #[arg(long)]
    project: String,

    #[arg(long, value_parser = parse_orcid)]
    orcid: String,

    /// Operator name written to the review sheet
    #[arg(long)]
    operator: String,

    #[arg(long)]
    email: Option<String>,

    /// Batch unique id or name; resolved before any row is uploaded
    #[arg(long)]
    batch: Option<String>,

    #[arg(long)]
    session: Option<String>,
}

#[derive(Args)]
struct BatchArgs {
    #[command(subcommand)]
    command: BatchCommand,
}

#[derive(Subcommand)]
enum BatchCommand {
    #[command(about = "Resolve a batch id or name to a unique id")]
    Resolve(ResolveArgs),
    #[command(about = "Create a new batch sample")]
    Create(CreateArgs),
}

#[derive(Args)]
struct ResolveArgs {
    identifier: String,

    #[arg(long, value_parser = parse_orcid)]
    orcid: String,

    #[arg(long)]
    project: String,
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    id: String,

    #[arg(long)]
    description: Option<String>,

    #[arg(long, value_parser = parse_orcid)]
    orcid: String,

    #[arg(long)]
    project: String,
}

fn parse_orcid(value: &str) -> Result<String, SynthError> {
    Orcid::parse_canonical(value).map(|orcid| orcid.to_string())
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SynthError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SynthError) -> u8 {
    match error {
        SynthError::InvalidSynthesisType(_)
        | SynthError::InvalidOrcid(_)
        | SynthError::InvalidRequest(_)
        | SynthError::InvalidRows(_)
        | SynthError::ConfigRead(_)
        | SynthError::ConfigParse(_)
        | SynthError::MissingSetting(_) => 2,
        SynthError::CatalogHttp(_)
        | SynthError::CatalogStatus { .. }
        | SynthError::CatalogResponse(_)
        | SynthError::SheetsHttp(_)
        | SynthError::SheetsStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Fields = cli.command {
        JsonOutput::print_fields(&synthesis_fields()).into_diagnostic()?;
        return Ok(());
    }

    let mut config = ConfigLoader::resolve(cli.config.as_deref())?;
    if let Some(policy) = cli.policy {
        config.match_policy = policy;
    }
    let catalog = CatalogHttpClient::new(&config.catalog_url, config.api_key()?)?;

    match cli.command {
        Commands::Upload(args) => run_upload(args, catalog, &config),
        Commands::Batch(args) => {
            let app = App::new(catalog, NopMirror, config.match_policy);
            run_batch(args, app)
        }
        Commands::Fields => Ok(()),
    }
}

fn run_upload(
    args: UploadArgs,
    catalog: CatalogHttpClient,
    config: &ResolvedConfig,
) -> miette::Result<()> {
    let sheets = config.sheets()?;
    let mirror = SheetsHttpClient::new(
        &sheets.base_url,
        &sheets.spreadsheet_id,
        &sheets.access_token,
    )?;
    let app = App::new(catalog, mirror, config.match_policy);

    let content = fs::read_to_string(&args.rows)
        .map_err(|err| SynthError::Filesystem(format!("{}: {err}", args.rows)))?;
    let data: Vec<Map<String, Value>> =
        serde_json::from_str(&content).map_err(|err| SynthError::InvalidRows(err.to_string()))?;

    let batch_id = match args.batch {
        Some(batch) => {
            let resolved = app.resolve_batch(&BatchResolveRequest {
                batch_id: batch,
                orcid: args.orcid.clone(),
                project: args.project.clone(),
            })?;
            if resolved.status != ResolveStatus::Resolved {
                JsonOutput::print_resolve(&resolved).into_diagnostic()?;
                return Err(
                    SynthError::InvalidRequest(resolved.message.unwrap_or_default()).into(),
                );
            }
            resolved.batch_id.map(|id| id.to_string())
        }
        None => None,
    };

    let response = app.upload(&UploadRequest {
        email: args.email,
        orcid: args.orcid,
        user_name: args.operator,
        project: args.project,
        synthesis_type: args.synthesis_type.label().to_string(),
        batch_id,
        data,
        session_name: args.session,
    })?;
    JsonOutput::print_upload(&response).into_diagnostic()?;
    Ok(())
}

fn run_batch<C: CatalogClient, M: SheetMirror>(
    args: BatchArgs,
    app: App<C, M>,
) -> miette::Result<()> {
    match args.command {
        BatchCommand::Resolve(args) => {
            let response = app.resolve_batch(&BatchResolveRequest {
                batch_id: args.identifier,
                orcid: args.orcid,
                project: args.project,
            })?;
            JsonOutput::print_resolve(&response).into_diagnostic()?;
        }
        BatchCommand::Create(args) => {
            let response = app.create_batch(&BatchCreateRequest {
                batch_name: args.name,
                batch_id: args.id,
                batch_description: args.description,
                orcid: args.orcid,
                project: args.project,
            })?;
            JsonOutput::print_create(&response).into_diagnostic()?;
        }
    }
    Ok(())
}

#[derive(Clone, Copy)]
struct NopMirror;

impl SheetMirror for NopMirror {
    fn append_row(&self, _layout: &SheetLayout, _values: &[String]) -> Result<(), SynthError> {
        Err(SynthError::MissingSetting("Google Sheets mirror".to_string()))
    }
}
