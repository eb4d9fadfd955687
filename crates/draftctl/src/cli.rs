// crates/draftctl/src/cli.rs

use clap::{builder::ValueHint, Args, Parser, Subcommand};
use domain::{ContentType, Fields, StepValidator, ValidationReport};
use engine::DraftSession;
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use store::{ContentId, ContentStore, JsonDirStore};
use tracing::{debug, error};

use crate::error::{CliError, Result};
use crate::{script, settings};

/// Entry point for the draftctl binary
#[tokio::main]
#[tracing::instrument(skip_all)]
pub async fn start() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(ref cmd) => do_run(&cli, cmd).await,
        Commands::Show(ref cmd) => do_show(&cli, cmd).await,
        Commands::Validate(ref cmd) => do_validate(cmd),
    };

    result.unwrap_or_else(|e| {
        error!("draftctl failed: {}", e);
        eprintln!("error: {e}");
        ExitCode::FAILURE
    })
}

#[derive(Parser, Debug)]
#[command(name = "draftctl", version, about = "Content draft workflow tool")]
pub struct Cli {
    /// Settings file (missing file means defaults)
    #[arg(
        long,
        global = true,
        env = "DRAFTCTL_CONFIG",
        default_value = "draftctl.toml",
        value_hint = ValueHint::FilePath
    )]
    pub config: PathBuf,

    /// Override the record directory from settings
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON script against a new draft session
    Run(RunCmd),
    /// Print a stored record
    Show(ShowCmd),
    /// Validate a JSON object of fields
    Validate(ValidateCmd),
}

#[derive(Args, Debug)]
pub struct RunCmd {
    #[arg(value_name = "SCRIPT", value_hint = ValueHint::FilePath)]
    pub script: PathBuf,

    /// Stop at the first failing step and exit non-zero
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ShowCmd {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ValidateCmd {
    /// Content type: promotion, job or event
    #[arg(long = "type", value_name = "TYPE")]
    pub kind: String,

    /// Wizard step to validate
    #[arg(long, conflicts_with = "all")]
    pub step: Option<u8>,

    /// Run the full pre-publish check
    #[arg(long)]
    pub all: bool,

    #[arg(value_name = "DATA", value_hint = ValueHint::FilePath)]
    pub data: PathBuf,
}

fn open_store(cli: &Cli) -> Result<(JsonDirStore, domain::setting::Settings)> {
    let mut settings = settings::load(&cli.config)?;
    if let Some(dir) = &cli.store_dir {
        settings.store.dir = dir.clone();
    }
    debug!(dir = %settings.store.dir.display(), "using record directory");
    Ok((JsonDirStore::new(settings.store.dir.clone()), settings))
}

#[tracing::instrument(skip_all)]
async fn do_run(cli: &Cli, cmd: &RunCmd) -> Result<ExitCode> {
    let (store, settings) = open_store(cli)?;
    let steps = script::load(&cmd.script).map_err(CliError::Script)?;

    let session = DraftSession::new(Arc::new(store), StepValidator::default(), &settings.autosave);
    let outcomes = script::replay(&session, steps, cmd.strict).await;
    session.close().await;

    for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
        eprintln!(
            "step {} ({}) failed: {}",
            outcome.index,
            outcome.op,
            outcome.error.as_deref().unwrap_or_default()
        );
    }
    println!("{}", serde_json::to_string_pretty(&session.state())?);

    let failed = outcomes.iter().any(|o| !o.is_ok());
    Ok(if cmd.strict && failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[tracing::instrument(skip_all, fields(id = %cmd.id))]
async fn do_show(cli: &Cli, cmd: &ShowCmd) -> Result<ExitCode> {
    let (store, _) = open_store(cli)?;
    let record = store
        .find_by_id(&ContentId::new(cmd.id.clone()))
        .await?
        .ok_or_else(|| CliError::NotFound(cmd.id.clone()))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(ExitCode::SUCCESS)
}

#[tracing::instrument(skip_all)]
fn do_validate(cmd: &ValidateCmd) -> Result<ExitCode> {
    let text = std::fs::read_to_string(&cmd.data)?;
    let data: Fields = match serde_json::from_str(&text)? {
        serde_json::Value::Object(map) => map,
        _ => return Err(CliError::NotAnObject(cmd.data.display().to_string())),
    };

    let report = validate(cmd, &StepValidator::default(), &data)?;
    if report.is_valid() {
        println!("valid");
        return Ok(ExitCode::SUCCESS);
    }
    for err in report.errors() {
        println!("{}: {}", err.field, err.message);
    }
    Ok(ExitCode::from(1))
}

fn validate(cmd: &ValidateCmd, validator: &StepValidator, data: &Fields) -> Result<ValidationReport> {
    if cmd.all {
        let kind: ContentType = cmd.kind.parse()?;
        return Ok(validator.validate_all(kind, data));
    }
    let step = cmd.step.ok_or(CliError::MissingStep)?;
    Ok(validator.validate_tagged(&cmd.kind, step, data))
}
