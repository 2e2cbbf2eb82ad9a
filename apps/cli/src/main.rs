//! Drift CLI - entrypoint for the dataset registration and model retraining
//! pipeline.
//!
//! The job configuration selects the stage (`register` or `retrain`); the
//! service principal is read from a Databricks secret scope.

use anyhow::{bail, Context};
use clap::Parser;
use drift_abstraction::WorkspaceConnector;
use drift_azure::{AzureWorkspaceConnector, DatabricksSecretProvider};
use drift_training::{
    AdditionalArgs, Clock, DatasetRegistrator, FileTaskValues, Pipeline, RetrainStage, SystemClock, TaskValues,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Entrypoint for the drift pipeline.
#[derive(Parser, Debug)]
#[command(name = "drift", author, version, about = "Register training data and retrain models on Azure ML")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Path to the job configuration file
    #[arg(long)]
    config: PathBuf,

    /// Tenant id of the service principal
    #[arg(long)]
    tenant: String,

    /// Secret scope holding the service principal credentials
    #[arg(long, alias = "vault_name")]
    vault_name: String,

    /// Data asset version to retrain on (defaults to the published one)
    #[arg(long, alias = "data_asset_version")]
    data_asset_version: Option<String>,

    /// Comma separated model name prefixes to retrain
    #[arg(long, alias = "model_name_prefix")]
    model_name_prefix: Option<String>,

    /// File where stages exchange task values
    #[arg(long, default_value = "task_values.json")]
    task_values: PathBuf,

    /// Directory where MLTable definitions are staged before upload
    #[arg(long, default_value = ".")]
    staging_dir: PathBuf,
}

impl Args {
    fn additional_args(&self) -> AdditionalArgs {
        AdditionalArgs {
            data_asset_version: self.data_asset_version.clone(),
            vault_name: self.vault_name.clone(),
            model_name_prefix: self.model_name_prefix.clone(),
        }
    }
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn build_pipeline(args: &Args, connector: Arc<dyn WorkspaceConnector>) -> Pipeline {
    let task_values: Arc<dyn TaskValues> = Arc::new(FileTaskValues::new(args.task_values.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    Pipeline::new()
        .with_transformer(DatasetRegistrator::new(
            connector.clone(),
            task_values.clone(),
            clock.clone(),
            args.staging_dir.clone(),
        ))
        .with_transformer(RetrainStage::new(connector, task_values, clock))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    info!("Starting pipeline...");
    if !args.config.is_file() {
        bail!("config file not found: {}", args.config.display());
    }

    info!("Initialize databricks workspace client...");
    let secrets = DatabricksSecretProvider::from_env().context("failed to configure Databricks secret access")?;
    debug!(host = %secrets.host(), "Databricks workspace");

    let connector = AzureWorkspaceConnector::new(Arc::new(secrets)).with_tenant(args.tenant.clone());

    info!(config = %args.config.display(), "Config path");
    debug!("Instantiating Pipeline...");
    let pipeline = build_pipeline(&args, Arc::new(connector));

    info!("Running pipeline...");
    pipeline
        .run(&args.config, &args.additional_args())
        .await
        .with_context(|| format!("pipeline failed for {}", args.config.display()))?;

    info!("Pipeline completed.");
    Ok(())
}
