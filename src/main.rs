//! tagwarden - audits cloud resource tags/labels and reports violations.
//!
//! Reads configuration from the environment (a `.env` file is honoured);
//! see the `settings` module for the variables.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use tagwarden::backends::aws::{AwsConfigClient, AwsConfigSettings, AwsCredentials};
use tagwarden::backends::gcp::{CloudAssetClient, CloudAssetSettings};
use tagwarden::backends::{AssetInventoryScanner, ConfigServiceScanner};
use tagwarden::manager::{AuditorConfig, LabelAuditor};
use tagwarden::notify::SlackNotifier;
use tagwarden::policy::{PolicyDocument, ResourcePolicy};
use tagwarden::settings::{ProviderSettings, Settings};
use tagwarden::{ArcScanner, Provider, ScanContext};

use secrecy::ExposeSecret;

const AWS_POLICY: &str = include_str!("../config/aws.yml");
const GCP_POLICY: &str = include_str!("../config/gcp.yml");

/// Audit cloud resource tags/labels against a required/banned policy.
#[derive(Parser)]
#[command(name = "tagwarden", version, about)]
struct Cli {
    /// Provider to audit.
    #[arg(value_enum)]
    provider: ProviderArg,

    /// Policy file; defaults to the bundled `config/<provider>.yml`.
    #[arg(long, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Report directory; overrides `OUTPUT_DIR`.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Write the report but do not post to Slack.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    /// AWS Config.
    Aws,
    /// Google Cloud Asset Inventory.
    Gcp,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Aws => Provider::Aws,
            ProviderArg::Gcp => Provider::Gcp,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tagwarden=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "tagwarden failed");
            eprintln!("tagwarden: error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let provider = Provider::from(cli.provider);

    let document = match &cli.policy {
        Some(path) => PolicyDocument::from_path(path)
            .with_context(|| format!("failed to load policy {}", path.display()))?,
        None => PolicyDocument::from_yaml_str(bundled_policy(provider))
            .context("bundled policy is invalid")?,
    };
    let policy = ResourcePolicy::for_provider(&document, provider)?;

    let settings = Settings::from_env(provider, !cli.dry_run)?;
    let output_dir = cli.output_dir.unwrap_or_else(|| settings.output_dir.clone());

    let (scanner, context) = build_scanner(&settings, policy)?;

    let mut builder = LabelAuditor::builder()
        .with_arc_scanner(scanner)
        .with_config(AuditorConfig::new().with_output_dir(output_dir));

    if let Some(slack) = &settings.slack {
        builder = builder.with_notifier(SlackNotifier::new(
            slack.token.clone(),
            slack.channel_id.clone(),
        )?);
    }

    let report = builder.build()?.run(&context).await?;

    tracing::info!(
        scope = %report.scope,
        missing_required = report.missing_required_count(),
        banned_present = report.banned_count(),
        archive = ?report.archive_path,
        dry_run = cli.dry_run,
        "Done"
    );

    Ok(())
}

fn bundled_policy(provider: Provider) -> &'static str {
    match provider {
        Provider::Aws => AWS_POLICY,
        Provider::Gcp => GCP_POLICY,
    }
}

fn build_scanner(
    settings: &Settings,
    policy: ResourcePolicy,
) -> anyhow::Result<(ArcScanner, ScanContext)> {
    match &settings.provider {
        ProviderSettings::Aws(aws) => {
            let mut credentials = AwsCredentials::new(
                aws.access_key_id.clone(),
                aws.secret_access_key.expose_secret(),
            );
            if let Some(token) = &aws.session_token {
                credentials = credentials.with_session_token(token.expose_secret());
            }

            let client = AwsConfigClient::new(AwsConfigSettings::new(&aws.region, credentials))?;
            let context = ScanContext::new(&aws.account_name).with_region(&aws.region);
            Ok((Arc::new(ConfigServiceScanner::new(client, policy)), context))
        }
        ProviderSettings::Gcp(gcp) => {
            let client = CloudAssetClient::new(CloudAssetSettings::new(
                gcp.access_token.expose_secret(),
            ))?;
            let context = ScanContext::new(&gcp.project_id);
            Ok((Arc::new(AssetInventoryScanner::new(client, policy)), context))
        }
    }
}
