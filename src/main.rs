#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use qsops::app::audit;
use qsops::app::aws_services::{
    CloudWatchMetrics, Notifier, S3ObjectStore, SecretsManagerStore, SnsNotifier, SsmParameters,
};
use qsops::app::cli::{collect_items, read_event, Cli, Command};
use qsops::app::config::{AccountConfig, EmbedConfig, Settings, DEFAULT_NAMESPACE};
use qsops::app::credentials::CredentialCoordinator;
use qsops::app::embed::token::EmbedClaims;
use qsops::app::embed::{server, EmbedService, EmbedSettings};
use qsops::app::ingestion::IngestionTrigger;
use qsops::app::metrics;
use qsops::app::migration::target::DataSourceTarget;
use qsops::app::migration::{
    MigrationDriver, MigrationKind, MigrationRequest, MigrationSettings,
};
use qsops::app::provisioning::{self, GroupCreatedEvent, UserCreatedEvent};
use qsops::app::quicksight::{QuickSightApi, SdkQuickSight};

const DEFAULT_CONFIG: &str = "qsops.json";
const FILE_LOG_FILTER: &str =
    "qsops=info,aws_config=warn,aws_sigv4=warn,aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,hyper=warn";

fn stderr_filter(verbose: u8) -> EnvFilter {
    let directives = match verbose {
        0 => "qsops=info,warn",
        1 => "qsops=debug,info",
        _ => "qsops=trace,debug",
    };
    EnvFilter::new(directives)
}

fn init_logging(verbose: u8) {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter(verbose));

    // File logging under the platform data directory
    let mut log_path = None;
    let file_layer = directories::ProjectDirs::from("com", "", "qsops").and_then(|proj_dirs| {
        let log_dir = proj_dirs.data_dir().join("logs");
        std::fs::create_dir_all(&log_dir).ok()?;
        let path = log_dir.join("qsops.log");
        let file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)
            .ok()?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = file.metadata() {
                let mut perms = metadata.permissions();
                perms.set_mode(0o600);
                if let Err(e) = std::fs::set_permissions(&path, perms) {
                    eprintln!("[SECURITY] Failed to set log file permissions: {}", e);
                }
            }
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(FILE_LOG_FILTER));
        log_path = Some(path);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(filter),
        )
    });

    let subscriber = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer);
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    // Bridge `log` records from dependencies into tracing
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!("log bridge not installed: {}", e);
    }

    match log_path {
        Some(path) => tracing::debug!("Logging to {:?}", path),
        None => tracing::debug!("File logging unavailable, logging to stderr only"),
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let crash_msg = format!(
            "qsops crashed!\n\
             Panic occurred at: {}\n\
             Details: {}\n\
             Backtrace:\n{:?}\n",
            panic_info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown location".to_string()),
            panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.as_str()))
                .unwrap_or("unknown panic"),
            std::backtrace::Backtrace::force_capture()
        );

        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "", "qsops") {
            let log_dir = proj_dirs.data_dir().join("logs");
            let _ = std::fs::create_dir_all(&log_dir);
            let crash_log_path = log_dir.join("crash.log");

            if let Ok(mut file) = std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(&crash_log_path)
            {
                use std::io::Write;
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let _ = writeln!(file, "\n=== CRASH at {} ===\n{}", timestamp, crash_msg);
            }

            eprintln!("\n{}", crash_msg);
            eprintln!("Crash log written to: {:?}", crash_log_path);
        } else {
            eprintln!("\n{}", crash_msg);
        }
    }));
}

/// Region for STS, SSM and accounts not named in the settings.
fn home_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-1".to_string())
}

async fn load_settings(source: &str, coordinator: &CredentialCoordinator) -> Result<Settings> {
    if let Some(name) = source.strip_prefix("ssm:") {
        let config = coordinator.ambient_config(&home_region()).await;
        let contents = SsmParameters::new(&config).get_parameter(name).await?;
        return Settings::from_json(&contents);
    }
    let path = Path::new(source);
    if source == DEFAULT_CONFIG && !path.exists() {
        tracing::debug!("No {} found, using default settings", DEFAULT_CONFIG);
        return Ok(Settings::default());
    }
    Settings::load_from_path(path)
}

/// The configured account, or the caller's own account in the home region.
async fn resolve_account(
    settings: &Settings,
    coordinator: &CredentialCoordinator,
) -> Result<AccountConfig> {
    if let Some(account) = &settings.account {
        return Ok(account.clone());
    }
    let account_id = coordinator
        .caller_account_id()
        .await
        .context("No \"account\" settings section and the caller identity is unavailable")?;
    Ok(AccountConfig {
        account_id,
        region: home_region(),
        role_name: None,
        namespace: DEFAULT_NAMESPACE.to_string(),
        identity_region: None,
        admin_user: None,
    })
}

async fn quicksight_in(
    coordinator: &CredentialCoordinator,
    account: &AccountConfig,
    region: &str,
) -> Result<SdkQuickSight> {
    let config = coordinator
        .create_aws_config_for_account(&account.account_id, account.role_name.as_deref(), region)
        .await?;
    SdkQuickSight::new(&config, &account.account_id)
}

async fn run_migrate(
    settings: &Settings,
    coordinator: &CredentialCoordinator,
    kind: MigrationKind,
    items: Vec<String>,
    items_file: Option<&Path>,
) -> Result<()> {
    let config = settings.require_migration()?;
    let file_contents = items_file
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read items file {}", path.display()))
        })
        .transpose()?;
    let items = collect_items(&items, file_contents.as_deref());
    if items.is_empty() && kind != MigrationKind::All {
        bail!("Nothing to migrate: pass --item or --items-file");
    }

    let source_config = coordinator.config_for(&config.source).await?;
    let target_config = coordinator.config_for(&config.target).await?;
    let source = SdkQuickSight::new(&source_config, &config.source.account_id)?;
    let target = SdkQuickSight::new(&target_config, &config.target.account_id)?;

    let mut data_source_target = DataSourceTarget::from_config(&config.data_source_target);
    let secrets = SecretsManagerStore::new(&target_config);
    if let Some(secret) = &config.data_source_target.rds_credentials_secret {
        data_source_target.rds_credentials = Some(secrets.get_credential_pair(secret).await?);
    }
    if let Some(secret) = &config.data_source_target.redshift_credentials_secret {
        data_source_target.redshift_credentials = Some(secrets.get_credential_pair(secret).await?);
    }

    let driver = MigrationDriver::new(
        &source,
        &target,
        MigrationSettings::from_config(config, data_source_target),
    );
    let report = driver
        .run(&MigrationRequest { kind, items }, &config.manifest)
        .await?;

    for path in report.write_to(&config.results_dir, Utc::now())? {
        tracing::info!("Wrote {}", path.display());
    }
    for (kind, stage) in &report.stages {
        println!(
            "{}: {} succeeded, {} failed, {} skipped",
            kind,
            stage.succeeded.len(),
            stage.failed.len(),
            stage.skipped.len()
        );
    }
    match report.failure_count() {
        0 => Ok(()),
        n => Err(anyhow!("{} asset(s) failed to migrate", n)),
    }
}

async fn run_ingest(
    settings: &Settings,
    coordinator: &CredentialCoordinator,
    data_sets: &[String],
) -> Result<()> {
    let account = resolve_account(settings, coordinator).await?;
    let config = coordinator.config_for(&account).await?;
    let api = SdkQuickSight::new(&config, &account.account_id)?;
    let notifier = SnsNotifier::new(&config);
    let trigger = IngestionTrigger::new(
        &api,
        Some(&notifier as &dyn Notifier),
        &settings.ingestion,
    );

    let mut failures = 0;
    for data_set in data_sets {
        match trigger.trigger(data_set).await {
            Ok(outcome) => println!("{}: {}", data_set, outcome),
            Err(e) => {
                failures += 1;
                tracing::error!("Ingestion for {} failed: {:#}", data_set, e);
                println!("{}: error: {:#}", data_set, e);
            }
        }
    }
    match failures {
        0 => Ok(()),
        n => Err(anyhow!("{} ingestion(s) could not be started", n)),
    }
}

async fn build_embed_service(
    settings: &Settings,
    coordinator: &CredentialCoordinator,
) -> Result<(Arc<EmbedService>, EmbedConfig)> {
    let config = EmbedConfig::resolve(settings.embed.clone(), |key| std::env::var(key).ok())?;
    let account = resolve_account(settings, coordinator).await?;
    let dashboard_region = config.region.clone().unwrap_or_else(|| account.region.clone());
    let embed_settings = EmbedSettings::from_config(&config, account.identity_region());

    let dashboards: Arc<dyn QuickSightApi> =
        Arc::new(quicksight_in(coordinator, &account, &dashboard_region).await?);
    let identities: Arc<dyn QuickSightApi> = Arc::new(
        quicksight_in(coordinator, &account, &embed_settings.identity_region).await?,
    );
    Ok((
        Arc::new(EmbedService::new(dashboards, identities, embed_settings)),
        config,
    ))
}

async fn run(cli: Cli) -> Result<()> {
    let coordinator = CredentialCoordinator::new(home_region());
    let settings = load_settings(&cli.config, &coordinator).await?;

    match cli.command {
        Command::Migrate {
            kind,
            items,
            items_file,
        } => run_migrate(&settings, &coordinator, kind, items, items_file.as_deref()).await,

        Command::Ingest { data_sets } => run_ingest(&settings, &coordinator, &data_sets).await,

        Command::ProvisionUser { event } => {
            let contents = read_event(&event, std::io::stdin().lock())?;
            let event = UserCreatedEvent::from_json(&contents)?;
            let account = resolve_account(&settings, &coordinator).await?;
            let api = quicksight_in(&coordinator, &account, &event.region).await?;
            provisioning::on_user_created(&api, &account.namespace, &event).await
        }

        Command::ProvisionGroup { event } => {
            let contents = read_event(&event, std::io::stdin().lock())?;
            let event = GroupCreatedEvent::from_json(&contents)?;
            let account = resolve_account(&settings, &coordinator).await?;
            let region = event.region.as_deref().unwrap_or(&account.region);
            let api = quicksight_in(&coordinator, &account, region).await?;
            let report = provisioning::on_group_created(
                &api,
                &settings.provisioning.group_rules,
                &account.namespace,
                account.identity_region(),
                &event,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        Command::Metrics => {
            let account = resolve_account(&settings, &coordinator).await?;
            let config = coordinator.config_for(&account).await?;
            let keys = metrics::export_visual_metrics(
                &CloudWatchMetrics::new(&config),
                &S3ObjectStore::new(&config),
                &settings.monitoring.bucket_for(&account.account_id),
                &settings.monitoring,
                Utc::now(),
            )
            .await?;
            for key in keys {
                println!("{}", key);
            }
            Ok(())
        }

        Command::Audit => {
            let account = resolve_account(&settings, &coordinator).await?;
            let config = coordinator.config_for(&account).await?;
            let api = SdkQuickSight::new(&config, &account.account_id)?;
            let summary = audit::export_audit(
                &api,
                &S3ObjectStore::new(&config),
                &settings.monitoring.bucket_for(&account.account_id),
                &account.namespace,
            )
            .await?;
            println!(
                "{} access row(s), {} user(s), {} lineage row(s), {} ingestion(s), {} folder row(s)",
                summary.access_rows,
                summary.users,
                summary.lineage_rows,
                summary.ingestion_rows,
                summary.folder_rows
            );
            Ok(())
        }

        Command::EmbedUrl { email } => {
            let (service, _) = build_embed_service(&settings, &coordinator).await?;
            let claims = EmbedClaims {
                username: email.clone(),
                email,
            };
            println!("{}", service.embed_url_for(&claims).await?);
            Ok(())
        }

        Command::ServeEmbed { bind } => {
            let (service, config) = build_embed_service(&settings, &coordinator).await?;
            let bind_addr = bind.unwrap_or(config.bind_addr);
            server::serve(service, &bind_addr).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_panic_handler();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!("qsops {} starting", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
