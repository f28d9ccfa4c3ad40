//! Command line surface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::app::migration::MigrationKind;

#[derive(Debug, Parser)]
#[command(name = "qsops")]
#[command(about = "QuickSight operations: migration, provisioning, ingestion, monitoring and embedding")]
#[command(version, long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("QSOPS_GIT_COMMIT"),
    " ",
    env!("QSOPS_BUILD_DATE"),
    ")"
))]
pub struct Cli {
    /// Settings file, or `ssm:<parameter>` to read it from SSM Parameter Store
    #[arg(long, short, env = "QSOPS_CONFIG", default_value = "qsops.json")]
    pub config: String,

    /// Increase stderr verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Copy assets from the source to the target account
    Migrate {
        #[arg(long, value_enum)]
        kind: MigrationKind,

        /// Asset name or id (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,

        /// File with one asset name or id per line
        #[arg(long)]
        items_file: Option<PathBuf>,
    },

    /// Start a SPICE refresh for each dataset
    Ingest {
        /// Dataset name or id (repeatable)
        #[arg(long = "data-set", required = true)]
        data_sets: Vec<String>,
    },

    /// Handle a QuickSight user-created event
    ProvisionUser {
        /// EventBridge event JSON file, `-` for stdin
        #[arg(long)]
        event: PathBuf,
    },

    /// Handle a QuickSight group-created event
    ProvisionGroup {
        /// EventBridge event JSON file, `-` for stdin
        #[arg(long)]
        event: PathBuf,
    },

    /// Export visual load metrics to S3
    Metrics,

    /// Export the access audit, user inventory, lineage, ingestion and folder reports to S3
    Audit,

    /// Print an embed URL for a reader
    EmbedUrl {
        #[arg(long)]
        email: String,
    },

    /// Run the embed HTTP proxy
    ServeEmbed {
        /// Listen address, overriding the settings file
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Items from `--item` flags followed by the non-blank, non-comment lines of
/// the items file.
pub fn collect_items(items: &[String], file_contents: Option<&str>) -> Vec<String> {
    let mut all: Vec<String> = items.to_vec();
    if let Some(contents) = file_contents {
        all.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }
    all
}

/// Event JSON from `path`, or from `stdin` when the path is `-`.
pub fn read_event(path: &Path, mut stdin: impl Read) -> Result<String> {
    if path == Path::new("-") {
        let mut contents = String::new();
        stdin
            .read_to_string(&mut contents)
            .context("Failed to read event from stdin")?;
        return Ok(contents);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_migrate() {
        let cli = Cli::try_parse_from([
            "qsops",
            "--config",
            "ssm:/qsops/config",
            "-vv",
            "migrate",
            "--kind",
            "dashboard",
            "--item",
            "Sales",
            "--item",
            "HR Dashboard",
        ])
        .unwrap();
        assert_eq!(cli.config, "ssm:/qsops/config");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Migrate { kind, items, items_file } => {
                assert_eq!(kind, MigrationKind::Dashboard);
                assert_eq!(items, vec!["Sales".to_string(), "HR Dashboard".to_string()]);
                assert!(items_file.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_kinds() {
        for (raw, kind) in [
            ("data-source", MigrationKind::DataSource),
            ("data-set", MigrationKind::DataSet),
            ("all", MigrationKind::All),
        ] {
            let cli = Cli::try_parse_from(["qsops", "migrate", "--kind", raw]).unwrap();
            assert!(matches!(cli.command, Command::Migrate { kind: k, .. } if k == kind));
        }
    }

    #[test]
    fn test_ingest_requires_data_set() {
        assert!(Cli::try_parse_from(["qsops", "ingest"]).is_err());
        let cli = Cli::try_parse_from(["qsops", "ingest", "--data-set", "orders"]).unwrap();
        assert!(matches!(cli.command, Command::Ingest { ref data_sets } if data_sets == &["orders"]));
    }

    #[test]
    fn test_collect_items() {
        let items = collect_items(
            &["Sales".to_string()],
            Some("# dashboards\nHR Dashboard\n\n  Ops  \n"),
        );
        assert_eq!(items, vec!["Sales", "HR Dashboard", "Ops"]);
    }

    #[test]
    fn test_read_event_from_stdin_or_file() {
        let piped = read_event(Path::new("-"), r#"{"detail": {}}"#.as_bytes()).unwrap();
        assert_eq!(piped, r#"{"detail": {}}"#);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, "{}").unwrap();
        assert_eq!(read_event(&path, std::io::empty()).unwrap(), "{}");
        assert!(read_event(&dir.path().join("missing.json"), std::io::empty()).is_err());
    }
}
