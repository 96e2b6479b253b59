#![deny(unsafe_code)]

//! bmdm CLI: command-line front end for a bmdm archive.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bmdm_config::ArchiveConfig;
use bmdm_core::archive::DEFAULT_ROOT;
use bmdm_core::{Archive, BootOutcome, Query, TagAssignment, TagRequest};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// bmdm: a content-addressed archive for labeled data files.
#[derive(Debug, Parser)]
#[command(name = "bmdm", version, about, long_about = None)]
struct Cli {
    /// Archive directory.
    #[arg(short = 'C', long, default_value = DEFAULT_ROOT)]
    archive: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create an empty archive.
    Boot,

    /// Set or display the operator identity.
    Config {
        /// Operator display name.
        #[arg(long = "user.name", alias = "user-name")]
        user_name: Option<String>,

        /// Operator email address.
        #[arg(long = "user.email", alias = "user-email")]
        user_email: Option<String>,

        /// Print the resulting configuration.
        #[arg(long)]
        show: bool,
    },

    /// Admit a file, or every file directly inside a directory.
    Admit {
        /// File or directory to admit.
        path: PathBuf,
    },

    /// Show the record count and distinct modalities.
    Stats,

    /// Add and/or remove a tag on every record matching a target.
    Tag {
        /// An entry_id or a filename.
        target: String,

        /// Tag to set, as key=value.
        #[arg(long)]
        add_tag: Option<TagAssignment>,

        /// Tag key to remove.
        #[arg(long)]
        remove_tag: Option<String>,
    },

    /// List records matching every given filter.
    Find(FindArgs),

    /// Show the activity history.
    Hist {
        /// Only show the last N entries.
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Args)]
struct FindArgs {
    #[arg(long)]
    patient_id: Option<String>,

    #[arg(long)]
    modality: Option<String>,

    #[arg(long)]
    study_date: Option<String>,

    /// Arbitrary field filter, as key=value.
    #[arg(long)]
    tag: Option<TagAssignment>,
}

impl FindArgs {
    fn into_query(self) -> Query {
        Query {
            patient_id: self.patient_id,
            modality: self.modality,
            study_date: self.study_date,
            tag: self.tag,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output only.
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(archive = %cli.archive.display(), command = ?cli.command, "bmdm starting");

    match cli.command {
        Commands::Boot => cmd_boot(&cli.archive),
        Commands::Config {
            user_name,
            user_email,
            show,
        } => cmd_config(&open(&cli.archive)?, user_name, user_email, show),
        Commands::Admit { path } => cmd_admit(&open(&cli.archive)?, &path),
        Commands::Stats => cmd_stats(&open(&cli.archive)?),
        Commands::Tag {
            target,
            add_tag,
            remove_tag,
        } => {
            let request = TagRequest {
                add: add_tag,
                remove: remove_tag,
            };
            cmd_tag(&open(&cli.archive)?, &target, &request)
        }
        Commands::Find(args) => cmd_find(&open(&cli.archive)?, &args.into_query()),
        Commands::Hist { limit } => cmd_hist(&open(&cli.archive)?, limit),
    }
}

fn open(root: &Path) -> Result<Archive> {
    Ok(Archive::open(root)?)
}

fn cmd_boot(root: &Path) -> Result<()> {
    match Archive::boot(root)? {
        BootOutcome::Created => println!("Archive ready at '{}'.", root.display()),
        BootOutcome::AlreadyInitialized => {
            println!("Already initialized at '{}'.", root.display())
        }
    }
    Ok(())
}

fn cmd_config(
    archive: &Archive,
    user_name: Option<String>,
    user_email: Option<String>,
    show: bool,
) -> Result<()> {
    let mut config: ArchiveConfig = archive.config()?;
    let changed = user_name.is_some() || user_email.is_some();
    if let Some(name) = user_name {
        config.name = Some(name);
    }
    if let Some(email) = user_email {
        config.email = Some(email);
    }

    if changed {
        archive.save_config(&config)?;
        println!("Config saved. Operator: {}", operator(&config));
    }
    if show || !changed {
        let toml_str = config.to_toml().context("rendering config")?;
        print!("{toml_str}");
    }
    Ok(())
}

/// The configured operator, for display.
fn operator(config: &ArchiveConfig) -> String {
    config
        .attribution()
        .unwrap_or_else(|| "(not set)".to_string())
}

fn cmd_admit(archive: &Archive, path: &Path) -> Result<()> {
    let report = archive
        .admit(path)
        .with_context(|| format!("admitting '{}'", path.display()))?;
    println!(
        "Admit done: {} admitted, {} skipped.",
        report.admitted.len(),
        report.skipped.len()
    );
    Ok(())
}

fn cmd_stats(archive: &Archive) -> Result<()> {
    println!("{}", archive.stats()?);
    Ok(())
}

fn cmd_tag(archive: &Archive, target: &str, request: &TagRequest) -> Result<()> {
    let report = archive.tag(target, request)?;
    println!(
        "Tag updated: {} record(s) matched, {} change(s).",
        report.matched,
        report.events.len()
    );
    Ok(())
}

fn cmd_find(archive: &Archive, query: &Query) -> Result<()> {
    for record in archive.find(query)? {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Ok(())
}

fn cmd_hist(archive: &Archive, limit: Option<usize>) -> Result<()> {
    for line in archive.history(limit)? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bmdm").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_archive_root() {
        let cli = parse(&["stats"]);
        assert_eq!(cli.archive, PathBuf::from(".bmdm"));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_tag_accepts_add_and_remove() {
        let cli = parse(&[
            "tag",
            "scan1.txt",
            "--add-tag",
            "priority=high",
            "--remove-tag",
            "stale",
        ]);
        let Commands::Tag {
            target,
            add_tag,
            remove_tag,
        } = cli.command
        else {
            panic!("expected tag command");
        };
        assert_eq!(target, "scan1.txt");
        assert_eq!(add_tag, Some(TagAssignment::new("priority", "high")));
        assert_eq!(remove_tag.as_deref(), Some("stale"));
    }

    #[test]
    fn test_tag_rejects_missing_equals() {
        let result = Cli::try_parse_from(["bmdm", "tag", "x", "--add-tag", "priority"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_find_builds_conjunctive_query() {
        let cli = parse(&["find", "--modality", "CT", "--tag", "priority=high"]);
        let Commands::Find(args) = cli.command else {
            panic!("expected find command");
        };
        let query = args.into_query();
        assert_eq!(
            query,
            Query::new()
                .modality("CT")
                .tag(TagAssignment::new("priority", "high"))
        );
    }

    #[test]
    fn test_hist_limit() {
        let cli = parse(&["-C", "/tmp/a", "hist", "--limit", "2"]);
        assert_eq!(cli.archive, PathBuf::from("/tmp/a"));
        assert!(matches!(cli.command, Commands::Hist { limit: Some(2) }));
    }

    #[test]
    fn test_config_flags() {
        let cli = parse(&["config", "--user.name", "Ada", "--user-email", "ada@example.org"]);
        let Commands::Config {
            user_name,
            user_email,
            show,
        } = cli.command
        else {
            panic!("expected config command");
        };
        assert_eq!(user_name.as_deref(), Some("Ada"));
        assert_eq!(user_email.as_deref(), Some("ada@example.org"));
        assert!(!show);
    }

    #[test]
    fn test_operator_display() {
        let mut config = ArchiveConfig::default();
        assert_eq!(operator(&config), "(not set)");

        config.name = Some("Ada".into());
        config.email = Some("ada@example.org".into());
        assert_eq!(operator(&config), "Ada <ada@example.org>");
    }
}
