//! CLI argument parsing and command handlers

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{CONFIG_DIR_ENV, Config, resolve_config_dir};
use crate::library::Library;
use crate::models::{Record, RecordKind};
use crate::output;
use crate::query::{HELP, QueryEngine, QueryError, fields};

/// tunedex: query a local music library
#[derive(Parser, Debug)]
#[command(
    name = "tdx",
    version,
    about = "Query a local music library with field:value terms",
    after_long_help = HELP
)]
pub struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Reduce logging (-q errors only, -qq nothing)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config directory (defaults to $TUNEDEX_CONFIG_DIR, then the platform config dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Which kind of record a query targets (tracks unless told otherwise)
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(multiple = false)]
pub struct KindArgs {
    /// Query albums instead of tracks
    #[arg(short, long)]
    pub album: bool,

    /// Query extra files (cover art, logs, ...) instead of tracks
    #[arg(short, long)]
    pub extra: bool,
}

impl KindArgs {
    pub fn kind(&self) -> RecordKind {
        if self.album {
            RecordKind::Album
        } else if self.extra {
            RecordKind::Extra
        } else {
            RecordKind::Track
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List items matching a query
    ///
    /// Examples:
    ///   tdx ls 'artist:wu-tang%'               # Tracks by any Wu-Tang artist
    ///   tdx ls -a 'year:199_'                  # Albums from the nineties
    ///   tdx ls -e 'filename::\.jpg$' --paths   # Paths of all JPEG extras
    #[command(after_long_help = HELP)]
    Ls {
        /// Query string, e.g. '"artist:wu-tang clan" title:a%'
        #[arg(value_name = "QUERY")]
        query: String,

        #[command(flatten)]
        kind: KindArgs,

        /// Print paths instead of summaries
        #[arg(short, long)]
        paths: bool,

        /// Output format as JSON
        #[arg(long, conflicts_with = "paths")]
        json: bool,

        /// Pretty-print JSON output (only with --json)
        #[arg(long, requires = "json")]
        pretty: bool,
    },

    /// Show every field of the items matching a query
    #[command(after_long_help = HELP)]
    Info {
        #[arg(value_name = "QUERY")]
        query: String,

        #[command(flatten)]
        kind: KindArgs,
    },

    /// Import albums from a JSON manifest into the library
    Add {
        /// JSON file holding an array of albums with their tracks and extras
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },

    /// List the queryable fields of a record kind
    Fields {
        #[command(flatten)]
        kind: KindArgs,
    },
}

/// Map -v/-q counts to an env_logger filter
pub fn log_level(verbose: u8, quiet: u8) -> &'static str {
    match (verbose, quiet) {
        (0, 0) => "warn",
        (0, 1) => "error",
        (0, _) => "off",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<ExitCode> {
        let log_level = log_level(self.verbose, self.quiet);
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        let config_dir = self.config_dir;
        match self.command {
            Command::Ls { query, kind, paths, json, pretty } => {
                let library = open_library(config_dir)?;
                handle_ls(&library, &query, kind.kind(), paths, json, pretty)
            }
            Command::Info { query, kind } => {
                let library = open_library(config_dir)?;
                handle_info(&library, &query, kind.kind())
            }
            Command::Add { manifest } => {
                let mut library = open_library(config_dir)?;
                handle_add(&mut library, &manifest)
            }
            Command::Fields { kind } => handle_fields(kind.kind()),
        }
    }
}

fn open_library(config_dir: Option<PathBuf>) -> Result<Library> {
    let config_dir = resolve_config_dir(config_dir, std::env::var_os(CONFIG_DIR_ENV))?;
    let config = Config::load(&config_dir)?;
    Library::open(config.db_path())
}

/// Run a query, turning grammar errors into a message with the syntax help
fn run_query(library: &Library, query: &str, kind: RecordKind) -> Result<Vec<Record>> {
    match QueryEngine::new(library).run(query, kind) {
        Ok(items) => Ok(items),
        Err(QueryError::Store(e)) => Err(e),
        Err(e) if e.is_syntax_error() => Err(anyhow::anyhow!("{}\n\n{}", e, HELP)),
        Err(e) => Err(e.into()),
    }
}

fn handle_ls(
    library: &Library,
    query: &str,
    kind: RecordKind,
    paths: bool,
    as_json: bool,
    pretty_json: bool,
) -> Result<ExitCode> {
    let items = run_query(library, query, kind)?;

    if items.is_empty() {
        output::warn(&format!("No {}s matched '{}'", kind, query));
        return Ok(ExitCode::FAILURE);
    }

    if as_json {
        let json = if pretty_json {
            serde_json::to_string_pretty(&items)?
        } else {
            serde_json::to_string(&items)?
        };
        println!("{}", json);
    } else {
        for item in &items {
            println!("{}", output::format_line(item, paths));
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_info(library: &Library, query: &str, kind: RecordKind) -> Result<ExitCode> {
    let items = run_query(library, query, kind)?;

    if items.is_empty() {
        output::warn(&format!("No {}s matched '{}'", kind, query));
        return Ok(ExitCode::FAILURE);
    }

    let blocks: Vec<String> = items.iter().map(output::format_info).collect();
    println!("{}", blocks.join("\n\n"));

    Ok(ExitCode::SUCCESS)
}

fn handle_add(library: &mut Library, manifest: &Path) -> Result<ExitCode> {
    let albums = library
        .import_manifest(manifest)
        .with_context(|| format!("Failed to import {}", manifest.display()))?;

    for album in &albums {
        println!("{}", album);
    }
    output::info(&format!("Added {} album(s) to the library", albums.len()));

    Ok(ExitCode::SUCCESS)
}

fn handle_fields(kind: RecordKind) -> Result<ExitCode> {
    println!("{} fields:", kind);
    for field in fields(kind) {
        println!("  {}", field.name);
    }
    Ok(ExitCode::SUCCESS)
}
