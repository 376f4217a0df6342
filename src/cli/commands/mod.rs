//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod classify;
mod documents;
mod lifecycle;
mod ocr_check;
mod upload;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions, API_URL_ENV};
use crate::models::EntityKind;

/// Record kind for lifecycle commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    #[default]
    Document,
    Event,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Document => EntityKind::Document,
            KindArg::Event => EntityKind::Event,
        }
    }
}

#[derive(Parser)]
#[command(name = "lilac")]
#[command(about = "Institutional document and event archive ingestion")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for client state (overrides config file)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Archive API root URL
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files to the archive as one batch
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Category to use for every file (skips classification)
        #[arg(long)]
        category: Option<String>,
        /// Award classification (implies the Awards category)
        #[arg(long)]
        award_type: Option<String>,
        /// Skip OCR content extraction
        #[arg(long)]
        no_ocr: bool,
        /// Output the batch result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which category a file would be assigned
    Classify {
        /// File name (and, with --ocr, path) to classify
        file: PathBuf,
        /// Classify this text as extracted content
        #[arg(short, long)]
        text: Option<String>,
        /// Read the file's content with OCR before classifying
        #[arg(long)]
        ocr: bool,
    },

    /// Inspect category rules
    Rules {
        #[command(subcommand)]
        command: RulesCommands,
    },

    /// List archived documents
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Documents per page
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Search term
        #[arg(short, long)]
        search: Option<String>,
        /// Filter by category
        #[arg(short = 'C', long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show archive statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move records to the trash
    Delete {
        /// Record IDs
        #[arg(required = true)]
        ids: Vec<String>,
        /// Record kind
        #[arg(short, long, value_enum, default_value = "document")]
        kind: KindArg,
    },

    /// Restore a trashed record
    Restore {
        /// Trash ID (as shown by `lilac trash list`)
        trash_id: String,
        #[arg(short, long, value_enum, default_value = "document")]
        kind: KindArg,
    },

    /// Permanently delete a trashed record
    Purge {
        /// Trash ID (as shown by `lilac trash list`)
        trash_id: String,
        #[arg(short, long, value_enum, default_value = "document")]
        kind: KindArg,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect or empty the trash
    Trash {
        #[command(subcommand)]
        command: TrashCommands,
    },

    /// Show recently uploaded files
    Recent {
        /// Remove one entry by name
        #[arg(long)]
        remove: Option<String>,
        /// Clear the list
        #[arg(long)]
        clear: bool,
    },

    /// Check if OCR tools are installed
    OcrCheck,
}

#[derive(Subcommand)]
enum RulesCommands {
    /// List rules in evaluation order
    List,
    /// Show one rule
    Show {
        /// Category name
        name: String,
    },
}

#[derive(Subcommand)]
enum TrashCommands {
    /// List trashed records
    List {
        #[arg(short, long, value_enum, default_value = "document")]
        kind: KindArg,
    },
    /// Permanently delete every trashed record of a kind
    Empty {
        #[arg(short, long, value_enum, default_value = "document")]
        kind: KindArg,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data,
        api_url: cli.api_url,
    };
    let (settings, config) = load_settings_with_options(options).await;
    if let Some(path) = config.source_path.as_ref() {
        tracing::debug!("Loaded config from {}", path.display());
    }

    match cli.command {
        Commands::Upload {
            files,
            category,
            award_type,
            no_ocr,
            json,
        } => upload::cmd_upload(&settings, &files, category, award_type, no_ocr, json).await,
        Commands::Classify { file, text, ocr } => {
            classify::cmd_classify(&settings, &file, text.as_deref(), ocr).await
        }
        Commands::Rules { command } => match command {
            RulesCommands::List => classify::cmd_rules_list(&settings),
            RulesCommands::Show { name } => classify::cmd_rules_show(&settings, &name),
        },
        Commands::List {
            page,
            limit,
            search,
            category,
            json,
        } => documents::cmd_list(&settings, page, limit, search, category, json).await,
        Commands::Stats { json } => documents::cmd_stats(&settings, json).await,
        Commands::Delete { ids, kind } => lifecycle::cmd_delete(&settings, kind.into(), &ids).await,
        Commands::Restore { trash_id, kind } => {
            lifecycle::cmd_restore(&settings, kind.into(), &trash_id).await
        }
        Commands::Purge {
            trash_id,
            kind,
            yes,
        } => lifecycle::cmd_purge(&settings, kind.into(), &trash_id, yes).await,
        Commands::Trash { command } => match command {
            TrashCommands::List { kind } => lifecycle::cmd_trash_list(&settings, kind.into()).await,
            TrashCommands::Empty { kind, yes } => {
                lifecycle::cmd_trash_empty(&settings, kind.into(), yes).await
            }
        },
        Commands::Recent { remove, clear } => {
            documents::cmd_recent(&settings, remove.as_deref(), clear)
        }
        Commands::OcrCheck => ocr_check::cmd_ocr_check(&settings),
    }
}
