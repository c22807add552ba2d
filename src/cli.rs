use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::settings::{CleanupMode, MergeMode};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Import the library into the note store.
    Import(ImportArgs),
    /// Print the notebook hierarchy the genre column produces (no writes).
    Genres(LibraryArgs),
    /// List the custom columns of the library.
    Columns(LibraryArgs),
}

#[derive(Debug, Args)]
pub struct LibraryArgs {
    /// Calibre library folder (contains `metadata.db`).
    #[arg(long)]
    pub library: PathBuf,

    /// YAML settings file.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Label of the hierarchical genre column.
    #[arg(long)]
    pub genre_field: Option<String>,

    /// SQL LIKE pattern restricting the imported genres.
    #[arg(long)]
    pub shrink_genres: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub source: LibraryArgs,

    /// Id of the notebook to import into (top level when omitted).
    #[arg(long)]
    pub notebook: Option<String>,

    /// Base URL of the Joplin Data API (default: JOPLIN_URL or http://127.0.0.1:41184).
    #[arg(long)]
    pub joplin_url: Option<String>,

    /// Joplin API token (default: JOPLIN_TOKEN).
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long, value_enum)]
    pub merge_mode: Option<MergeMode>,

    #[arg(long, value_enum)]
    pub cleanup_mode: Option<CleanupMode>,

    /// Label of the content column; pass an empty string to disable.
    #[arg(long)]
    pub content_field: Option<String>,

    /// SQL LIKE pattern restricting the imported book titles.
    #[arg(long)]
    pub filter_titles: Option<String>,

    /// Skip the confirmation asked before a cleanup import.
    #[arg(long)]
    pub yes: bool,
}
