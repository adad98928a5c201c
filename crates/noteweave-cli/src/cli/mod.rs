pub mod backfill;
pub mod backup;
pub mod config_cmd;
pub mod edge;
pub mod note;
pub mod outbox;
pub mod stats;
pub mod suggest;
pub mod sync;

use crate::config::NoteweaveConfig;
use clap::{Args, Parser, Subcommand};
use noteweave_core::{Edge, Note, NoteId, Noteweave, Suggestion, Visibility};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "noteweave")]
#[command(version, about = "Wikilink graph and related-note suggestions over a local database")]
pub struct Cli {
    /// Path to noteweave.toml
    #[arg(
        long,
        global = true,
        env = "NOTEWEAVE_CONFIG",
        default_value = "noteweave.toml"
    )]
    pub config: PathBuf,

    /// Path to data directory (overrides config file)
    #[arg(long, global = true, env = "NOTEWEAVE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// User to act as
    #[arg(long, global = true, env = "NOTEWEAVE_USER", default_value = "local")]
    pub user: String,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Note operations
    #[command(subcommand)]
    Note(NoteCommands),
    /// Re-derive edges from stored note bodies
    Sync(SyncArgs),
    /// Related notes for a note or a piece of text
    Suggest(SuggestArgs),
    /// Edge operations
    #[command(subcommand)]
    Edge(EdgeCommands),
    /// Pending link notifications
    #[command(subcommand)]
    Outbox(OutboxCommands),
    /// Embed notes that have no embedding yet
    Backfill(BackfillArgs),
    /// Copy the database file to a backup location
    Backup(BackupArgs),
    /// Database statistics
    Stats(StatsArgs),
    /// Tags by usage
    Tags(FormatArgs),
    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    Create(NoteCreateArgs),
    Get(NoteGetArgs),
    List(NoteListArgs),
    /// Replace a note's body and re-sync its links
    Edit(NoteEditArgs),
    Delete(NoteDeleteArgs),
}

#[derive(Subcommand, Debug)]
pub enum EdgeCommands {
    /// Edges touching a note
    List(EdgeListArgs),
}

#[derive(Subcommand, Debug)]
pub enum OutboxCommands {
    /// Show pending events without delivering them
    List(OutboxListArgs),
    /// Print pending events as JSON lines and acknowledge them
    Drain(OutboxDrainArgs),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    Validate,
    Show,
}

#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Output format: table (default) | json
    #[arg(long, default_value = "table")]
    pub format: String,
}

// --- Note args ---

#[derive(Args, Debug)]
pub struct NoteCreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub body: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    /// private (default) | public
    #[arg(long, default_value = "private")]
    pub visibility: Visibility,
    /// Read body from stdin
    #[arg(long)]
    pub stdin: bool,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct NoteGetArgs {
    pub id: String,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct NoteListArgs {
    /// Only notes owned by the acting user
    #[arg(long)]
    pub mine: bool,
    /// Notes carrying any of these tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long, default_value = "20")]
    pub limit: usize,
    #[arg(long, default_value = "0")]
    pub offset: usize,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct NoteEditArgs {
    pub id: String,
    #[arg(long)]
    pub body: Option<String>,
    /// Read body from stdin
    #[arg(long)]
    pub stdin: bool,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct NoteDeleteArgs {
    pub id: String,
}

// --- Sync / suggest args ---

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Note to re-sync
    pub id: Option<String>,
    /// Re-sync every live note
    #[arg(long, conflicts_with = "id")]
    pub all: bool,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Suggest for a stored note
    #[arg(long, conflicts_with = "text")]
    pub note: Option<String>,
    /// Suggest for free text
    #[arg(long)]
    pub text: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long, default_value = "10")]
    pub limit: usize,
    #[arg(long, default_value = "table")]
    pub format: String,
}

// --- Edge args ---

#[derive(Args, Debug)]
pub struct EdgeListArgs {
    pub note: String,
    /// outgoing | incoming | both
    #[arg(long, default_value = "both")]
    pub direction: String,
    #[arg(long, default_value = "table")]
    pub format: String,
}

// --- Outbox args ---

#[derive(Args, Debug)]
pub struct OutboxListArgs {
    #[arg(long, default_value = "50")]
    pub limit: usize,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct OutboxDrainArgs {
    #[arg(long, default_value = "100")]
    pub limit: usize,
}

// --- Maintenance args ---

#[derive(Args, Debug)]
pub struct BackfillArgs {
    /// Notes per batch (defaults to the config file's batch_size)
    #[arg(long)]
    pub batch: Option<usize>,
    /// Keep going until nothing is left
    #[arg(long)]
    pub all: bool,
    #[arg(long, default_value = "table")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Destination file, e.g. ./backups/noteweave-2026-01-01.redb
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Resolved settings shared by every command
pub struct Context {
    pub config_path: PathBuf,
    pub config: NoteweaveConfig,
    pub user: String,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = NoteweaveConfig::load_or_default(&cli.config);
        if let Some(dir) = &cli.data_dir {
            config.data_dir = dir.clone();
        }

        Self {
            config_path: cli.config.clone(),
            config,
            user: cli.user.clone(),
        }
    }

    /// Open the database, creating the data directory if needed.
    pub fn open(&self) -> anyhow::Result<Noteweave> {
        std::fs::create_dir_all(&self.config.data_dir)?;
        tracing::debug!("Opening {}", self.config.db_path().display());
        Ok(Noteweave::open(
            self.config.db_path(),
            self.config.library_config(),
        )?)
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::from_cli(&cli);

    match cli.command {
        Commands::Note(cmd) => note::run(cmd, &ctx).await,
        Commands::Sync(args) => sync::run(args, &ctx).await,
        Commands::Suggest(args) => suggest::run(args, &ctx).await,
        Commands::Edge(cmd) => edge::run(cmd, &ctx).await,
        Commands::Outbox(cmd) => outbox::run(cmd, &ctx).await,
        Commands::Backfill(args) => backfill::run(args, &ctx).await,
        Commands::Backup(args) => backup::run(args, &ctx).await,
        Commands::Stats(args) => stats::run(args, &ctx).await,
        Commands::Tags(args) => stats::tags(args, &ctx).await,
        Commands::Config(cmd) => config_cmd::run(cmd, &ctx).await,
    }
}

pub fn parse_id(raw: &str) -> anyhow::Result<NoteId> {
    raw.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid note id '{}': {}", raw, e))
}

/// Body from `--body`, `--stdin`, or empty
pub fn read_body(body: Option<String>, stdin: bool) -> anyhow::Result<String> {
    if stdin {
        use std::io::Read;
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s)?;
        return Ok(s.trim_end().to_string());
    }
    Ok(body.unwrap_or_default())
}

// --- Table printing helpers ---

pub fn print_note_table(notes: &[Note]) {
    if notes.is_empty() {
        println!("(no results)");
        return;
    }
    println!(
        "{:<36}  {:<12}  {:<7}  {:<16}  {}",
        "ID", "OWNER", "VIS", "CREATED", "TITLE"
    );
    println!("{}", "─".repeat(100));
    for n in notes {
        println!(
            "{:<36}  {:<12}  {:<7}  {:<16}  {}",
            n.id,
            truncate(&n.owner, 12),
            n.visibility,
            n.created_at.format("%Y-%m-%d %H:%M"),
            truncate(&n.title, 40)
        );
    }
}

pub fn print_edge_table(edges: &[Edge]) {
    if edges.is_empty() {
        println!("(no edges)");
        return;
    }
    println!("{:<36}  {:<36}  {}", "SOURCE", "TARGET", "CONTEXT");
    println!("{}", "─".repeat(110));
    for e in edges {
        println!(
            "{:<36}  {:<36}  {}",
            e.source,
            e.target,
            truncate(&e.context, 40)
        );
    }
}

pub fn print_suggestion_table(suggestions: &[Suggestion]) {
    if suggestions.is_empty() {
        println!("(no suggestions)");
        return;
    }
    println!("{:<36}  {:<6}  {:<6}  {}", "ID", "SCORE", "SIM", "TITLE");
    println!("{}", "─".repeat(90));
    for s in suggestions {
        let similarity = s
            .similarity
            .map(|v| format!("{:.3}", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<36}  {:<6.3}  {:<6}  {}",
            s.id,
            s.score,
            similarity,
            truncate(&s.title, 40)
        );
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}…", s.chars().take(max - 1).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_note_create() {
        let cli = Cli::try_parse_from([
            "noteweave",
            "--user",
            "alice",
            "note",
            "create",
            "--title",
            "Bell",
            "--tags",
            "physics,quantum",
            "--visibility",
            "public",
        ])
        .unwrap();

        assert_eq!(cli.user, "alice");
        match cli.command {
            Commands::Note(NoteCommands::Create(args)) => {
                assert_eq!(args.title, "Bell");
                assert_eq!(args.tags, vec!["physics", "quantum"]);
                assert_eq!(args.visibility, Visibility::Public);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_sync_id_conflicts_with_all() {
        let id = uuid::Uuid::now_v7().to_string();
        assert!(Cli::try_parse_from(["noteweave", "sync", id.as_str(), "--all"]).is_err());
    }

    #[test]
    fn test_parse_backup() {
        let cli = Cli::try_parse_from(["noteweave", "backup", "./backups/nw.redb"]).unwrap();
        match cli.command {
            Commands::Backup(args) => {
                assert_eq!(args.path, PathBuf::from("./backups/nw.redb"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Cli::try_parse_from(["noteweave", "backup"]).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn test_parse_id() {
        let id = uuid::Uuid::now_v7();
        assert_eq!(parse_id(&format!(" {} ", id)).unwrap(), id);
        assert!(parse_id("not-a-uuid").is_err());
    }
}
