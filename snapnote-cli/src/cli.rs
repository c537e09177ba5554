use clap::{Parser, Subcommand, ValueEnum};
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NoteKind {
    #[default]
    Text,
    Image,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Text => "text",
            NoteKind::Image => "image",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "snapnote")]
#[command(version)]
#[command(about = "Manage web highlighter notes from the command line")]
#[command(long_about = "
snapnote stores text highlights and image captures as notes grouped by the
domain of the page they came from. Every command goes through the same
message router the extension contexts use.

Example usage:
  snapnote note create --url https://example.com/post --content \"quote\"
  snapnote note list --url https://example.com
  snapnote serve     # JSON request lines on stdin, responses on stdout
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding the note store (overrides SNAPNOTE_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, list, read, update, delete and search notes
    Note {
        #[command(subcommand)]
        subcommand: NoteCommands,
    },
    /// List the domains notes were captured on
    Domains {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show note statistics
    Stats {
        /// Recompute the counters from the stored notes first
        #[arg(long)]
        rebuild: bool,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Export every note as JSON
    #[command(long_about = "
Exports all notes as a JSON document. Without --output the document is
written to stdout.

Examples:
  snapnote export > backup.json
  snapnote export --output ~/backups/    # web-highlighter-notes-<date>.json
")]
    Export {
        /// File or directory to write the export to
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Show or change user settings
    Settings {
        #[command(subcommand)]
        subcommand: SettingsCommands,
    },
    /// List the router actions `serve` accepts
    Actions {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Serve router requests over stdin/stdout
    #[command(long_about = "
Reads one JSON request per line on stdin and writes one JSON response per
line on stdout. Requests carry an `action` plus its fields, and may name the
`context` they come from and a `requestId` that is echoed in the reply.
A line `{\"event\":\"closeContext\",\"context\":\"tab-1\"}` tears a context
down. Notifications are written as `{\"event\":\"notification\",...}` lines.

Example:
  echo '{\"action\":\"getNotes\"}' | snapnote serve
")]
    Serve,
}

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Create a new note
    Create {
        /// Page the note was captured on
        #[arg(long)]
        url: String,
        /// Page title
        #[arg(long)]
        title: Option<String>,
        /// Note type
        #[arg(long = "type", value_enum, default_value_t = NoteKind::Text)]
        note_type: NoteKind,
        /// Note content (use - to read from stdin)
        #[arg(short, long)]
        content: Option<String>,
        /// Tag to attach (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Classification bucket
        #[arg(long)]
        category: Option<String>,
        /// Image source URL, for image notes
        #[arg(long)]
        image_src: Option<String>,
    },
    /// List notes, optionally only those from one site
    List {
        /// Only notes whose domain matches this URL's host
        #[arg(long)]
        url: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Show a note
    Get {
        /// Note ID
        id: String,
    },
    /// Replace a note's content
    Update {
        /// Note ID
        id: String,
        /// New content (use - to read from stdin)
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID
        id: String,
    },
    /// Search notes by content, title, domain, category and tags
    Search {
        /// Case-insensitive search text
        query: String,
        /// Only notes whose domain matches this URL's host
        #[arg(long)]
        url: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show the current settings
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Change one or more settings
    Set {
        /// Dark UI theme
        #[arg(long, value_name = "BOOL")]
        dark_mode: Option<bool>,
        /// Periodic export reminder
        #[arg(long, value_name = "BOOL")]
        auto_backup: Option<bool>,
        /// Note ceiling enforced on create
        #[arg(long, value_name = "N")]
        max_notes: Option<usize>,
        /// Deliver notifications
        #[arg(long, value_name = "BOOL")]
        notifications: Option<bool>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    #[allow(dead_code)]
    pub fn try_parse_from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(args)
    }

    pub fn is_tty() -> bool {
        io::stdout().is_terminal()
    }

    pub fn should_use_color() -> bool {
        Self::is_tty() && std::env::var("NO_COLOR").is_err()
    }
}
