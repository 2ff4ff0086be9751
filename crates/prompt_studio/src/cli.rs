use std::path::PathBuf;

use clap::{Parser, Subcommand};
use promptsmith::ExportFormat;

#[derive(Debug, Parser)]
#[command(name = "prompt-studio", version, about = "Compile prompts and test them against a model")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile a prompt document (JSON) into an export format.
    Compile {
        /// Document path, or `-` for stdin.
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
        #[arg(short, long, default_value = "markdown")]
        format: ExportFormat,
        /// Write `<stem>.<ext>` into this directory instead of stdout.
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// With `--out-dir`, write every format.
        #[arg(long, requires = "out_dir")]
        all: bool,
    },
    /// Stream a chat reply for each message, in one session.
    Chat {
        /// Document whose text form becomes the system prompt.
        #[arg(short, long, conflicts_with = "system")]
        document: Option<PathBuf>,
        /// Literal system prompt.
        #[arg(short, long)]
        system: Option<String>,
        /// Print the rendered HTML of each reply after it completes.
        #[arg(long)]
        html: bool,
        /// Save the finished transcript as JSON.
        #[arg(long)]
        save: Option<PathBuf>,
        #[arg(required = true)]
        messages: Vec<String>,
    },
    /// Ask the model for an improved version of a document.
    Improve {
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
        #[arg(short, long, default_value = "text")]
        format: ExportFormat,
    },
}
