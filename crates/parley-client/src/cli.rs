use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use parley_types::models::Formality;

#[derive(Parser)]
#[command(name = "parley", about = "Chat thread viewer with on-demand translation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a chat thread from the local cache
    Thread {
        chat: String,
        /// Render days in UTC instead of the local time zone
        #[arg(long)]
        utc: bool,
    },
    /// Toggle the translation of one message
    Translate { chat: String, message: String },
    /// Explain idioms and cultural references in a message
    Analyze { chat: String, message: String },
    /// Turn auto-translation of new messages on or off
    AutoTranslate { chat: String, state: Switch },
    /// Translate text before sending it
    Preview {
        text: String,
        /// Target language
        #[arg(short, long)]
        to: String,
        #[arg(short, long)]
        formality: Option<FormalityArg>,
    },
    /// Rewrite text at another formality level
    Adjust {
        text: String,
        #[arg(short, long)]
        formality: FormalityArg,
        /// Language of the text (defaults to PARLEY_LANGUAGE)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Show which languages are spoken in a chat
    Languages { chat: String },
    /// Merge a JSON array of messages into a chat and run auto-translate
    Sync { chat: String, file: PathBuf },
}

impl Command {
    pub fn needs_remote(&self) -> bool {
        !matches!(self, Self::Thread { .. } | Self::AutoTranslate { .. })
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormalityArg {
    Casual,
    Neutral,
    Formal,
}

impl From<FormalityArg> for Formality {
    fn from(f: FormalityArg) -> Self {
        match f {
            FormalityArg::Casual => Formality::Casual,
            FormalityArg::Neutral => Formality::Neutral,
            FormalityArg::Formal => Formality::Formal,
        }
    }
}
