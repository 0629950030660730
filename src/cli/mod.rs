//! CLI argument parsing using clap 4.x derive macros

use clap::{Parser, Subcommand};

/// Resilient chat-service client with resumable conversations
///
/// Talks to a chat-completion endpoint, persists every exchange to a
/// session store, and can rebuild context to continue an interrupted
/// conversation. Configure endpoints and credentials via CONFAB_*
/// environment variables.
#[derive(Parser, Debug)]
#[command(name = "confab")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a message and persist the exchange
    Chat {
        /// User identifier
        user: String,

        /// The message to send
        message: String,

        /// Conversation id to continue; a fresh one is minted when omitted
        #[arg(short, long)]
        conversation: Option<String>,

        /// Title stored with a newly created conversation
        #[arg(short, long, default_value = "Conversation")]
        title: String,

        /// Print the reply incrementally as it streams in
        #[arg(short, long)]
        stream: bool,
    },

    /// List a user's stored conversations
    Sessions {
        /// User identifier
        user: String,
    },

    /// Resume an interrupted conversation from its persisted history
    Resume {
        /// User identifier
        user: String,

        /// Conversation id to resume
        conversation: String,
    },

    /// Mark a conversation as interrupted (e.g. after a dropped connection)
    Interrupt {
        /// User identifier
        user: String,

        /// Conversation id
        conversation: String,
    },

    /// Mark a conversation as finished
    Finish {
        /// User identifier
        user: String,

        /// Conversation id
        conversation: String,
    },
}
