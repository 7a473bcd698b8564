use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "clipwrite", about = "Publish text on the X11 CLIPBOARD selection")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Own CLIPBOARD and serve pastes until another client takes it
    Copy {
        /// Text to publish (read from stdin when omitted)
        text: Option<String>,

        /// X client library to use
        #[arg(long, value_enum, default_value_t = Backend::Rust)]
        backend: Backend,

        /// X display to connect to (defaults to $DISPLAY)
        #[arg(long)]
        display: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Pure-Rust protocol implementation
    Rust,
    /// System libxcb, loaded at runtime
    Xcb,
}
