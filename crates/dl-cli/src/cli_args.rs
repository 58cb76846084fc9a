use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "dialogue-player")]
#[command(about = "Branching dialogue player")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Play a dialogue interactively on stdin/stdout.
    Play(PlayArgs),
    /// Run a dialogue with scripted choices and print each event as JSON.
    Trace(TraceArgs),
}

#[derive(Debug, Args)]
pub(crate) struct SourceArgs {
    /// Node table file, or a directory scanned for `.json` node tables.
    #[arg(long = "nodes")]
    pub(crate) nodes: String,
    #[arg(long = "start")]
    pub(crate) start: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
}

#[derive(Debug, Args)]
pub(crate) struct TraceArgs {
    #[command(flatten)]
    pub(crate) source: SourceArgs,
    /// Option indices consumed in order, e.g. `--choices 0,1`.
    #[arg(long = "choices", value_delimiter = ',')]
    pub(crate) choices: Vec<usize>,
}
