//! prodconf cli interface

use clap::{Args, Parser, Subcommand, ValueEnum};
use prodconf::scope::Namespace;
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; prodconf ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[clap(flatten)]
    pub context: ContextArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Configuration root, site/node/service locations are relative to it
    ///
    /// Can be specified multiple times or as a `:` separated list, roots are searched in order.
    /// Defaults to `/`.
    #[clap(
        short = 'r',
        long = "root",
        env = "PRODCONF_ROOTS",
        value_delimiter = ':',
        global(true)
    )]
    pub roots: Vec<PathBuf>,

    /// Node name
    ///
    /// Defaults to the short host name.
    #[clap(short = 'n', long = "node", env = "PRODCONF_NODE", global(true))]
    pub node: Option<String>,

    /// Upper bound for evaluation passes per document
    #[clap(long = "max-passes", global(true))]
    pub max_passes: Option<usize>,

    /// Do not warn about expressions that evaluate to (undef)
    #[clap(long = "quiet-undef", global(true))]
    pub quiet_undef: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a key path through node, service and site
    ///
    /// The key path is either dotted (`listen.http|https.port`, where `|` separates
    /// alternatives) or a JSON array (`["listen", ["http", "https"], "port"]`).
    Var(VarCommand),

    /// Print an evaluated (or raw) document
    Dump(DumpCommand),

    /// Evaluate a single expression
    ///
    /// The expression sees `doc` (the node document), `node`, `site` and, with --service,
    /// `service`.
    Eval(EvalCommand),
}

#[derive(Parser, Debug)]
pub struct VarCommand {
    /// Key path to resolve
    pub key_path: String,

    /// Resolve on behalf of this service
    #[clap(short = 's', long = "service")]
    pub service: Option<String>,

    #[arg(long = "namespace", default_value_t)]
    pub namespace: NamespaceArg,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct DumpCommand {
    #[arg(value_enum)]
    pub scope: DumpScope,

    /// Service name, required for `dump service`
    #[arg(required_if_eq("scope", "service"))]
    pub name: Option<String>,

    /// Print the document as loaded, before evaluation
    #[clap(long = "raw")]
    pub raw: bool,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct EvalCommand {
    /// Expression to evaluate, without the surrounding `[eval:` and `]`
    pub expression: String,

    #[clap(short = 's', long = "service")]
    pub service: Option<String>,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum NamespaceArg {
    #[default]
    Plain,
    Dbms,
    Telemetry,
}

impl std::fmt::Display for NamespaceArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NamespaceArg::Plain => f.write_str("plain"),
            NamespaceArg::Dbms => f.write_str("dbms"),
            NamespaceArg::Telemetry => f.write_str("telemetry"),
        }
    }
}

impl From<NamespaceArg> for Namespace {
    fn from(value: NamespaceArg) -> Self {
        match value {
            NamespaceArg::Plain => Namespace::None,
            NamespaceArg::Dbms => Namespace::DBMS,
            NamespaceArg::Telemetry => Namespace::TELEMETRY,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpScope {
    Site,
    Node,
    Service,
}
