#![forbid(unsafe_code)]

mod output;

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use lanes_core::config::{load_config, load_user_config};
use lanes_core::fixture::parse_commits;
use lanes_core::{GraphConfig, GraphError, GraphModel, Hash};
use output::OutputMode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lanes: commit-graph lane layout",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Read tuning from this TOML file instead of the user config.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Lay out a history",
        long_about = "Read a newest-first history (one `<hash>|-<parents>` line per commit) and print one line per row.",
        after_help = "EXAMPLES:\n    # Cells per row\n    lanes render history.txt\n\n    # Graph rows, every fragment collapsed\n    lanes render --graph --hide-all history.txt\n\n    # Only what c0 and d0 reach\n    git-log-export | lanes render --heads c0,d0 -"
    )]
    Render(RenderArgs),

    #[command(
        about = "List collapsible fragments",
        long_about = "List every linear stretch that can be collapsed into a single edge.",
        after_help = "EXAMPLES:\n    # Text listing\n    lanes fragments history.txt\n\n    # Emit machine-readable output\n    lanes fragments history.txt --json"
    )]
    Fragments(InputArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// History file, or `-` for stdin.
    input: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Print graph rows (nodes and their down edges) instead of cells.
    #[arg(long)]
    graph: bool,

    /// Collapse every fragment before printing.
    #[arg(long)]
    hide_all: bool,

    /// Show only these branch heads and their ancestry.
    #[arg(long, value_delimiter = ',', value_name = "HASH")]
    heads: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LANES_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "lanes=debug,lanes_core=debug,info"
        } else {
            "lanes=info,warn"
        })
    });

    let format = env::var("LANES_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(io::stderr)).init();
        }
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read history from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn resolve_config(path: Option<&Path>) -> anyhow::Result<GraphConfig> {
    match path {
        Some(path) => load_config(path),
        None => load_user_config(),
    }
}

/// Prefix graph errors with their stable code so scripts can match on it.
fn with_code(err: GraphError) -> anyhow::Error {
    let code = err.code();
    let mut message = format!("{}: {err}", code.code());
    if let Some(hint) = code.hint() {
        message.push_str("\n  hint: ");
        message.push_str(hint);
    }
    anyhow::anyhow!(message)
}

fn load_model(input: &InputArgs, config: &GraphConfig) -> anyhow::Result<GraphModel> {
    let text = read_input(&input.input)?;
    let commits = parse_commits(&text)
        .with_context(|| format!("failed to parse {}", input.input.display()))?;
    debug!(commits = commits.len(), "history parsed");
    GraphModel::build(commits, config).map_err(with_code)
}

fn run_render(args: &RenderArgs, config: &GraphConfig, mode: OutputMode) -> anyhow::Result<()> {
    let mut model = load_model(&args.input, config)?;

    if !args.heads.is_empty() {
        let heads = args
            .heads
            .iter()
            .map(|text| {
                text.parse::<Hash>()
                    .with_context(|| format!("invalid --heads entry '{text}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        info!(heads = heads.len(), "applying branch filter");
        model
            .set_visible_branches_nodes(Box::new(move |hash: &Hash| heads.contains(hash)))
            .map_err(with_code)?;
    }
    if args.hide_all {
        let requests = model.hide_all().map_err(with_code)?;
        info!(requests = requests.len(), rows = model.row_count(), "collapsed all fragments");
    }

    let mut stdout = io::stdout().lock();
    if args.graph {
        output::write_graph_rows(&mut stdout, &mut model, mode)
    } else {
        output::write_cell_rows(&mut stdout, &mut model, mode)
    }
}

fn run_fragments(args: &InputArgs, config: &GraphConfig, mode: OutputMode) -> anyhow::Result<()> {
    let mut model = load_model(args, config)?;
    let fragments = model.all_fragments().map_err(with_code)?;
    let mut stdout = io::stdout().lock();
    output::write_fragments(&mut stdout, &mut model, &fragments, mode)
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = resolve_config(cli.config.as_deref())?;
    let mode = cli.output_mode();

    match &cli.command {
        Commands::Render(args) => run_render(args, &config, mode),
        Commands::Fragments(args) => run_fragments(args, &config, mode),
    }
}
