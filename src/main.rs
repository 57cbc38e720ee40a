use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use docgraph::{
    config::{self, CompilerConfig},
    query_planner::{compile_traversal, step::Traversal},
};

/// DocGraph - compile a Gremlin step sequence into a document-store query plan
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file holding the step sequence
    #[arg(long)]
    input: PathBuf,

    /// YAML configuration file (defaults to DOCGRAPH_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collection holding vertex documents
    #[arg(long)]
    vertex_collection: Option<String>,

    /// Maximum nesting depth of sub-plans
    #[arg(long)]
    max_nesting_depth: Option<u32>,

    /// Resolve ambiguous tag operands to their most recent binding
    #[arg(long)]
    lenient_tags: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            vertex_collection: cli.vertex_collection.clone(),
            max_nesting_depth: cli.max_nesting_depth,
            lenient_tags: cli.lenient_tags,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<CompilerConfig> {
    let base = match &cli.config {
        Some(path) => CompilerConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CompilerConfig::from_env()?,
    };
    Ok(base.from_cli(cli.into())?)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli).context("Configuration error")?;
    log::info!(
        "compiling {} against collection `{}`",
        cli.input.display(),
        config.vertex_collection
    );

    let text = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let steps: Traversal = serde_json::from_str(&text)
        .with_context(|| format!("parsing steps from {}", cli.input.display()))?;

    let mut compiled = compile_traversal(&steps, &config)?;
    let lowered = compiled.lower()?;
    log::info!(
        "compiled {} steps into {} table references",
        steps.len(),
        lowered.query.from.len()
    );

    let output = serde_json::json!({
        "plan": lowered.query,
        "accessed_columns": lowered.accessed_columns,
    });
    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);
    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
