//! atlas - CLI for the route extractor.
//!
//! Runs the three parsers over a workspace and prints the combined route
//! catalogue as JSON. Errors go to stderr, results to stdout.

use anyhow::Result;
use clap::Parser;
use route_atlas::{AppRouterParser, PagesRouterParser, ParserOptions, TrpcParser};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "atlas")]
#[command(version)]
#[command(about = "Static route catalogue extraction for TypeScript projects")]
struct Cli {
    /// Workspace root to analyze
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Compiler-config path (defaults to <root>/tsconfig.json)
    #[arg(long)]
    tsconfig: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::WARN.into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = ParserOptions {
        tsconfig_path: cli.tsconfig.clone(),
        verbose: cli.verbose,
        ..ParserOptions::default()
    };

    let mut routes = Vec::new();
    routes.extend(AppRouterParser::new(options.clone()).parse(&cli.root).await?);
    routes.extend(PagesRouterParser::new(options.clone()).parse(&cli.root).await?);
    routes.extend(TrpcParser::new(options).parse(&cli.root).await?.routes);

    println!("{}", serde_json::to_string_pretty(&routes)?);
    Ok(())
}
