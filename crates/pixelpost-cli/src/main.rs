mod cli;
mod config;
mod run;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use pixelpost_core::{BatchExecutor, SourceImage};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "pixelpost=debug,pixelpost_core=debug".to_string()
        } else {
            "pixelpost=info,pixelpost_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let app = config::load_config_or_default(cli.config.as_deref())?;

    let mut store = app.store;
    if let Some(bucket) = cli.bucket.clone() {
        store = store.with_bucket(bucket);
    }
    if let Some(root) = cli.out_dir.clone() {
        store = store.into_filesystem(root);
    }

    let source = SourceImage::open(&cli.image)
        .with_context(|| format!("Failed to load {}", cli.image.display()))?;
    tracing::info!(
        "Loaded {} ({})",
        cli.image.display(),
        source.dimensions()
    );

    let pipeline = run::reconcile_dimensions(app.pipeline, &source, cli.use_image_size)?;
    let executor = BatchExecutor::new(pipeline, store.build())?;
    let batch = run::build_batch(&source, &cli.variants);

    let report = run::execute(&executor, &batch, &cli.prefix)?;
    run::print_report(&report, &mut std::io::stdout().lock())
}
