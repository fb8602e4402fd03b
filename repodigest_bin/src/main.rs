use std::{io::Write, path::PathBuf, sync::Arc};

use clap::Parser;
use repodigest::{
    FileCache, Progress, RepoDigest, RepoDigestConfig, RepoDigestError, RepoSource, ReportWriter,
    SelectionMode,
};

/// Summarize a repository's architecture with a local language model.
#[derive(Debug, Parser)]
#[command(name = "repodigest", version)]
struct Cli {
    /// GitHub URL (https://github.com/<owner>/<repo>) or local directory.
    source: String,

    /// JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory that receives the Markdown report.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Model used for every generation stage.
    #[arg(long)]
    model: Option<String>,

    /// Number of top-ranked files to keep.
    #[arg(long)]
    top_k: Option<usize>,

    /// Token budget per batch.
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Batch every accepted file instead of only the top-ranked ones.
    #[arg(long)]
    all: bool,

    /// Skip the result cache.
    #[arg(long)]
    no_cache: bool,

    /// Persist cached results in this JSON file.
    #[arg(long)]
    cache_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    repodigest::init_logging();
    let cli = Cli::parse();

    if let Err(why) = run(cli).await {
        tracing::error!(error = %why, "digest failed");
        eprintln!("Digest failed: {why}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RepoDigestError> {
    let config = build_config(&cli)?;
    let source = RepoSource::parse(&cli.source)?;

    let mut digest = RepoDigest::new(config)?;
    if cli.no_cache {
        digest = digest.without_cache();
    } else if let Some(path) = &cli.cache_file {
        digest = digest.with_cache(Arc::new(FileCache::new(path)));
    }

    let (progress, mut events) = Progress::channel();
    let printer = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        while let Some(event) = events.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                let _ = writeln!(stdout, "{line}");
            }
        }
    });

    let outcome = digest.run(&source, &progress).await;
    drop(progress);
    let _ = printer.await;
    let result = outcome?;

    if let Some(out) = &cli.out {
        ReportWriter::new(out).write(&result)?;
    }

    let line = serde_json::to_string(&serde_json::json!({ "result": result }))
        .map_err(|e| RepoDigestError::InvalidState(format!("serializing result: {e}")))?;
    println!("{line}");
    Ok(())
}

fn build_config(cli: &Cli) -> Result<RepoDigestConfig, RepoDigestError> {
    let mut config = match &cli.config {
        Some(path) => RepoDigestConfig::from_json_file(path)?,
        None => RepoDigestConfig::default(),
    };

    if let Some(model) = &cli.model {
        config.ollama = config.ollama.with_model(model.clone());
    }
    if let Some(top_k) = cli.top_k {
        config.selection.top_k = top_k;
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.selection.max_tokens_per_batch = max_tokens;
    }
    if cli.all {
        config.selection.mode = SelectionMode::All;
    }

    config.validate()?;
    Ok(config)
}
