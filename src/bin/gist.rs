//! Command-line front end: summarize one source and print the result.
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use smartgist::{
    config, logging,
    processing::SummarizeService,
    source::{SourceInput, Upload},
};

#[derive(Parser)]
#[command(
    name = "gist",
    about = "Summarize a file, YouTube video, arXiv paper, web page, or Wikipedia topic"
)]
struct Cli {
    /// Link, arXiv identifier, or topic to look up.
    text: Option<String>,
    /// Local .txt, .pdf, or audio file; takes precedence over TEXT.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Model to use instead of the default.
    #[arg(long)]
    model: Option<String>,
    /// Print the running summary after every refine step.
    #[arg(long)]
    steps: bool,
    /// List selectable models and exit.
    #[arg(long)]
    list_models: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    logging::init_tracing("gist");
    let config = config::load().context("invalid configuration")?;
    let service = SummarizeService::new(config).context("failed to initialize pipeline")?;

    if cli.list_models {
        let catalog = service.models();
        for model in &catalog.available {
            let marker = if *model == catalog.default { " (default)" } else { "" };
            println!("{model}{marker}");
        }
        return Ok(());
    }

    let upload = match cli.file.as_deref() {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("upload")
                .to_string();
            Some(Upload {
                name,
                mime_type: None,
                bytes,
            })
        }
        None => None,
    };
    if upload.is_none() && cli.text.as_deref().is_none_or(|text| text.trim().is_empty()) {
        bail!("provide TEXT or --file");
    }

    let outcome = service
        .summarize(
            SourceInput {
                upload,
                text: cli.text,
            },
            cli.model,
        )
        .await
        .context("summarization failed")?;

    if cli.steps {
        for (index, step) in outcome.intermediate_steps.iter().enumerate() {
            println!("### Step {}:\n{step}\n", index + 1);
        }
    }
    println!("### Summary:\n{}", outcome.summary);
    if outcome.chunks_dropped > 0 {
        eprintln!(
            "note: only the first {} of {} chunks were summarized",
            outcome.chunks_summarized, outcome.chunks_total
        );
    }
    Ok(())
}
