//! docweave: merge same-titled chapters of many documents into one restructured document.
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::Parser;
use docweave::config::Config;
use docweave::error::Error;
use docweave::generator::{ChatClient, Generator, TaskKind};
use docweave::pipeline::{Pipeline, Stage};
use docweave::progress::{ProgressReporter, StepTiming};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docweave")]
#[command(about = "Restructure and merge numbered documents", long_about = None)]
struct Args {
    /// Folder of plain-text documents (.txt or .md)
    #[arg(value_name = "INPUT_DIR")]
    input: PathBuf,

    /// Root folder for intermediate artifacts and the final document
    #[arg(long, short = 'o', value_name = "OUTPUT_ROOT", default_value = "docweave-out")]
    output: PathBuf,

    /// Configuration file (defaults to docweave.toml in the working directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run only this stage: split, check, index, summarize, prepare, restructure, parse,
    /// enrich, recompose or assemble
    #[arg(long, value_name = "STAGE")]
    stage: Option<Stage>,
}

/// Progress bar over the pipeline stages.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(stages: usize) -> anyhow::Result<Self> {
        let bar = ProgressBar::new(stages as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarProgress {
    fn stage_started(&self, stage: &str, _percent: f64, _history: &[StepTiming]) {
        self.bar.set_message(stage.to_string());
    }

    fn stage_finished(&self, stage: &str, percent: f64, history: &[StepTiming]) {
        let elapsed = history.last().map_or(0.0, |t| t.elapsed.as_secs_f64());
        self.bar.inc(1);
        self.bar
            .println(format!("{stage} done in {elapsed:.2}s ({percent:.0}%)"));
    }

    fn stage_failed(&self, stage: &str, reason: &str) {
        self.bar.abandon_with_message(format!("{stage} failed: {reason}"));
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("docweave=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = Config::load(args.config.as_deref());
    let needs_client = match args.stage {
        Some(stage) => stage.uses_generator(),
        None => true,
    };
    let client = if needs_client {
        Some(ChatClient::from_config(&cfg).context("setting up the generation client")?)
    } else {
        None
    };
    let offline = |_: &str, task: TaskKind| -> docweave::error::Result<String> {
        Err(Error::Config(format!(
            "no generation client for a {} request",
            task.as_str()
        )))
    };
    let generator: &dyn Generator = match &client {
        Some(client) => client,
        None => &offline,
    };
    let pipeline = Pipeline::new(&args.input, &args.output, &cfg, generator)
        .context("preparing the pipeline")?;

    match args.stage {
        Some(stage) => {
            let progress = BarProgress::new(1)?;
            pipeline
                .run_stages(&[stage], &progress)
                .with_context(|| format!("running stage {stage}"))?;
            progress.bar.finish_and_clear();
        }
        None => {
            let progress = BarProgress::new(Stage::ALL.len())?;
            let merged = pipeline
                .run(&progress)
                .with_context(|| format!("processing {}", args.input.display()))?;
            progress.bar.finish_and_clear();
            println!("{}", merged.display());
        }
    }
    Ok(())
}
