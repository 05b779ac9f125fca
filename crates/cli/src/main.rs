//! CLI for converting slide decks and PDFs onto a template's layouts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deck_core::{Config, LayoutId, SourceProfile, TemplateProfile, TransformationPlan};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Map every page of a deck or PDF onto the best-fitting layout of a template.
#[derive(Parser, Debug)]
#[command(name = "deckmorph")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON file overriding scoring, extraction and executor settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a template deck's theme and layout catalog
    Template {
        /// Template deck (.pptx)
        input: PathBuf,

        /// Write the profile here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute page signatures of a source deck or PDF
    Source {
        /// Source document (.pptx or .pdf)
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Match source pages against template layouts
    Plan {
        /// Template profile JSON
        #[arg(long)]
        template: PathBuf,

        /// Source profile JSON
        #[arg(long)]
        source: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Put one page of a plan on a different layout
    Swap {
        /// Plan JSON
        plan: PathBuf,

        /// Template profile JSON the plan was made from
        #[arg(long)]
        template: PathBuf,

        /// Zero-based source page index
        #[arg(long)]
        page: usize,

        /// Layout id, e.g. layout_2
        #[arg(long)]
        layout: LayoutId,

        /// Write the new plan here (default: overwrite the input plan)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build the converted deck
    Execute {
        /// Plan JSON
        #[arg(long)]
        plan: PathBuf,

        /// Template deck (.pptx)
        #[arg(long)]
        template: PathBuf,

        /// Source document (.pptx or .pdf)
        #[arg(long)]
        source: PathBuf,

        /// Output deck (.pptx)
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the execution report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Template { input, output } => {
            let bytes = read_file(&input)?;
            let profile = deck_engine::ingest_template(&bytes)
                .with_context(|| format!("Failed to ingest template {}", input.display()))?;
            if args.verbose {
                eprintln!("  Found {} layouts", profile.layout_catalog.len());
            }
            emit_json(&profile, output.as_deref())
        }

        Command::Source { input, output } => {
            let bytes = read_file(&input)?;
            let profile = deck_engine::ingest_source(&bytes, &file_name(&input), &config)
                .with_context(|| format!("Failed to ingest source {}", input.display()))?;
            if args.verbose {
                eprintln!("  Found {} readable pages", profile.pages.len());
            }
            emit_json(&profile, output.as_deref())
        }

        Command::Plan {
            template,
            source,
            output,
        } => {
            let template: TemplateProfile = read_json(&template)?;
            let source: SourceProfile = read_json(&source)?;
            let plan = deck_engine::create_plan(&template, &source, &config)?;
            emit_json(&plan, output.as_deref())
        }

        Command::Swap {
            plan: plan_path,
            template,
            page,
            layout,
            output,
        } => {
            let plan: TransformationPlan = read_json(&plan_path)?;
            let template: TemplateProfile = read_json(&template)?;
            let swapped = deck_engine::swap(&plan, &template, page, layout, &config)
                .with_context(|| format!("Cannot move page {} to {}", page, layout))?;
            emit_json(&swapped, Some(output.as_deref().unwrap_or(plan_path.as_path())))
        }

        Command::Execute {
            plan,
            template,
            source,
            output,
            report,
        } => {
            let plan: TransformationPlan = read_json(&plan)?;
            let template_bytes = read_file(&template)?;
            let source_bytes = read_file(&source)?;

            let result = deck_engine::execute(&plan, &template_bytes, &source_bytes, &config)
                .context("Execution failed")?;
            write_output(&output, &result.document)?;
            if args.verbose {
                eprintln!(
                    "Written {} slides to: {} ({} green, {} yellow)",
                    result.slide_count,
                    output.display(),
                    result.report.greens,
                    result.report.yellows
                );
            }

            match report {
                Some(path) => emit_json(&result.report, Some(path.as_path())),
                None => Ok(()),
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pretty JSON to `path`, or stdout when no path is given.
fn emit_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    json.push('\n');
    match path {
        Some(path) => write_output(path, json.as_bytes()),
        None => {
            print!("{}", json);
            Ok(())
        }
    }
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}
