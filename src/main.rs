use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use wafer_refine::batch::collect_input_files;
use wafer_refine::config::OptimizerConfig;
use wafer_refine::data::loader::load_file;
use wafer_refine::data::model::WaferDataset;
use wafer_refine::data::writer::{ArtifactSink, CsvSink};
use wafer_refine::optimize::controller::{
    Advance, Decision, PendingRemoval, RoundController, Termination,
};
use wafer_refine::optimize::ledger::RemovalAction;
use wafer_refine::report::CampaignReport;
use wafer_refine::stats;

/// Iteratively clean wafer thickness maps until they meet a uniformity
/// target. Acts as its own simulation owner: after each reduction the
/// thickness statistics are re-evaluated in place of an external re-run.
#[derive(Parser, Debug)]
#[command(name = "wafer-refine", version)]
struct Cli {
    /// JSON config file; missing file means defaults.
    #[arg(short, long, default_value = "refine_config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refine a single thickness map, confirming each removal.
    Run {
        /// Input file (.csv, or tab-separated .txt/.tsv/.dat)
        input: PathBuf,

        /// Apply removals without asking.
        #[arg(short = 'y', long)]
        yes: bool,

        /// Override the uniformity target (percent).
        #[arg(long)]
        uniformity: Option<f64>,

        /// Override the round budget.
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Detection method: iqr, z_score, or modified_z_score.
        #[arg(long)]
        method: Option<wafer_refine::optimize::detect::DetectionMethod>,

        /// Where artifacts land; defaults next to the input.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Headless sweep over every thickness map in a folder.
    Batch {
        /// Folder scanned recursively for .csv inputs.
        folder: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = OptimizerConfig::load(&cli.config)?;

    match cli.command {
        Command::Run {
            input,
            yes,
            uniformity,
            max_rounds,
            method,
            output_dir,
        } => {
            let mut config = config;
            config.batch_mode = yes;
            if let Some(u) = uniformity {
                config.uniformity_threshold = u;
            }
            if let Some(n) = max_rounds {
                config.max_outlier_rounds = n;
            }
            if let Some(m) = method {
                config.method = m;
            }
            config.validate()?;

            let out_dir = match output_dir {
                Some(dir) => dir,
                None => input
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            };

            let termination = run_campaign(&input, &out_dir, config, None)?;
            println!("{}: {termination}", input.display());
            Ok(())
        }
        Command::Batch { folder } => {
            let mut config = config;
            config.batch_mode = true;
            config.validate()?;
            run_batch(&folder, config)
        }
    }
}

// ---------------------------------------------------------------------------
// Campaign driver
// ---------------------------------------------------------------------------

/// Drive one campaign to termination, persisting every round's artifact and
/// appending a report row.
fn run_campaign(
    input: &Path,
    out_dir: &Path,
    config: OptimizerConfig,
    progress: Option<ProgressBar>,
) -> Result<Termination> {
    let dataset = load_file(input)?;
    let base = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("{}: unusable file name", input.display()))?
        .to_string();

    let origin = stats::summarize(&dataset.thickness_values());
    log::info!(
        "{base}: {} samples, uniformity {:.2}%",
        origin.count,
        origin.uniformity
    );

    let interactive = !config.batch_mode;
    let report_path = out_dir.join("refine_log.csv");
    let mut sink = CsvSink::new(out_dir);

    let mut controller = RoundController::new(dataset, base, config)?;
    if let Some(bar) = progress {
        controller = controller.with_progress(Box::new(move |round, max, message| {
            bar.set_message(format!("round {round}/{max}: {message}"));
        }));
    }

    let mut uniformity = origin.uniformity;
    let mut advance = controller.submit_result(uniformity)?;
    let termination = loop {
        match advance {
            Advance::Restart {
                artifact_id,
                dataset,
            } => {
                let written = sink.persist(&artifact_id, &dataset)?;
                log::info!("wrote {}", written.display());
                // Owner stand-in: re-evaluate the data-level uniformity in
                // place of an external simulation run.
                uniformity = stats::summarize(&dataset.thickness_values()).uniformity;
                advance = controller.submit_result(uniformity)?;
            }
            Advance::NeedsConfirmation(pending) => {
                let decision = if interactive {
                    prompt_decision(&pending, controller.dataset())?
                } else {
                    Decision::Continue
                };
                advance = controller
                    .confirm(decision)
                    .ok_or_else(|| anyhow!("confirmation gate vanished"))?;
            }
            Advance::Finished(t) => break t,
        }
    };

    CampaignReport::from_campaign(&controller, origin, &termination)
        .append_to(&report_path)?;

    Ok(termination)
}

/// Describe the pending removal and read a yes/no from stdin.
fn prompt_decision(pending: &PendingRemoval, dataset: &WaferDataset) -> Result<Decision> {
    let removed: Vec<f64> = pending
        .indices
        .iter()
        .map(|&i| dataset.samples[i].thickness)
        .collect();
    let lo = removed.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = removed.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    match pending.action {
        RemovalAction::OutlierRemoved => {
            println!(
                "Detected {} outlier(s): {lo:.2} – {hi:.2} nm",
                pending.indices.len()
            );
            if let Some((lower, upper)) = pending.bounds {
                println!("Inlier range: {lower:.2} – {upper:.2} nm");
            }
        }
        RemovalAction::MinRemoved => {
            println!(
                "No outliers left; lowest {} sample(s) at {lo:.2} nm would go next",
                pending.indices.len()
            );
        }
    }
    println!(
        "{} of {} samples would remain.",
        dataset.len() - pending.indices.len(),
        dataset.len()
    );
    print!("Remove and re-evaluate? [Y/n] ");
    std::io::stdout().flush().context("flushing prompt")?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("reading decision")?;

    match line.trim().to_ascii_lowercase().as_str() {
        "n" | "no" | "stop" => Ok(Decision::Stop),
        _ => Ok(Decision::Continue),
    }
}

// ---------------------------------------------------------------------------
// Batch sweep
// ---------------------------------------------------------------------------

fn run_batch(folder: &Path, config: OptimizerConfig) -> Result<()> {
    let selection = collect_input_files(folder)?;
    if selection.selected.is_empty() {
        println!("No .csv inputs under {}", folder.display());
        return Ok(());
    }
    if !selection.skipped.is_empty() {
        println!(
            "Skipping {} older round version(s); rerun picks up the latest artifacts.",
            selection.skipped.len()
        );
    }

    let bar = ProgressBar::new(selection.selected.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("progress template")?
            .progress_chars("█▓▒░ "),
    );

    let mut converged = 0usize;
    let mut failures: Vec<(PathBuf, String)> = Vec::new();

    for input in &selection.selected {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        bar.set_message(name);
        let out_dir = input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        match run_campaign(input, &out_dir, config.clone(), Some(bar.clone())) {
            Ok(Termination::Converged { .. }) => converged += 1,
            Ok(termination) => {
                log::warn!("{}: {termination}", input.display());
            }
            Err(e) => {
                log::error!("{}: {e:#}", input.display());
                failures.push((input.clone(), format!("{e:#}")));
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message("sweep complete");

    println!(
        "{} of {} campaign(s) converged.",
        converged,
        selection.selected.len()
    );
    for (path, error) in &failures {
        println!("  failed: {} ({error})", path.display());
    }
    Ok(())
}
