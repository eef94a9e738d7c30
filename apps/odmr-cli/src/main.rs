use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use odmr_presets::{PresetError, get_preset, get_preset_info, list_presets};
use odmr_project::{CompiledStudy, ProjectError, RunOutput, load_study};
use odmr_results::{ResultsError, RunManifest, RunStore, SOLVER_VERSION, compute_run_id};
use odmr_sim::{
    ContrastMethod, DEFAULT_INTEGRATION_POINTS, Drive, Lineshape, OdmrSimulation, SimError,
    SpectrumConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Results(#[from] ResultsError),

    #[error(transparent)]
    Preset(#[from] PresetError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "odmr")]
#[command(about = "Rate-equation simulator for optically detected magnetic resonance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List presets, or show one in detail
    Presets {
        /// Preset name
        name: Option<String>,
    },
    /// Validate a study file
    Validate {
        /// Path to the study YAML or JSON file
        study_path: PathBuf,
    },
    /// Execute the runs of a study, reusing cached results
    Run {
        /// Path to the study YAML or JSON file
        study_path: PathBuf,
        /// Only execute this run
        #[arg(long)]
        run: Option<String>,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Also write each output as `<run>.csv` into this directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List cached runs of a study
    Runs {
        /// Path to the study YAML or JSON file
        study_path: PathBuf,
    },
    /// Export a cached run as CSV
    Export {
        /// Path to the study YAML or JSON file
        study_path: PathBuf,
        /// Cached run ID
        run_id: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Contrast of a preset at one drive setting
    Contrast {
        #[arg(long, default_value = "nv_bulk")]
        preset: String,
        /// Optical pumping rate, MHz
        #[arg(long)]
        gamma: f64,
        /// Microwave rate on |0> <-> |->, MHz
        #[arg(long, default_value_t = 0.0)]
        kmw_minus: f64,
        /// Microwave rate on |0> <-> |+>, MHz
        #[arg(long, default_value_t = 0.0)]
        kmw_plus: f64,
        #[arg(long, value_enum, default_value_t = MethodArg::Steady)]
        method: MethodArg,
        /// Evaluation / integration time in seconds (transient, integrated)
        #[arg(long, default_value_t = 1e-5)]
        time: f64,
    },
    /// ODMR spectrum of a preset as CSV on stdout
    Spectrum {
        #[arg(long, default_value = "nv_bulk")]
        preset: String,
        /// Optical pumping rate, MHz
        #[arg(long, default_value_t = 0.1)]
        gamma: f64,
        /// Sweep center, GHz
        #[arg(long, default_value_t = 3.0)]
        center: f64,
        /// Sweep span, GHz
        #[arg(long, default_value_t = 0.5)]
        width: f64,
        #[arg(long, default_value_t = 101)]
        points: usize,
        /// Half width at half maximum, GHz
        #[arg(long, default_value_t = 0.05)]
        linewidth: f64,
        /// Microwave rate at resonance, MHz
        #[arg(long, default_value_t = 1.0)]
        amplitude: f64,
        #[arg(long)]
        gaussian: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    Steady,
    Transient,
    Integrated,
}

impl MethodArg {
    fn method(self, time: f64) -> ContrastMethod {
        match self {
            MethodArg::Steady => ContrastMethod::SteadyState,
            MethodArg::Transient => ContrastMethod::transient(time),
            MethodArg::Integrated => ContrastMethod::TimeIntegrated {
                t_integration: time,
                n_points: DEFAULT_INTEGRATION_POINTS,
            },
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Presets { name } => cmd_presets(name.as_deref()),
        Commands::Validate { study_path } => cmd_validate(&study_path),
        Commands::Run {
            study_path,
            run,
            no_cache,
            out,
        } => cmd_run(&study_path, run.as_deref(), !no_cache, out.as_deref()),
        Commands::Runs { study_path } => cmd_runs(&study_path),
        Commands::Export {
            study_path,
            run_id,
            output,
        } => cmd_export(&study_path, &run_id, output.as_deref()),
        Commands::Contrast {
            preset,
            gamma,
            kmw_minus,
            kmw_plus,
            method,
            time,
        } => cmd_contrast(&preset, Drive::new(gamma, kmw_minus, kmw_plus), method.method(time)),
        Commands::Spectrum {
            preset,
            gamma,
            center,
            width,
            points,
            linewidth,
            amplitude,
            gaussian,
        } => {
            let config = SpectrumConfig {
                gamma,
                freq_center: center,
                freq_width: width,
                n_points: points,
                linewidth,
                kmw_amplitude: amplitude,
                lineshape: if gaussian {
                    Lineshape::Gaussian
                } else {
                    Lineshape::Lorentzian
                },
                ..SpectrumConfig::default()
            };
            cmd_spectrum(&preset, &config)
        }
    }
}

fn cmd_presets(name: Option<&str>) -> CliResult<()> {
    let Some(name) = name else {
        println!("Presets:");
        for entry in list_presets() {
            println!("  {:<14} {}", entry.name, entry.description);
        }
        return Ok(());
    };

    let entry = get_preset_info(name)?;
    println!("{}: {}", entry.name, entry.description);
    println!("{}", entry.rates.rate_summary());
    println!("References:");
    for reference in entry.references {
        println!("  {}", reference);
    }
    Ok(())
}

fn cmd_validate(study_path: &Path) -> CliResult<()> {
    println!("Validating study: {}", study_path.display());
    // Loading validates; compiling catches wiring the schema cannot see.
    let study = load_study(study_path)?;
    CompiledStudy::compile(&study)?;
    println!("✓ Study is valid ({} runs)", study.runs.len());
    Ok(())
}

fn cmd_run(study_path: &Path, only: Option<&str>, use_cache: bool, out: Option<&Path>) -> CliResult<()> {
    let study = load_study(study_path)?;
    if let Some(id) = only {
        if !study.runs.iter().any(|run| run.id == id) {
            return Err(ProjectError::UnknownRun { id: id.to_string() }.into());
        }
    }
    let compiled = CompiledStudy::compile(&study)?;
    let store = RunStore::for_study(study_path)?;
    if let Some(dir) = out {
        std::fs::create_dir_all(dir)?;
    }

    for run in study.runs.iter().filter(|run| only.is_none_or(|id| run.id == id)) {
        let run_id = compute_run_id(&study.model, study.solver.as_ref(), &run.kind, SOLVER_VERSION);
        let started = Instant::now();

        let output = if use_cache && store.has_run(&run_id) {
            let (_, output) = store.load_run(&run_id)?;
            println!("✓ {}: loaded from cache ({})", run.id, short_id(&run_id));
            output
        } else {
            let output = compiled.execute_run(run)?;
            let manifest = RunManifest::new(run_id.clone(), &study.name, &run.id, &output, SOLVER_VERSION);
            store.save_run(&manifest, &output)?;
            println!(
                "✓ {}: completed in {:.3}s ({})",
                run.id,
                started.elapsed().as_secs_f64(),
                short_id(&run_id)
            );
            output
        };
        print_summary(&output);

        if let Some(dir) = out {
            let path = dir.join(format!("{}.csv", run.id));
            std::fs::write(&path, output_csv(&output))?;
            info!(path = %path.display(), "Wrote CSV");
        }
    }
    Ok(())
}

fn cmd_runs(study_path: &Path) -> CliResult<()> {
    let study = load_study(study_path)?;
    let store = RunStore::for_study(study_path)?;
    let runs = store.list_runs(&study.name)?;

    if runs.is_empty() {
        println!("No cached runs found for study: {}", study.name);
    } else {
        println!("Cached runs for study '{}':", study.name);
        for manifest in runs {
            println!(
                "  {} {} ({}, {})",
                manifest.run_id, manifest.run, manifest.timestamp, manifest.solver_version
            );
        }
    }
    Ok(())
}

fn cmd_export(study_path: &Path, run_id: &str, output: Option<&Path>) -> CliResult<()> {
    let store = RunStore::for_study(study_path)?;
    let (_manifest, run_output) = store.load_run(run_id)?;
    let csv = output_csv(&run_output);

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!("✓ Exported run {} to {}", run_id, path.display());
    } else {
        print!("{}", csv);
    }
    Ok(())
}

fn cmd_contrast(preset: &str, drive: Drive, method: ContrastMethod) -> CliResult<()> {
    let system = get_preset(preset)?;
    let contrast = OdmrSimulation::new(&system).compute_contrast(drive, &method)?;
    println!(
        "gamma={} MHz kmw_minus={} MHz kmw_plus={} MHz contrast={:.6e}",
        drive.gamma, drive.kmw_minus, drive.kmw_plus, contrast
    );
    Ok(())
}

fn cmd_spectrum(preset: &str, config: &SpectrumConfig) -> CliResult<()> {
    let system = get_preset(preset)?;
    let spectrum = OdmrSimulation::new(&system).run_spectrum(config)?;

    let mut csv = String::from("frequency_ghz,contrast,kmw_minus,kmw_plus\n");
    for k in 0..spectrum.frequencies.len() {
        let _ = writeln!(
            csv,
            "{},{},{},{}",
            spectrum.frequencies[k], spectrum.contrast[k], spectrum.kmw_minus[k], spectrum.kmw_plus[k]
        );
    }
    print!("{}", csv);
    Ok(())
}

fn short_id(run_id: &str) -> &str {
    &run_id[..run_id.len().min(12)]
}

fn print_summary(output: &RunOutput) {
    match output {
        RunOutput::Series(series) => {
            let t_end = series.times_s.last().copied().unwrap_or(0.0);
            println!(
                "  {} samples up to {:.3e} s, columns: {}",
                series.times_s.len(),
                t_end,
                series.columns.join(", ")
            );
        }
        RunOutput::Contrast(contrast) => {
            let best = contrast
                .points
                .iter()
                .max_by(|a, b| a.contrast.total_cmp(&b.contrast));
            match best {
                Some(point) => println!(
                    "  {} points, max contrast {:.4e} at {} = {}",
                    contrast.points.len(),
                    point.contrast,
                    contrast.x_label,
                    point.x
                ),
                None => println!("  no points"),
            }
        }
    }
}

fn output_csv(output: &RunOutput) -> String {
    let mut csv = String::new();
    match output {
        RunOutput::Series(series) => {
            let _ = writeln!(csv, "time_s,{}", series.columns.join(","));
            for (t, row) in series.times_s.iter().zip(&series.rows) {
                let values: Vec<String> = row.iter().map(f64::to_string).collect();
                let _ = writeln!(csv, "{},{}", t, values.join(","));
            }
        }
        RunOutput::Contrast(contrast) => {
            let _ = writeln!(csv, "{},contrast,kmw_minus,kmw_plus", contrast.x_label);
            for p in &contrast.points {
                let _ = writeln!(csv, "{},{},{},{}", p.x, p.contrast, p.kmw_minus, p.kmw_plus);
            }
        }
    }
    csv
}
