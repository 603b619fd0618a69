//! `cpi2prism` CLI library: argument parsing, logging setup, and the
//! compile/refine command driver. Split out from `main.rs` so integration
//! tests can exercise argument parsing and the pure helpers without
//! spawning a subprocess.

pub mod error;

use std::path::PathBuf;

use clap::Parser;
use cpi_checker::{
    refine, sample_expected_impacts, ProcessBoundsOracle, ProcessChecker, RefinementOutcome,
};
use cpi_compiler::render_property;
use cpi_core::Cpi;

pub use error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "cpi2prism",
    version,
    about = "Compiles a CPI (choreographic process instance) into a PRISM MDP and refines multi-impact reward bounds",
    help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}

Examples:
  cpi2prism model.json                         Compile only, write model.nm / model.pctl
  cpi2prism model.json -N 10                    Compile and refine bounds with budget 10
  cpi2prism model.json -N 10 --checker prism    Use a specific checker binary
"
)]
pub struct Cli {
    /// Path to the CPI JSON input file
    pub cpi: PathBuf,

    /// Output directory for the generated .nm/.pctl pair (default: alongside the input)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Basename (without extension) for the generated files (default: input file's stem)
    #[arg(long)]
    pub basename: Option<String>,

    /// Path to the external probabilistic model checker binary
    #[arg(long, default_value = "prism")]
    pub checker: PathBuf,

    /// Refinement budget N (§4.5). 0 means compile-only, no refinement.
    #[arg(short = 'N', long, default_value_t = 0)]
    pub budget: u32,

    /// Cap on expected loop iterations used by the initial bound sampler
    #[arg(long, default_value_t = cpi_checker::DEFAULT_MAX_LOOP_ITERATIONS)]
    pub max_loop_iterations: u32,

    /// Enable verbose (debug-level) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Extra flags forwarded verbatim to the checker invocation (e.g. -javamaxmem 4g)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub checker_flags: Vec<String>,
}

/// Installs the `tracing_subscriber` format layer, honoring `RUST_LOG`
/// when set and otherwise falling back to `debug`/`info` based on `-v`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Installs a SIGINT/SIGTERM handler so an interrupted refinement loop
/// exits cleanly instead of leaving a half-written property file (the
/// checker subprocess, if any, is reaped by the OS on parent exit).
pub fn install_sigint_handler() {
    let _ = ctrlc::set_handler(|| {
        tracing::warn!("interrupted, exiting");
        std::process::exit(130);
    });
}

/// `basename.ext` minus `ext`, falling back to `"model"` for paths with no
/// file stem (e.g. `.`, `..`, or a trailing slash).
pub fn stem_of(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string())
}

/// Resolves the `(model_path, property_path)` pair a given CLI invocation
/// will read and write, applying the `out_dir`/`basename` defaults
/// described in SPEC_FULL.md §3.3.
pub fn resolve_output_paths(cli: &Cli) -> (PathBuf, PathBuf) {
    let basename = cli.basename.clone().unwrap_or_else(|| stem_of(&cli.cpi));
    let out_dir = cli.out_dir.clone().unwrap_or_else(|| {
        cli.cpi
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    (
        out_dir.join(format!("{basename}.nm")),
        out_dir.join(format!("{basename}.pctl")),
    )
}

/// The whole command: load, compile, write, and (if `budget > 0`) refine.
pub fn run(cli: Cli) -> Result<(), CliError> {
    let json = std::fs::read_to_string(&cli.cpi)
        .map_err(|e| CliError::IoFailure(cli.cpi.clone(), e))?;
    let cpi = Cpi::load(&json)?;

    let model = cpi_compiler::compile(&cpi)?;
    let rendered_model = model.render();

    let (model_path, property_path) = resolve_output_paths(&cli);

    std::fs::write(&model_path, &rendered_model)
        .map_err(|e| CliError::IoFailure(model_path.clone(), e))?;

    let impact_summary = cpi.task_impacts();
    tracing::info!(
        tasks = impact_summary.len(),
        impacts = ?cpi.impact_names(),
        "compiled CPI to {}",
        model_path.display()
    );

    if cli.budget == 0 {
        let initial = sample_expected_impacts(&cpi, cli.max_loop_iterations);
        std::fs::write(&property_path, render_property(&initial))
            .map_err(|e| CliError::IoFailure(property_path.clone(), e))?;
        println!(
            "compiled {} and {}",
            model_path.display(),
            property_path.display()
        );
        return Ok(());
    }

    let initial = sample_expected_impacts(&cpi, cli.max_loop_iterations);
    let checker = ProcessChecker::new(cli.checker.clone());
    let oracle =
        ProcessBoundsOracle::new(&checker, &model_path, &property_path, &cli.checker_flags);

    let RefinementOutcome {
        final_bounds,
        budget_exhausted,
    } = refine(&initial, cli.budget, &oracle)?;

    println!("compiled {}", model_path.display());
    for (impact, bound) in &final_bounds {
        println!("  {impact}: {bound:.6}");
    }
    if budget_exhausted {
        println!("warning: no solution found within the given bounds");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_of_strips_extension() {
        assert_eq!(stem_of(std::path::Path::new("foo/bar.json")), "bar");
    }

    #[test]
    fn stem_of_falls_back_for_dotfiles() {
        assert_eq!(stem_of(std::path::Path::new(".")), "model");
    }

    #[test]
    fn resolve_output_paths_defaults_alongside_input() {
        let cli = Cli::try_parse_from(["cpi2prism", "/data/model.json"]).unwrap();
        let (model_path, property_path) = resolve_output_paths(&cli);
        assert_eq!(model_path, PathBuf::from("/data/model.nm"));
        assert_eq!(property_path, PathBuf::from("/data/model.pctl"));
    }

    #[test]
    fn resolve_output_paths_honors_out_dir_and_basename() {
        let cli = Cli::try_parse_from([
            "cpi2prism",
            "/data/model.json",
            "--out-dir",
            "/tmp/out",
            "--basename",
            "run1",
        ])
        .unwrap();
        let (model_path, property_path) = resolve_output_paths(&cli);
        assert_eq!(model_path, PathBuf::from("/tmp/out/run1.nm"));
        assert_eq!(property_path, PathBuf::from("/tmp/out/run1.pctl"));
    }

    #[test]
    fn defaults_match_spec() {
        let cli = Cli::try_parse_from(["cpi2prism", "model.json"]).unwrap();
        assert_eq!(cli.budget, 0);
        assert_eq!(cli.max_loop_iterations, cpi_checker::DEFAULT_MAX_LOOP_ITERATIONS);
        assert_eq!(cli.checker, PathBuf::from("prism"));
        assert!(!cli.verbose);
    }

    #[test]
    fn trailing_checker_flags_are_collected() {
        let cli = Cli::try_parse_from([
            "cpi2prism",
            "model.json",
            "-N",
            "5",
            "-javamaxmem",
            "4g",
        ])
        .unwrap();
        assert_eq!(cli.budget, 5);
        assert_eq!(cli.checker_flags, vec!["-javamaxmem".to_string(), "4g".to_string()]);
    }
}
