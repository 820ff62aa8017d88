use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Roman Kempt",
    version,
    about = "hetbuild - find coincidence lattices of two 2D crystal lattices for building \
             heterostructure interfaces.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for all coincidence lattices within the given tolerances and rank them.
    Build(SearchArgs),
    /// Find the single lowest-strain match, relaxing the strain tolerance step by step.
    Match(MatchArgs),
}

/// Arguments shared by `build` and `match`.
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Path to the job file in TOML format ([lower] and [upper] lattices, search options).
    #[arg(required = true, value_name = "JOB")]
    pub job: PathBuf,

    /// Write the ranked results to this TOML file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    // --- Supercell Bounds ---
    /// Override the largest supercell multiple |det M| on each lattice.
    #[arg(short = 'N', long, value_name = "INT")]
    pub n_max: Option<u32>,

    /// Override the smallest supercell multiple |det M| on each lattice.
    #[arg(long, value_name = "INT")]
    pub n_min: Option<u32>,

    // --- Angle Sweep ---
    /// Explicit rotation angles of the upper lattice in degrees.
    #[arg(
        short,
        long,
        value_name = "DEG",
        num_args(1..),
        allow_negative_numbers = true,
        conflicts_with = "angle_limits"
    )]
    pub angles: Vec<f64>,

    /// Sweep the rotation between two limits in degrees (inclusive).
    #[arg(long, value_name = "DEG", num_args(2), allow_negative_numbers = true)]
    pub angle_limits: Option<Vec<f64>>,

    /// Step of the angle sweep in degrees.
    #[arg(long, value_name = "DEG", requires = "angle_limits")]
    pub angle_step: Option<f64>,

    // --- Tolerances ---
    /// Override the relative area tolerance (0.05 is 5%).
    #[arg(long = "area-tol", value_name = "FLOAT")]
    pub area_tolerance: Option<f64>,

    /// Override the relative strain tolerance (0.03 is 3%).
    #[arg(long = "strain-tol", value_name = "FLOAT")]
    pub strain_tolerance: Option<f64>,

    /// Override the cell angle tolerance in degrees.
    #[arg(long = "angle-tol", value_name = "DEG")]
    pub angle_tolerance: Option<f64>,

    /// Match reduced bases up to this residual twist in degrees instead of requiring
    /// the supercell vectors to coincide at each sweep angle.
    #[arg(long = "twist-tol", value_name = "DEG")]
    pub twist_tolerance: Option<f64>,

    // --- Output ---
    /// Override the maximum number of ranked results.
    #[arg(short = 'n', long, value_name = "INT")]
    pub max_results: Option<usize>,

    /// Deduplicate only identical sublattice pairs instead of using lattice symmetry.
    #[arg(long)]
    pub no_symmetry: bool,

    /// Set a specific configuration value, overriding the job file.
    /// Can be used multiple times. Example: -S tolerances.strain=0.02
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `match` subcommand.
#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    #[command(flatten)]
    pub search: SearchArgs,

    /// Increment of the strain tolerance between attempts.
    #[arg(long, value_name = "FLOAT")]
    pub strain_step: Option<f64>,

    /// Largest strain tolerance to try.
    #[arg(long, value_name = "FLOAT")]
    pub max_strain: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_arguments_are_parsed() {
        let cli = Cli::try_parse_from([
            "hetbuild", "-vv", "build", "job.toml", "-N", "12", "--strain-tol", "0.02", "-a", "0",
            "15.5", "-S", "tolerances.area=0.1",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Build(args) = cli.command else {
            panic!("expected build command");
        };
        assert_eq!(args.job, PathBuf::from("job.toml"));
        assert_eq!(args.n_max, Some(12));
        assert_eq!(args.strain_tolerance, Some(0.02));
        assert_eq!(args.angles, vec![0.0, 15.5]);
        assert_eq!(args.set_values, vec!["tolerances.area=0.1".to_string()]);
    }

    #[test]
    fn explicit_angles_conflict_with_limits() {
        let result = Cli::try_parse_from([
            "hetbuild", "build", "job.toml", "-a", "0", "--angle-limits", "0", "30",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn match_accepts_escalation_options() {
        let cli = Cli::try_parse_from([
            "hetbuild", "match", "job.toml", "--strain-step", "0.01", "--max-strain", "0.08",
        ])
        .unwrap();
        let Commands::Match(args) = cli.command else {
            panic!("expected match command");
        };
        assert_eq!(args.strain_step, Some(0.01));
        assert_eq!(args.max_strain, Some(0.08));
    }
}
