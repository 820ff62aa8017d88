use crate::cli::MatchArgs;
use crate::config::builder::{EscalationOverrides, build_config};
use crate::error::Result;
use crate::output::{build_output, format_table, write_output};
use crate::utils::progress::CliProgressHandler;
use hetbuild::engine::progress::ProgressReporter;
use hetbuild::workflows;
use tracing::info;

pub fn run(args: MatchArgs, show_progress: bool) -> Result<()> {
    let overrides = EscalationOverrides {
        strain_step: args.strain_step,
        max_strain: args.max_strain,
    };
    info!("Merging configuration from job file and CLI arguments...");
    let config = build_config(&args.search, overrides)?;

    let progress_handler = if show_progress {
        CliProgressHandler::new()
    } else {
        CliProgressHandler::hidden()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let symmetry = config.symmetry.service();

    println!(
        "Relaxing the strain tolerance up to {:.2}% until '{}' and '{}' match...",
        config.escalation.max * 100.0,
        config.lower.name,
        config.upper.name
    );
    let outcome = workflows::escalate::run(
        &config.lower.lattice,
        &config.upper.lattice,
        &config.search,
        &config.escalation,
        symmetry.as_ref(),
        &reporter,
    )?;
    info!(
        "Escalation stopped at strain tolerance {:.4} with {} result(s).",
        outcome.strain_tolerance,
        outcome.results.len()
    );

    let best = build_output(&config, outcome.strain_tolerance, &[outcome.best])?;
    print!("{}", format_table(&best)?);
    println!(
        "✓ Best match found at strain tolerance {:.2}%",
        outcome.strain_tolerance * 100.0
    );

    if let Some(path) = &config.output_path {
        let output = build_output(&config, outcome.strain_tolerance, &outcome.results)?;
        write_output(path, &output)?;
        println!("✓ {} result(s) written to: {}", output.results.len(), path.display());
    }

    Ok(())
}
