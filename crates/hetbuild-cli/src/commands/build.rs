use crate::cli::SearchArgs;
use crate::config::builder::{EscalationOverrides, build_config};
use crate::error::Result;
use crate::output::{build_output, format_table, write_output};
use crate::utils::progress::CliProgressHandler;
use hetbuild::engine::progress::ProgressReporter;
use hetbuild::workflows;
use tracing::info;

pub fn run(args: SearchArgs, show_progress: bool) -> Result<()> {
    info!("Merging configuration from job file and CLI arguments...");
    let config = build_config(&args, EscalationOverrides::default())?;

    let progress_handler = if show_progress {
        CliProgressHandler::new()
    } else {
        CliProgressHandler::hidden()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let symmetry = config.symmetry.service();

    println!(
        "Searching coincidence lattices of '{}' and '{}'...",
        config.lower.name, config.upper.name
    );
    info!("Invoking the core search workflow...");
    let results = workflows::search::run(
        &config.lower.lattice,
        &config.upper.lattice,
        &config.search,
        symmetry.as_ref(),
        &reporter,
    )?;
    info!("Workflow finished, received {} result(s).", results.len());

    let output = build_output(&config, config.search.tolerances.strain, &results)?;
    print!("{}", format_table(&output)?);

    if let Some(path) = &config.output_path {
        write_output(path, &output)?;
        println!("✓ {} result(s) written to: {}", output.results.len(), path.display());
    }

    Ok(())
}
