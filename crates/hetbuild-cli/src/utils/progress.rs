use hetbuild::engine::progress::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const BAR_TEMPLATE: &str = "{msg:<10} [{bar:40.cyan/blue}] {pos}/{len} lower supercells ({eta})";

/// Styles are parsed once per handler; a template that fails to parse falls back to the
/// indicatif default instead of aborting the search.
#[derive(Clone)]
struct Styles {
    spinner: ProgressStyle,
    bar: ProgressStyle,
}

impl Styles {
    fn new() -> Self {
        let spinner = ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            })
            .progress_chars("##-");
        Self { spinner, bar }
    }
}

/// Shows the search phases ("Matching", "Ranking") as a spinner and the matcher sweep over
/// lower supercells as a bar on stderr. Escalation messages are printed above the bar.
#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    styles: Styles,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    /// Tracks state without drawing, used with `--quiet`.
    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let styles = Styles::new();
        let pb = ProgressBar::with_draw_target(Some(0), target)
            .with_style(styles.spinner.clone())
            .with_message("Preparing search");
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            styles,
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb = Arc::clone(&self.pb);
        let styles = self.styles.clone();

        Box::new(move |event: Progress| {
            let Ok(bar) = pb.lock() else {
                warn!("Progress bar mutex was poisoned; dropping progress event.");
                return;
            };
            apply(&bar, &styles, event);
        })
    }
}

fn apply(bar: &ProgressBar, styles: &Styles, event: Progress) {
    match event {
        Progress::PhaseStart { name } => {
            bar.reset();
            bar.set_length(0);
            bar.set_style(styles.spinner.clone());
            bar.set_message(name);
            bar.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        }
        Progress::TaskStart { total } => {
            bar.disable_steady_tick();
            bar.reset();
            bar.set_length(total);
            bar.set_style(styles.bar.clone());
        }
        Progress::TaskIncrement => bar.inc(1),
        Progress::TaskFinish => {
            // increments from worker threads may still be in flight
            bar.set_position(bar.length().unwrap_or(0));
            bar.finish();
        }
        Progress::PhaseFinish => {
            bar.disable_steady_tick();
            bar.finish_with_message("✓ Done");
        }
        Progress::Message(text) if bar.is_finished() => bar.set_message(text),
        Progress::Message(text) => bar.println(format!("  {text}")),
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}
