// ============================================================
// Layer 6 — Logging
// ============================================================
// One tracing subscriber for the whole process, filtered by
// RUST_LOG on top of a default directive, plus the default
// SplitObserver that turns split warnings into log lines.

use tracing_subscriber::filter::Directive;

use crate::domain::error::SplitWarning;
use crate::domain::traits::SplitObserver;

/// Install the global subscriber. Safe to call more than once;
/// later calls are ignored.
pub fn init(default_directive: &str) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    match default_directive.parse::<Directive>() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring log directive '{default_directive}': {e}"),
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Renders every split warning as `tracing::warn!`
#[derive(Debug, Default)]
pub struct TracingObserver {
    warnings: usize,
}

impl TracingObserver {
    pub fn warnings(&self) -> usize {
        self.warnings
    }
}

impl SplitObserver for TracingObserver {
    fn warn(&mut self, warning: &SplitWarning) {
        self.warnings += 1;
        tracing::warn!("{}", warning);
    }

    fn dropped(&mut self, count: usize) {
        tracing::warn!("Dropped {} data points", count);
    }
}
