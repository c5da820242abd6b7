use super::registry;
use crate::logging::RunLog;
use std::sync::Once;

/// Exit status used after cleaning up on SIGINT, SIGTERM or SIGHUP.
pub const SIGNAL_EXIT_CODE: i32 = 130;

static INSTALL: Once = Once::new();

/// Installs the process-wide termination handler once. A host application
/// that already owns the handler keeps it; cleanup then only runs through
/// normal teardown.
pub fn install_termination_handler(log: &RunLog) {
    INSTALL.call_once(|| {
        let handler_log = log.clone();
        let result = ctrlc::set_handler(move || {
            let cleaned = registry::cleanup_all();
            handler_log.warn("teardown.signal", &format!("runs_cleaned={cleaned}"));
            std::process::exit(SIGNAL_EXIT_CODE);
        });
        if let Err(err) = result {
            log.warn(
                "teardown.signal",
                &format!("termination handler not installed: {err}"),
            );
        }
    });
}
