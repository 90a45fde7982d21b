//! Log output that steps aside while a progress bar owns the terminal
//!
//! Every pipeline event is logged as well as rendered. While the download
//! bar is drawn, the bar prints those lines itself, so stderr logging is
//! paused to keep them from appearing twice.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::Filter;

static QUIET: AtomicBool = AtomicBool::new(false);

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::SeqCst)
}

/// Pauses log output until dropped
#[must_use = "logging resumes as soon as the guard is dropped"]
pub struct QuietGuard {
    previous: bool,
}

impl QuietGuard {
    pub fn begin() -> Self {
        Self {
            previous: QUIET.swap(true, Ordering::SeqCst),
        }
    }
}

impl Drop for QuietGuard {
    fn drop(&mut self) {
        QUIET.store(self.previous, Ordering::SeqCst);
    }
}

/// Per-layer filter that drops every event while a `QuietGuard` is alive
pub fn unless_quiet<S>() -> impl Filter<S> {
    filter_fn(|_| !is_quiet())
}
