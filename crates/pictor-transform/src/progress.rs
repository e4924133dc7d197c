//! Shared progress and cancellation state for parallel passes

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pictor_core::{Error, ProgressMonitor, Raster};

use crate::error::TransformResult;

/// Tracks completed work units across worker threads and folds monitor
/// cancellation requests into a shared abort flag.
pub(crate) struct Progress {
    monitor: Option<ProgressMonitor>,
    tag: &'static str,
    span: u64,
    completed: AtomicU64,
    abort: AtomicBool,
}

impl Progress {
    pub fn new(raster: &Raster, tag: &'static str, span: u64) -> Self {
        Progress {
            monitor: raster.monitor.clone(),
            tag,
            span,
            completed: AtomicU64::new(0),
            abort: AtomicBool::new(false),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Record one completed work unit.
    pub fn step(&self) {
        if let Some(monitor) = &self.monitor {
            let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
            if !monitor(self.tag, completed, self.span) {
                self.abort.store(true, Ordering::Relaxed);
            }
        }
    }

    pub fn finish(self) -> TransformResult<()> {
        if self.is_aborted() {
            return Err(Error::OperationInterrupted(self.tag).into());
        }
        Ok(())
    }
}
