//! Cooperative stop signal shared by the service loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AppResult;

/// Cloneable stop flag.
///
/// Loops check it between units of work, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag on SIGINT or SIGTERM.
    pub fn register_signals(&self) -> AppResult<()> {
        for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&self.flag))?;
        }
        tracing::debug!("stop signal handlers installed");
        Ok(())
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
