//! Manager configuration: the knobs passed to [`crate::mgr::FraigMgr::new`]
//! plus the logging wiring behind `set_loglevel`/`set_logstream`.
//!
//! One plain struct of settings rather than a long constructor parameter
//! list.

use std::io;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

pub use crate::sat::SolverKind;

/// Construction-time and runtime-tunable settings for a [`crate::mgr::FraigMgr`].
#[derive(Clone, Debug)]
pub struct FraigConfig {
    /// Number of 64-bit simulation words per node.
    pub sig_size: usize,
    /// Which SAT backend to mirror the AIG into.
    pub solver: SolverKind,
    /// Maximum number of consecutive SAT-unknown verdicts the equivalence
    /// engine will tolerate before giving up on the remaining candidate
    /// queue. `usize::MAX` means "run until the queue drains."
    pub loop_limit: usize,
    /// Minimum `tracing` level the manager's scoped subscriber emits.
    pub log_level: Level,
}

impl Default for FraigConfig {
    fn default() -> Self {
        FraigConfig {
            sig_size: 32,
            solver: SolverKind::default(),
            loop_limit: usize::MAX,
            log_level: Level::WARN,
        }
    }
}

/// Maps an integer log-level knob onto a `tracing::Level`:
/// `<=0` -> ERROR, 1 -> WARN, 2 -> INFO, 3 -> DEBUG, `>=4` -> TRACE.
pub fn level_from_int(level: i32) -> Level {
    match level {
        i32::MIN..=0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// A writer that can be swapped at runtime via `set_logstream`, used as the
/// manager's scoped subscriber sink.
#[derive(Clone)]
pub struct SwappableWriter {
    inner: std::sync::Arc<Mutex<Box<dyn io::Write + Send>>>,
}

impl SwappableWriter {
    pub fn new(writer: Box<dyn io::Write + Send>) -> Self {
        SwappableWriter {
            inner: std::sync::Arc::new(Mutex::new(writer)),
        }
    }

    pub fn swap(&self, writer: Box<dyn io::Write + Send>) {
        let mut guard = self.inner.lock().expect("log writer mutex poisoned");
        *guard = writer;
    }
}

impl io::Write for SwappableWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().expect("log writer mutex poisoned").write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().expect("log writer mutex poisoned").flush()
    }
}

impl<'a> MakeWriter<'a> for SwappableWriter {
    type Writer = SwappableWriter;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping_matches_documented_thresholds() {
        assert_eq!(level_from_int(-5), Level::ERROR);
        assert_eq!(level_from_int(0), Level::ERROR);
        assert_eq!(level_from_int(1), Level::WARN);
        assert_eq!(level_from_int(2), Level::INFO);
        assert_eq!(level_from_int(3), Level::DEBUG);
        assert_eq!(level_from_int(9), Level::TRACE);
    }

    #[test]
    fn default_config_runs_loop_until_drained() {
        let cfg = FraigConfig::default();
        assert_eq!(cfg.loop_limit, usize::MAX);
    }
}
