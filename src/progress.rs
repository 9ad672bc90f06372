// src/progress.rs
/// Lightweight progress reporting used by long-running operations
/// (bootstrap sweep, time resolution, multi-day aggregation).
/// Frontends implement this to surface status text to users.
pub trait Progress {
    /// Called at the start with the total number of items (days, people).
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line for human eyes.
    fn log(&mut self, _msg: &str) {}

    /// One logical unit completed (a day, a person).
    fn item_done(&mut self, _idx: usize) {}

    /// One logical unit degraded to its "not found" / omitted state.
    fn item_failed(&mut self, _idx: usize, _why: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// Collects status lines; handy in tests.
#[derive(Default, Debug)]
pub struct RecordingProgress {
    pub lines: Vec<String>,
    pub done: Vec<usize>,
    pub failed: Vec<usize>,
    pub finished: bool,
}

impl Progress for RecordingProgress {
    fn log(&mut self, msg: &str) { self.lines.push(msg.to_string()); }
    fn item_done(&mut self, idx: usize) { self.done.push(idx); }
    fn item_failed(&mut self, idx: usize, _why: &str) { self.failed.push(idx); }
    fn finish(&mut self) { self.finished = true; }
}
