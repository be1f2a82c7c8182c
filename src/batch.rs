//! Batch state
//!
//! Tracks whether a batch is open and, in buffered mode, the ordered log
//! of writes waiting for commit.

use crate::backend::StoredValue;
use crate::config::BatchMode;

/// A pending write
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Store a value under a key
    Put { key: String, value: StoredValue },

    /// Delete a key
    Remove { key: String },

    /// Wipe the namespace
    Clear,
}

/// Open/closed flag plus the pending write log
#[derive(Debug, Default)]
pub struct Batch {
    mode: BatchMode,
    open: bool,
    pending: Vec<Operation>,
}

impl Batch {
    pub fn new(mode: BatchMode) -> Self {
        Self {
            mode,
            open: false,
            pending: Vec::new(),
        }
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether writes should be logged instead of applied
    pub fn is_buffering(&self) -> bool {
        self.open && self.mode == BatchMode::Buffered
    }

    pub fn begin(&mut self) {
        self.open = true;
        self.pending.clear();
    }

    pub fn push(&mut self, op: Operation) {
        self.pending.push(op);
    }

    pub fn pending(&self) -> &[Operation] {
        &self.pending
    }

    /// Close the batch and hand back the log
    pub fn take(&mut self) -> Vec<Operation> {
        self.open = false;
        std::mem::take(&mut self.pending)
    }

    /// Close the batch, dropping the log. Returns how many writes were dropped.
    pub fn discard(&mut self) -> usize {
        self.take().len()
    }
}
