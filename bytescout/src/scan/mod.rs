//! The scan engine: a single walker thread feeding a fixed pool of workers
//! through one-task slots.
//!
//! ```text
//!   Walker ──assign──▶ Slot 0 ──▶ Worker 0 ──┐
//!          ──assign──▶ Slot 1 ──▶ Worker 1 ──┼──▶ ReportSink
//!          ──assign──▶ Slot N ──▶ Worker N ──┘
//! ```
//!
//! The walker blocks when every slot is busy, so at most N files are in
//! flight. Once the walk is done the pool coordinator waits for every slot to
//! drain back to Ready, stops every slot, and joins every worker.
pub mod engine;
pub mod matcher;
pub mod pool;
pub mod slot;
pub mod walker;
pub mod worker;

pub use engine::scan;
pub use matcher::ByteMatcher;
pub use pool::WorkerPool;
pub use slot::{ScanTask, SlotBoard, SlotState};
pub use walker::Walker;
