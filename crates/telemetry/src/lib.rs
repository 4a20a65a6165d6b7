//! Trace collection for baton runs.
//!
//! Implementations of the [`TraceSink`](baton_core::TraceSink) contract:
//! an in-memory collector that aggregates per-run traces and usage totals,
//! a broadcast fan-out for live subscribers, and a sink that forwards
//! events to the `tracing` facade. All sinks are best-effort — recording
//! never fails the run.

pub mod broadcast;
pub mod engine;
pub mod model;

pub use broadcast::BroadcastSink;
pub use engine::{InMemoryTraceSink, TracingSink};
pub use model::{RunTotals, RunTrace};
