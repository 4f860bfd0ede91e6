//! Watch mode: re-run the sync whenever its inputs change.

mod error;
pub mod gate;
mod logging;
mod runtime;

pub use error::WatchError;
pub use gate::{GateState, RunGate};
pub use logging::init_tracing;
pub use runtime::{watch, DirWatch, Runner, StopSignal, SyncRunner, DEBOUNCE_WINDOW};
