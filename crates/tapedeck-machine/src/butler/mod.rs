//! Background streaming between the frame window and storage.

mod config;
mod flush;
mod metrics;
mod refill;
mod request;
mod shared_state;
mod thread;
mod transfer;

pub use config::TapeConfig;
pub use metrics::{TapeMetrics, TapeMetricsSnapshot};
pub use request::{Transfer, TransferMode};

pub(crate) use request::{ClipboardRequest, Wake};
pub(crate) use shared_state::{SharedTape, TapeState};
pub(crate) use thread::ButlerThread;
