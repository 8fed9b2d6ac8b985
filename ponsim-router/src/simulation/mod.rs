//! In-memory OLT/ONU devices for running a router without optical hardware.
//!
//! These models count traffic and hold flow tables; they do not simulate PON timing,
//! queueing or frame transformation.

mod simulated_subscriber;
mod simulated_terminal;

pub use simulated_subscriber::SimulatedSubscriber;
pub use simulated_terminal::SimulatedTerminal;
