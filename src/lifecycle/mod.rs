//! Lifecycle management subsystem.
//!
//! # States
//! ```text
//! Idle → Running → Draining → Stopped
//! ```
//! Transitions are strictly forward; no state is re-entered.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → graceful stop (drain)
//!     second signal  → forced stop (abandon in-flight work)
//!
//! Stop sequence:
//!     stop() → Draining → acceptor closed → workers finish current
//!     request → active set empties → Stopped
//! ```
//!
//! # Design Decisions
//! - State lives in a watch channel so every task observes transitions
//!   without polling
//! - Stop drains rather than kills; only the forced path abandons work

pub mod signals;
pub mod state;

pub use signals::SignalBridge;
pub use state::LifecycleState;
