//! Interfaces to the external collaborators.
//!
//! The orchestrator only sees these traits; production implementations
//! shell out to the real tools (see `tools`), tests substitute in-memory
//! fakes with canned listings and results.

pub mod archiver;
pub mod confirm;
pub mod transport;

pub use self::archiver::Archiver;
pub use self::confirm::{Confirm, TerminalConfirm};
pub use self::transport::Transport;
