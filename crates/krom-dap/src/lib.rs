//! Krom debug adapter.
//!
//! This crate does not speak DAP or CDP itself. It wraps a [`DebugEngine`]
//! (the DAP state machine plus its CDP connection) and adds what is specific
//! to Krom:
//! - building the project with khamake before launch,
//! - starting and stopping the Krom runtime,
//! - the "paused" overlay shown inside the game window.

pub mod adapter;
pub mod cdp;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod hardening;
pub mod standalone;

pub use crate::adapter::{KromDebugAdapter, KROM_THREAD_NAME};
pub use crate::debounce::DebounceGate;
pub use crate::engine::{
    AttachTarget, Capabilities, DebugEngine, EngineError, InitializeArgs, PausedEvent,
};
pub use crate::error::{AdapterError, AdapterResult, LaunchFailure};
