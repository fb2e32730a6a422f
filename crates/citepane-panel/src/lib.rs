//! Citepane panel layer
//!
//! The slideout panel's navigation state machine ([`PanelNavigator`])
//! and the debounced hover open/close controller ([`HoverTrigger`]).
//! Both are UI-toolkit agnostic: the state machine holds ids only, and
//! hover timing is modeled as cancellable scheduled tasks emitting
//! events.

#![warn(missing_docs)]

pub mod hover;
pub mod state;

pub use hover::{HoverConfig, HoverEvent, HoverTrigger};
pub use state::{PanelNavigator, PanelState};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
