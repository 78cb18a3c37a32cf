//! A floating contextual toolbar for text selections and editable fields.
//!
//! The per-page half is [`controller::PanelController`], which drives the
//! pure [`machine::PanelMachine`] from page events. The shared half is
//! [`background::BackgroundCoordinator`], which owns settings, theme colors
//! and tab/search side effects. The two talk through [`protocol`] messages.

pub mod actions;
pub mod background;
pub mod clipboard;
pub mod constants;
pub mod controller;
pub mod debug_log;
pub mod drivers;
pub mod event_loop;
pub mod geometry;
pub mod link_tap;
pub mod machine;
pub mod page;
pub mod panel;
pub mod placement;
pub mod playground;
pub mod protocol;
pub mod settings;
pub mod theme;
pub mod timers;
pub mod tracing_sub;
