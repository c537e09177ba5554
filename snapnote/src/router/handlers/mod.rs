//! Built-in action handlers
//!
//! Handlers are grouped by the part of the store they drive. Each group
//! exposes a `register_*` function; [`register_all`] installs every group.

pub mod notes;
pub mod session;
pub mod settings;
pub mod stats;

use super::HandlerRegistry;

/// Register every built-in action
pub fn register_all(registry: &mut HandlerRegistry) {
    notes::register_note_handlers(registry);
    stats::register_stats_handlers(registry);
    settings::register_settings_handlers(registry);
    session::register_session_handlers(registry);
}
