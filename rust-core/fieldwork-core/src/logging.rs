//! Log subscriber setup
//!
//! The engine only emits `tracing` events; applications that want to see them
//! without their own subscriber call [`init`].

use crate::config::{LogSettings, Settings};
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber configured from [`Settings::global`]
///
/// Does nothing if a global subscriber is already set.
pub fn init() {
    init_with(&Settings::global().log);
}

/// Install a global `fmt` subscriber with explicit settings
///
/// The directive is added on top of `RUST_LOG`; an unparsable directive is
/// skipped. Returns whether this call installed the subscriber.
pub fn init_with(settings: &LogSettings) -> bool {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = settings.directive.parse() {
        filter = filter.add_directive(directive);
    }
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if settings.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        tracing::debug!(directive = %settings.directive, json = settings.json, "Logging initialized");
    }
    installed
}
