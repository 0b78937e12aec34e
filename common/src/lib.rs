//! # HostPin Common
//!
//! Shared domain model for the workspace: the candidate `(ip, domain)` pairs,
//! the per-IP probe targets built from them, probe outcomes, the managed-block
//! markers and the explicit [`config::Config`] value every component receives.
//!
//! Nothing in here touches the network or the hosts file.

pub mod config;
pub mod markers;
pub mod network;

/// Logs a milestone on the `hostpin::success` target.
///
/// The terminal formatter renders these with a distinct glyph.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "hostpin::success", $($arg)*)
    };
}
