//! Guest log forwarding
//!
//! The guest logs through a plain C callback handed to it at load time.
//! Lines are re-emitted on the `log` facade under the `guest` target.

use crate::ffi::LogLevel;

/// Target used for every forwarded line
pub const GUEST_LOG_TARGET: &str = "guest";

/// Map a raw guest level onto `log`. Unknown levels are treated as info.
pub fn log_level(raw: u8) -> log::Level {
    match LogLevel::from_raw(raw) {
        Some(LogLevel::Error) => log::Level::Error,
        Some(LogLevel::Warning) => log::Level::Warn,
        Some(LogLevel::Info) | None => log::Level::Info,
        Some(LogLevel::Debug) => log::Level::Debug,
    }
}

/// Emit one guest line
pub fn forward(raw_level: u8, message: &[u8]) {
    let text = String::from_utf8_lossy(message);
    log::log!(target: GUEST_LOG_TARGET, log_level(raw_level), "{}", text.trim_end());
}

/// C entry point passed to the guest's `load`
pub unsafe extern "C" fn guest_logger(level: u8, bytes: *const u8, len: usize) {
    if bytes.is_null() {
        return;
    }
    let message = std::slice::from_raw_parts(bytes, len);
    forward(level, message);
}
