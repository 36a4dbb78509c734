pub mod annotation;
mod app;
pub mod audio;
pub mod clock;
pub mod config;
pub mod events;
mod lock;
pub mod presentation;
pub mod recall;
pub mod session;
pub mod storage;
mod telemetry;
pub mod terminal_restore;
pub mod timeline;
#[cfg(feature = "vad_earshot")]
pub mod vad_earshot;
pub mod voice;
pub mod wordpool;

pub use app::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
    log_timing, timings_enabled,
};
pub(crate) use lock::lock_or_recover;
pub use telemetry::{init_tracing, tracing_log_path};
