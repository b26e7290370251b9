//! Built-in stage executors.
//!
//! Each wraps one provider together with the credentials and stage settings
//! of the current run.

mod image;
mod render;
mod voice;

pub use image::ImageExecutor;
pub use render::RenderExecutor;
pub use voice::VoiceExecutor;

/// `Some(trimmed)` when `value` holds non-whitespace text.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
