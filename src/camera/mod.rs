//! Camera stream status and URL resolution

mod status;
mod url;

pub use status::{CameraStreamStatus, CameraUpdate};
pub use url::{resolve_stream_url, DEFAULT_STREAM_PATH};
