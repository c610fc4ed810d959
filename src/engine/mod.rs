//! External fetch engine
//!
//! The orchestrator never downloads or converts media itself; it hands one
//! sub-operation at a time to a [`FetchEngine`]. Two implementations are
//! provided:
//!
//! - [`YtDlpEngine`]: drives the external `yt-dlp` binary (ffmpeg for MP3)
//! - [`UnavailableEngine`]: stand-in when yt-dlp is not installed
//!
//! ## Usage
//!
//! ```no_run
//! use redsea_dl::engine::{FetchEngine, FetchRequest, ProgressControl, YtDlpEngine};
//! use redsea_dl::types::{AudioQuality, FetchVariant};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = YtDlpEngine::from_path().expect("yt-dlp binary not found");
//!
//!     let request = FetchRequest {
//!         source: "https://youtu.be/dQw4w9WgXcQ".into(),
//!         title: "Never Gonna Give You Up".into(),
//!         destination_dir: "./downloads".into(),
//!         variant: FetchVariant::Video,
//!         quality: AudioQuality::default(),
//!         retries: 3,
//!     };
//!     engine.fetch(&request, &|_| ProgressControl::Continue).await?;
//!
//!     Ok(())
//! }
//! ```

mod cli;
mod parser;
mod traits;
mod unavailable;

pub use cli::{YtDlpEngine, locate_ffmpeg, locate_ytdlp};
pub use traits::{
    FetchEngine, FetchOutput, FetchProgress, FetchRequest, ProgressCallback, ProgressControl,
};
pub use unavailable::UnavailableEngine;
