//! Interactive karaoke echo session.
//!
//! Ties the echoloop crates together behind a [`SessionController`]:
//!
//! - [`config`]: TOML settings for audio, initial parameters and display
//! - [`session`]: start/stop lifecycle and live parameter control
//! - [`render`]: frame-paced spectrum drawing on its own thread
//! - [`visual`]: bar heights and the sinks that draw them
//! - [`controls`]: the line-based command grammar
//!
//! ```rust,ignore
//! use echoloop_cli::{AppConfig, SessionController, TerminalBars};
//! use echoloop_io::CpalBackend;
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(Mutex::new(TerminalBars::new(std::io::stdout())));
//! let mut session = SessionController::new(Box::new(CpalBackend::try_new()?), &AppConfig::default(), sink);
//! session.start()?;
//! session.set_gain_percent(120.0);
//! session.stop()?;
//! ```

pub mod config;
pub mod controls;
pub mod error;
pub mod render;
pub mod session;
pub mod visual;

pub use config::AppConfig;
pub use controls::{Command, ParseError, Reply, execute};
pub use error::{ConfigError, STATUS_LIVE, STATUS_READY, STATUS_STARTING, SessionError};
pub use render::{DEFAULT_FRAME_INTERVAL, RenderLoop, RenderState};
pub use session::{Controls, Readouts, SessionController, SessionState};
pub use visual::{
    BarHeights, FLOOR, FLOOR_HEIGHT, MAX_HEIGHT, RecordingSink, TerminalBars, VisualizationSink,
    bar_height, bar_heights,
};
