//! Types every storyreel crate agrees on: ids, the error enum, media kinds,
//! tracks and 30 fps frame arithmetic, settings, and the event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod media;

pub use error::{Error, Result};
pub use ids::*;
pub use media::*;
