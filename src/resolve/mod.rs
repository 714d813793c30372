//! Metadata resolver module

pub mod models;
pub mod probe;
pub mod strategies;

pub use models::{NormalizedTrack, PlaylistContext};
pub use probe::resolve_probe;
pub use strategies::resolve_page;
