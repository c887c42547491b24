pub mod error;

pub mod encoding;
pub mod graph;
pub mod target;

pub mod aggregate;
pub mod rescale;

pub mod color;
pub mod hue;

pub mod arrows;

pub mod io;

pub use error::{ColorError, Result};
