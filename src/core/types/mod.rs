pub mod config;
mod error;
mod hash;
mod model;
mod outcome;
mod snapshot;
mod unit;

pub use error::*;
pub use hash::*;
pub use model::*;
pub use outcome::*;
pub use snapshot::*;
pub use unit::*;
