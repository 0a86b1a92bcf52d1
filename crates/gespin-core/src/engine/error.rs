use thiserror::Error;

use super::config::ConfigError;
use crate::core::likelihood::LikelihoodError;
use crate::core::models::ids::NucleonId;

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Index {index} is out of range for a collection of {len} nucleons")]
    IndexOutOfRange { index: isize, len: usize },

    #[error("Nucleon {0:?} is not a member of this collection")]
    NucleonNotFound(NucleonId),

    #[error("Insertion slot {slot} is past the end of a collection of {len} nucleons")]
    InvalidSlot { slot: usize, len: usize },

    #[error("Nucleon coordinates must be finite, got ({x}, {y}, {z})")]
    NonFiniteCoordinate { x: f64, y: f64, z: f64 },

    #[error("Likelihood evaluation failed: {source}")]
    Likelihood {
        #[from]
        source: LikelihoodError,
    },

    #[error("Invalid collection configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}
