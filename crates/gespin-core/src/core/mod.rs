//! # Core Module
//!
//! Stateless building blocks shared by the engine.
//!
//! - **Particle Representation** ([`models`]) - Nucleons, their identities and stable ids
//! - **Scoring** ([`likelihood`]) - The single-body and pairwise likelihood capability
//! - **Utilities** ([`utils`]) - Spherical coordinates, minimum-image geometry and identity aliases

pub mod likelihood;
pub mod models;
pub mod utils;
