//! # Core Models Module
//!
//! Data structures describing the particles held by a collection.
//!
//! - [`nucleon`] - The nucleon record with its position, identity, radius and cached factors
//! - [`ids`] - Stable identifiers for nucleons registered in a collection
//! - [`cell`] - Integer coordinates of a bin in the spatial grid
//!
//! ```ignore
//! use gespin::core::models::nucleon::{Nucleon, NucleonIdentity};
//!
//! let proton = Nucleon::new(0.5, 0.0, -1.0).with_identity(NucleonIdentity::Proton);
//! assert_eq!(proton.identity(), NucleonIdentity::Proton);
//! ```

pub mod cell;
pub mod ids;
pub mod nucleon;
