//! # gespin Core Library
//!
//! A spatially binned collection of nucleons living in a cubic simulation region with
//! periodic boundary conditions. The collection maintains a global likelihood, the product
//! of caller-supplied single-body and pairwise factors, and keeps it up to date
//! incrementally as nucleons are inserted, removed and moved.
//!
//! ## Architectural Philosophy
//!
//! The library is split into two layers:
//!
//! - **[`core`]: The Foundation.** Plain data models (`Nucleon`, `NucleonIdentity`),
//!   the `LikelihoodModel` capability through which callers score configurations, and
//!   small geometric utilities such as the minimum-image displacement.
//!
//! - **[`engine`]: The Logic Core.** The stateful machinery: the periodic `SpatialGrid`
//!   that bins nucleons, the `NucleonCollection` that keeps the likelihood current under
//!   every mutation, and the checkpoint/revert journal that lets a sampling driver roll
//!   back a sequence of trial moves.
//!
//! The crate deliberately contains no move proposal, acceptance rule or random number
//! source. It only provides what such a driver needs.

pub mod core;
pub mod engine;
