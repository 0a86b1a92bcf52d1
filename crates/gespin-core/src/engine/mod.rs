//! # Engine Module
//!
//! The stateful part of the library: spatial binning, incremental likelihood maintenance
//! and the checkpoint/revert journal.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Region size, bin resolution and pairwise reach
//! - **Spatial Binning** ([`grid`]) - The periodic grid of bins and the neighbor-bin traversal
//! - **Collection** ([`collection`]) - Insertion, removal and moves with incremental likelihood updates
//! - **Journaling** ([`journal`]) - Recorded position changes that a revert replays backwards
//! - **Error Handling** ([`error`]) - Errors surfaced by collection operations
//!
//! ## Key Capabilities
//!
//! - **Incremental likelihood** updated by factor ratios on insert, remove and move
//! - **Periodic boundaries** with pair factors evaluated through the nearest image
//! - **Exact rollback** of trial moves to the state captured at the last checkpoint

pub mod collection;
pub mod config;
pub mod error;
pub mod grid;
pub mod journal;
