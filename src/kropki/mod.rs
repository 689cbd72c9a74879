#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! This module provides the Kropki puzzle file format and helpers around
//! the core engine.

/// The `puzzle` module contains the puzzle type, its text format and
/// solution verification.
pub mod puzzle;
