//! Command-line plumbing for the solver binary.

pub(crate) mod cli;
