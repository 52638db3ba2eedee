//! DSA Mentor CLI library.
//!
//! Command-line front end over the mentoring pipeline.

pub mod cli;
pub mod commands;
