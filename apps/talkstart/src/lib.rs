//! # talkstart
//!
//! Terminal wizard and HTTP server for the talkstart toddler speech
//! screening. The screening logic lives in `talkstart-core`; this crate
//! adds configuration, analytics delivery and the two front ends.

pub mod analytics;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
