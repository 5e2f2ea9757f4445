//! Shared building blocks of `starve`: configuration, interface discovery,
//! address helpers and the tagged log macros.

pub mod config;
pub mod log;
pub mod network;
