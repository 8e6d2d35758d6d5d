//! Integration test modules for tapedeck

pub mod clipboard;
pub mod streaming;
pub mod transfer;
