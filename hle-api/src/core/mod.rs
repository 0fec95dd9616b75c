//! Core types shared across the HLE workspace

pub mod types;
