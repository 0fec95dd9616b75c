//! Guest machine access

pub mod interface;
