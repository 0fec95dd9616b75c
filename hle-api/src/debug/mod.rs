//! Host debugger integration

pub mod interface;
