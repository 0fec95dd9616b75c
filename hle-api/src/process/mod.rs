//! Guest process scheduling

pub mod interface;
