//! Integration tests
//!
//! Guest code driven through the dispatch loop into host functions.
