//! Graph layer: in-memory store, attribute filtering, hierarchy traversal.

pub mod filter;
pub mod hierarchy;
pub mod store;
pub mod traversal;
