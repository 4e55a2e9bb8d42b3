//! Minimal packaging resolution.
//!
//! Finds the smallest single packaging that holds a set of products and
//! remembers the answer per product set. Stored results, a remote optimizer
//! and a local heuristic packer are consulted in a configurable order.

pub mod api;
pub mod catalog;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod geometry;
pub mod model;
pub mod products;
pub mod remote;
pub mod results;
pub mod store;
pub mod strategy;

#[cfg(test)]
mod testing;
