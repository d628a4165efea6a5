//! Souq Core - Shared catalog types.
//!
//! This crate provides the types that cross the boundary between the REST
//! catalog and the client-side cart:
//! - `cart` - Persisted shopping cart state container
//! - `cli` - Command-line tools for inspecting and editing a local cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product identities, product records, and decimal prices

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
