//! TechHub Core - Shared types library.
//!
//! This crate provides common types used across all TechHub components:
//! - `storefront` - Client library that synchronizes session, cart and profile
//!   state with the TechHub backend
//! - `cli` - Command-line front end driving the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure invariants - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, prices, emails and phone
//!   numbers, plus the cart and profile models

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
