//! TechHub storefront client library.
//!
//! Session restore, catalog listing, an optimistic cart kept in sync with the
//! backend, checkout into an estimate, and profile editing. Presentation
//! layers drive everything through [`state::Storefront`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod services;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;
