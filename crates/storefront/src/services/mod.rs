//! Business logic services for the storefront client.
//!
//! # Services
//!
//! - `auth` - Login, registration and password reset
//! - `cart` - Optimistic cart with debounced remote sync
//! - `catalog` - Paged product listing, category filter and price sort
//! - `checkout` - Turns the cart into an estimate
//! - `profile` - Account profile fetch and edit
//! - `validation` - Form checks shared by the above

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod profile;
pub mod validation;
