//! Core types for TechHub.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod email;
pub mod id;
pub mod phone;
pub mod price;
pub mod product;
pub mod profile;

pub use cart::{CartLine, CartSnapshot};
pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{PhoneNumber, PhoneNumberError};
pub use price::{Price, PriceError};
pub use product::{Product, ProductImage, ProductPage};
pub use profile::{DEFAULT_CATEGORY, UserProfile};
