//! Core types for the Souq storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod phone;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use phone::{DialingCountry, PhoneError, PhoneNumber};
pub use price::{Currency, PriceError, PriceTier, format_amount};
