//! Souq Core - Shared domain types for the storefront.
//!
//! This crate holds the visitor-side state and rules of the storefront:
//! - [`cart`] - Cart entries keyed by product
//! - [`favorites`] - Favorite product set
//! - [`checkout`] - Checkout form validation and the checkout state machine
//! - [`types`] - Newtype IDs, prices and currencies, email and phone numbers
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no sessions,
//! no HTTP clients. Persistence and the remote store API live in the
//! storefront crate, which drives these types.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod error;
pub mod favorites;
pub mod types;

pub use cart::{Cart, CartItem};
pub use error::ErrorKind;
pub use favorites::Favorites;
pub use types::*;
