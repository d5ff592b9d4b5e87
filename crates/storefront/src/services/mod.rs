//! Business logic services for storefront.
//!
//! # Services
//!
//! - `currency` - Resolve the display currency from the store's country
//! - `pixels` - Tracking pixel snippets and e-commerce events

pub mod currency;
pub mod pixels;
