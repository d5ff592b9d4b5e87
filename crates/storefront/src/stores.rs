//! Per-visitor state persisted in the session.
//!
//! The cart, favorites, checkout flow and last order live in the visitor's
//! `tower-sessions` session, one JSON value per key. `Persistent<T>` loads
//! the value once per request and writes the whole value back after every
//! mutation, so a reload always sees the latest state.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn add(mut cart: Persistent<Cart>) -> Result<(), StoreError> {
//!     cart.update(|cart| cart.add_to_cart(ProductId::new(1), 1)).await?;
//!     Ok(())
//! }
//! ```

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use serde::de::DeserializeOwned;
use souq_core::checkout::{CheckoutFlow, OrderConfirmation};
use souq_core::{Cart, Favorites};
use thiserror::Error;
use tower_sessions::Session;

use crate::error::AppError;

/// Errors reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The session layer is missing from the router.
    #[error("session unavailable: {0}")]
    Unavailable(&'static str),

    /// The session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// A value stored in the session under a fixed key.
pub trait Persisted: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Session key the value is stored under.
    const STORAGE_KEY: &'static str;
}

impl Persisted for Cart {
    const STORAGE_KEY: &'static str = "cart-storage";
}

impl Persisted for Favorites {
    const STORAGE_KEY: &'static str = "favorites-storage";
}

impl Persisted for CheckoutFlow {
    const STORAGE_KEY: &'static str = "checkout-flow";
}

impl Persisted for Option<OrderConfirmation> {
    const STORAGE_KEY: &'static str = "last-order";
}

/// A session-backed value, loaded on extraction.
#[derive(Debug)]
pub struct Persistent<T: Persisted> {
    session: Session,
    value: T,
}

impl<T: Persisted> Persistent<T> {
    /// Load the value from the session, or the default if none is stored.
    ///
    /// A stored value that no longer deserializes is discarded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Session` if the session store fails.
    pub async fn load(session: Session) -> Result<Self, StoreError> {
        let value = match session.get::<T>(T::STORAGE_KEY).await {
            Ok(value) => value.unwrap_or_default(),
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                tracing::warn!(
                    key = T::STORAGE_KEY,
                    error = %e,
                    "Discarding unreadable session value"
                );
                T::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { session, value })
    }

    /// The current value.
    #[must_use]
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Mutate the value and save it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Session` if saving fails. The in-memory value
    /// keeps the mutation either way.
    pub async fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> Result<R, StoreError> {
        let result = f(&mut self.value);
        self.save().await?;
        Ok(result)
    }

    /// Replace the value and save it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Session` if saving fails.
    pub async fn set(&mut self, value: T) -> Result<(), StoreError> {
        self.value = value;
        self.save().await
    }

    /// Reset to the default value and drop the key from the session.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Session` if the session store fails.
    pub async fn reset(&mut self) -> Result<(), StoreError> {
        self.value = T::default();
        self.session.remove::<serde_json::Value>(T::STORAGE_KEY).await?;
        Ok(())
    }

    /// Take the value out, leaving the persisted copy untouched.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.value
    }

    async fn save(&self) -> Result<(), StoreError> {
        self.session.insert(T::STORAGE_KEY, &self.value).await?;
        Ok(())
    }
}

impl<T: Persisted> Deref for Persistent<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<S, T> FromRequestParts<S> for Persistent<T>
where
    S: Send + Sync,
    T: Persisted,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| StoreError::Unavailable(message))?;
        Ok(Self::load(session).await?)
    }
}
