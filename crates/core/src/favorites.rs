//! Visitor favorites: a set of product IDs.

use serde::{Deserialize, Serialize};

use crate::ProductId;

/// Favorite products, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    ids: Vec<ProductId>,
}

impl Favorites {
    /// Create an empty favorites set.
    #[must_use]
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Add a product if it is not already a favorite.
    pub fn add(&mut self, product_id: ProductId) {
        if !self.is_favorite(product_id) {
            self.ids.push(product_id);
        }
    }

    /// Remove a product if it is a favorite.
    pub fn remove(&mut self, product_id: ProductId) {
        self.ids.retain(|id| *id != product_id);
    }

    /// Flip membership of a product. Returns `true` if it is now a favorite.
    pub fn toggle_favorite(&mut self, product_id: ProductId) -> bool {
        if self.is_favorite(product_id) {
            self.remove(product_id);
            false
        } else {
            self.ids.push(product_id);
            true
        }
    }

    /// Whether the product is a favorite.
    #[must_use]
    pub fn is_favorite(&self, product_id: ProductId) -> bool {
        self.ids.contains(&product_id)
    }

    /// Favorite product IDs.
    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }

    /// Number of favorites.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether there are no favorites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
