//! Visitor cart.
//!
//! The cart references products by ID only; names and prices are looked up
//! from the store API when the cart is rendered. Entries keep insertion order.

use serde::{Deserialize, Serialize};

use crate::ProductId;

/// One product in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product reference (not owned by the cart).
    #[serde(rename = "id")]
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: u32,
}

/// The visitor's cart: at most one entry per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add `quantity` units of a product.
    ///
    /// Increments the existing entry if the product is already in the cart,
    /// otherwise appends a new entry. Adding zero units is a no-op.
    pub fn add_to_cart(&mut self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.entry_mut(product_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id,
                quantity,
            }),
        }
    }

    /// Remove a product from the cart. Absent products are ignored.
    pub fn remove_from_cart(&mut self, product_id: ProductId) {
        self.items.retain(|item| item.product_id != product_id);
    }

    /// Overwrite the quantity of a product already in the cart.
    ///
    /// A quantity of zero removes the entry, so the cart never holds empty
    /// lines. Products not in the cart are left untouched. Returns whether
    /// the cart contained the product.
    pub fn update_quantity(&mut self, product_id: ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            let before = self.items.len();
            self.remove_from_cart(product_id);
            return self.items.len() != before;
        }
        match self.entry_mut(product_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units across all entries.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Whether the product is in the cart.
    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }

    /// Quantity of a product, zero when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map_or(0, |item| item.quantity)
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn entry_mut(&mut self, product_id: ProductId) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| item.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn pid(id: i64) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn test_add_new_and_existing() {
        let mut cart = Cart::new();
        cart.add_to_cart(pid(1), 1);
        cart.add_to_cart(pid(2), 3);
        cart.add_to_cart(pid(1), 2);

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.quantity_of(pid(1)), 3);
        assert_eq!(cart.item_count(), 6);
        assert_eq!(cart.items()[0].product_id, pid(1));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new();
        cart.add_to_cart(pid(1), 2);
        let before = cart.clone();

        cart.remove_from_cart(pid(99));

        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_quantity_overwrites() {
        let mut cart = Cart::new();
        cart.add_to_cart(pid(1), 5);
        assert!(cart.update_quantity(pid(1), 2));
        assert_eq!(cart.quantity_of(pid(1)), 2);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add_to_cart(pid(1), 5);
        assert!(cart.update_quantity(pid(1), 0));
        assert!(!cart.is_in_cart(pid(1)));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_absent_product() {
        let mut cart = Cart::new();
        assert!(!cart.update_quantity(pid(7), 3));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut cart = Cart::new();
        cart.add_to_cart(pid(1), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let mut cart = Cart::new();
        cart.add_to_cart(pid(4), 2);
        let json = serde_json::to_string(&cart).unwrap();
        assert_eq!(json, r#"[{"id":4,"quantity":2}]"#);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(i64, u32),
        Remove(i64),
        Update(i64, u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0i64..6, 0u32..5).prop_map(|(id, q)| Op::Add(id, q)),
            (0i64..6).prop_map(Op::Remove),
            (0i64..6, 0u32..5).prop_map(|(id, q)| Op::Update(id, q)),
        ]
    }

    proptest! {
        #[test]
        fn prop_one_entry_per_product_and_count_is_sum(ops in prop::collection::vec(op(), 0..64)) {
            let mut cart = Cart::new();
            for op in ops {
                match op {
                    Op::Add(id, q) => cart.add_to_cart(pid(id), q),
                    Op::Remove(id) => cart.remove_from_cart(pid(id)),
                    Op::Update(id, q) => { cart.update_quantity(pid(id), q); }
                }
            }

            let ids: HashSet<_> = cart.items().iter().map(|i| i.product_id).collect();
            prop_assert_eq!(ids.len(), cart.items().len());
            prop_assert!(cart.items().iter().all(|i| i.quantity >= 1));
            let sum: u32 = cart.items().iter().map(|i| i.quantity).sum();
            prop_assert_eq!(cart.item_count(), sum);
        }
    }
}
