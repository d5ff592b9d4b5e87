//! Cache types for store API responses.

use souq_core::{CategoryId, ProductId};

use super::types::{Category, Country, Product, StoreData};

/// Cache key for cacheable endpoints.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Store,
    Categories,
    Countries,
    Products { category_id: Option<CategoryId> },
    Product(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Store(Box<StoreData>),
    Categories(Vec<Category>),
    Countries(Vec<Country>),
    Products(Vec<Product>),
    Product(Box<Product>),
}
