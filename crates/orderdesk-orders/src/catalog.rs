//! Products the shop sells, with fixed prices.

use serde::{Deserialize, Serialize};

/// A product and its unit price in yen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Display name, also the key callers use when changing quantities.
    pub name: String,
    /// Unit price in yen.
    pub price: u64,
}

impl Product {
    pub fn new(name: impl Into<String>, price: u64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// The set of products orders are generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Creates a catalog from an explicit product list.
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// All products, in catalog order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Looks up a product by exact name.
    pub fn find(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            Product::new("ワイヤレスイヤホン", 12_800),
            Product::new("スマートウォッチ", 24_500),
            Product::new("ポータブル充電器", 3_980),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_three_products() {
        let catalog = Catalog::default();
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.find("スマートウォッチ").map(|p| p.price),
            Some(24_500)
        );
        assert!(catalog.find("テレビ").is_none());
    }
}
