use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CartError;
use crate::pricing;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: String,
    pub title: String,
    /// Unit price in whole currency units
    pub price: u64,
    pub seller: String,
}

impl LineItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        price: u64,
        seller: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            seller: seller.into(),
        }
    }
}

/// Listings the buyer intends to purchase. Each listing appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: LineItem) -> Result<(), CartError> {
        if self.contains(&item.id) {
            return Err(CartError::Duplicate(item.id));
        }
        debug!(item = %item.id, "Added to cart");
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<LineItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of item prices, `None` if it does not fit in a `u64`
    pub fn total(&self) -> Option<u64> {
        pricing::subtotal(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> LineItem {
        LineItem::new("lst-1", "Fujifilm X100V", 85_000, "seller-7")
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut cart = Cart::new();
        cart.add(camera()).unwrap();

        let err = cart.add(camera()).unwrap_err();
        assert_eq!(err, CartError::Duplicate("lst-1".into()));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total(), Some(85_000));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(camera()).unwrap();
        cart.add(LineItem::new("lst-2", "Lens hood", 1_200, "seller-7"))
            .unwrap();

        assert_eq!(cart.remove("lst-1").map(|item| item.price), Some(85_000));
        assert!(cart.remove("lst-1").is_none());
        assert!(!cart.contains("lst-1"));
        assert_eq!(cart.total(), Some(1_200));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Some(0));
    }

    #[test]
    fn test_total_overflow() {
        let mut cart = Cart::new();
        cart.add(LineItem::new("a", "Yacht", u64::MAX, "seller-1")).unwrap();
        assert_eq!(cart.total(), Some(u64::MAX));

        cart.add(LineItem::new("b", "Dinghy", 1, "seller-1")).unwrap();
        assert_eq!(cart.total(), None);
    }
}
