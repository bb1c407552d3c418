use chrono::{DateTime, Utc};
use orderdesk_types::{OrderId, OrderStatus, UserId};
use serde::{Deserialize, Serialize};

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price in yen.
    pub price: u64,
}

impl OrderItem {
    pub fn subtotal(&self) -> u64 {
        self.price * u64::from(self.quantity)
    }
}

/// An order as the agent sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub user_id: UserId,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Sum of all item subtotals, in yen.
    pub total_price: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds an order and computes its total from `items`.
    pub fn new(user_id: UserId, order_id: OrderId, status: OrderStatus, items: Vec<OrderItem>) -> Self {
        let mut order = Self {
            user_id,
            order_id,
            status,
            items,
            total_price: 0,
            created_at: Utc::now(),
            updated_at: None,
        };
        order.recompute_total();
        order
    }

    pub(crate) fn recompute_total(&mut self) {
        self.total_price = self.items.iter().map(OrderItem::subtotal).sum();
    }

    /// Finds an item by exact product name.
    pub fn item(&self, name: &str) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.name == name)
    }
}
