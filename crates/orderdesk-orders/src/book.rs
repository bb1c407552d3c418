//! The per-call order book and its status-gated operations.

use std::collections::HashMap;

use chrono::Utc;
use orderdesk_types::{OrderId, OrderStatus, UserId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::order::{Order, OrderItem};

const MIN_GENERATED_ITEMS: usize = 1;
const MAX_GENERATED_ITEMS: usize = 3;
const MAX_GENERATED_QUANTITY: u32 = 3;

const MSG_NOT_FOUND: &str = "注文が見つかりません";

/// Result of a cancellation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelOutcome {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub cancelled: bool,
    /// What the agent tells the caller.
    pub message: String,
    /// Status after the request; `None` when the order does not exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

/// Result of a quantity change request.
///
/// The quantity and total fields are only present when the change was
/// applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub updated: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_total: Option<u64>,
}

impl UpdateOutcome {
    fn refused(
        user_id: &UserId,
        order_id: &OrderId,
        status: Option<OrderStatus>,
        message: String,
    ) -> Self {
        Self {
            order_id: order_id.clone(),
            user_id: user_id.clone(),
            updated: false,
            message,
            status,
            old_quantity: None,
            new_quantity: None,
            old_total: None,
            new_total: None,
        }
    }
}

/// Orders known to one call, keyed by `(user_id, order_id)`.
#[derive(Debug)]
pub struct OrderBook<R = StdRng> {
    orders: HashMap<(UserId, OrderId), Order>,
    catalog: Catalog,
    rng: R,
}

impl OrderBook<StdRng> {
    /// Creates an empty book over the default catalog, seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for OrderBook<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> OrderBook<R> {
    /// Creates an empty book over the default catalog with a caller-supplied RNG.
    pub fn with_rng(rng: R) -> Self {
        Self::with_catalog(Catalog::default(), rng)
    }

    pub fn with_catalog(catalog: Catalog, rng: R) -> Self {
        Self {
            orders: HashMap::new(),
            catalog,
            rng,
        }
    }

    /// Adds or replaces an order. Its total is recomputed from its items.
    pub fn insert(&mut self, mut order: Order) {
        order.recompute_total();
        self.orders
            .insert((order.user_id.clone(), order.order_id.clone()), order);
    }

    /// Returns the order if this call has already seen it.
    pub fn get(&self, user_id: &UserId, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(&(user_id.clone(), order_id.clone()))
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns the order, generating it on first lookup.
    ///
    /// A generated order is either being prepared or shipping, with one to
    /// three distinct catalog products of one to three units each.
    pub fn check_order_details(&mut self, user_id: &UserId, order_id: &OrderId) -> Order {
        let key = (user_id.clone(), order_id.clone());
        if let Some(order) = self.orders.get(&key) {
            tracing::debug!(%user_id, %order_id, status = %order.status, "order already known");
            return order.clone();
        }

        let order = self.generate(user_id, order_id);
        tracing::info!(
            %user_id,
            %order_id,
            status = %order.status,
            items = order.items.len(),
            total = order.total_price,
            "generated order"
        );
        self.orders.insert(key, order.clone());
        order
    }

    fn generate(&mut self, user_id: &UserId, order_id: &OrderId) -> Order {
        let status = if self.rng.gen_bool(0.5) {
            OrderStatus::Preparing
        } else {
            OrderStatus::Shipping
        };

        let max_items = MAX_GENERATED_ITEMS.min(self.catalog.len());
        let items = if max_items < MIN_GENERATED_ITEMS {
            Vec::new()
        } else {
            let count = self.rng.gen_range(MIN_GENERATED_ITEMS..=max_items);
            let picked: Vec<_> = self
                .catalog
                .products()
                .choose_multiple(&mut self.rng, count)
                .cloned()
                .collect();
            picked
                .into_iter()
                .map(|product| OrderItem {
                    name: product.name,
                    quantity: self.rng.gen_range(1..=MAX_GENERATED_QUANTITY),
                    price: product.price,
                })
                .collect()
        };

        Order::new(user_id.clone(), order_id.clone(), status, items)
    }

    /// Cancels the order if it is still being prepared.
    ///
    /// Unknown orders are not generated here; the caller has to check the
    /// order first.
    pub fn cancel_order(&mut self, user_id: &UserId, order_id: &OrderId) -> CancelOutcome {
        let mut outcome = CancelOutcome {
            order_id: order_id.clone(),
            user_id: user_id.clone(),
            cancelled: false,
            message: MSG_NOT_FOUND.to_string(),
            status: None,
        };

        let Some(order) = self.orders.get_mut(&(user_id.clone(), order_id.clone())) else {
            tracing::info!(%user_id, %order_id, "cancel requested for unknown order");
            return outcome;
        };

        outcome.message = match order.status {
            OrderStatus::Preparing => {
                order.status = OrderStatus::Cancelled;
                order.updated_at = Some(Utc::now());
                outcome.cancelled = true;
                "注文が正常にキャンセルされました。返金は3-5営業日以内に処理されます"
            }
            OrderStatus::Shipping => "この注文はすでに配送中のためキャンセルできません",
            OrderStatus::Delivered => "この注文はすでに配達済みのためキャンセルできません",
            OrderStatus::Cancelled => "この注文はすでにキャンセル済みです",
        }
        .to_string();
        outcome.status = Some(order.status);

        tracing::info!(
            %user_id,
            %order_id,
            cancelled = outcome.cancelled,
            status = %order.status,
            "cancel request handled"
        );
        outcome
    }

    /// Sets the quantity of one product in the order.
    ///
    /// A quantity of zero removes the product. Only orders that are still
    /// being prepared can be changed.
    pub fn update_order_quantity(
        &mut self,
        user_id: &UserId,
        order_id: &OrderId,
        product_name: &str,
        new_quantity: u32,
    ) -> UpdateOutcome {
        let Some(order) = self.orders.get_mut(&(user_id.clone(), order_id.clone())) else {
            tracing::info!(%user_id, %order_id, "update requested for unknown order");
            return UpdateOutcome::refused(user_id, order_id, None, MSG_NOT_FOUND.to_string());
        };

        if !order.status.is_modifiable() {
            return UpdateOutcome::refused(
                user_id,
                order_id,
                Some(order.status),
                format!("注文は現在「{}」状態のため変更できません", order.status),
            );
        }

        let Some(index) = order.items.iter().position(|item| item.name == product_name) else {
            return UpdateOutcome::refused(
                user_id,
                order_id,
                Some(order.status),
                format!("注文に商品「{}」が見つかりません", product_name),
            );
        };

        let old_total = order.total_price;
        let old_quantity = order.items[index].quantity;

        let message = if new_quantity == 0 {
            order.items.remove(index);
            format!("商品「{}」を注文から削除しました", product_name)
        } else {
            order.items[index].quantity = new_quantity;
            format!(
                "商品「{}」の数量を{}個から{}個に変更しました",
                product_name, old_quantity, new_quantity
            )
        };
        order.recompute_total();
        order.updated_at = Some(Utc::now());

        tracing::info!(
            %user_id,
            %order_id,
            product = product_name,
            old_quantity,
            new_quantity,
            old_total,
            new_total = order.total_price,
            "order quantity updated"
        );

        UpdateOutcome {
            order_id: order_id.clone(),
            user_id: user_id.clone(),
            updated: true,
            message,
            status: Some(order.status),
            old_quantity: Some(old_quantity),
            new_quantity: Some(new_quantity),
            old_total: Some(old_total),
            new_total: Some(order.total_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (UserId, OrderId) {
        (
            "67890".parse().expect("valid user id"),
            "12345".parse().expect("valid order id"),
        )
    }

    fn seeded_book() -> OrderBook<StdRng> {
        OrderBook::with_rng(StdRng::seed_from_u64(7))
    }

    #[test]
    fn generated_orders_respect_catalog_bounds() {
        let catalog = Catalog::default();
        for seed in 0..50 {
            let mut book = OrderBook::with_rng(StdRng::seed_from_u64(seed));
            let (user, order_id) = ids();
            let order = book.check_order_details(&user, &order_id);

            assert!(matches!(
                order.status,
                OrderStatus::Preparing | OrderStatus::Shipping
            ));
            assert!((1..=3).contains(&order.items.len()));

            let mut names: Vec<_> = order.items.iter().map(|i| i.name.as_str()).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), order.items.len(), "products are distinct");

            for item in &order.items {
                assert!((1..=3).contains(&item.quantity));
                assert_eq!(catalog.find(&item.name).map(|p| p.price), Some(item.price));
            }
            let expected: u64 = order.items.iter().map(OrderItem::subtotal).sum();
            assert_eq!(order.total_price, expected);
        }
    }

    #[test]
    fn empty_catalog_generates_empty_order() {
        let mut book = OrderBook::with_catalog(Catalog::new(Vec::new()), StdRng::seed_from_u64(1));
        let (user, order_id) = ids();
        let order = book.check_order_details(&user, &order_id);
        assert!(order.items.is_empty());
        assert_eq!(order.total_price, 0);
    }

    #[test]
    fn check_is_stable_within_a_book() {
        let mut book = seeded_book();
        let (user, order_id) = ids();
        let first = book.check_order_details(&user, &order_id);
        let second = book.check_order_details(&user, &order_id);
        assert_eq!(first, second);
        assert_eq!(book.len(), 1);
    }
}
