//! Rebuilds nested order views from flat `orders ⟕ order_items ⟕ products`
//! rows.
//!
//! Rows arrive one per order item. The fold keeps the first-seen order of
//! order ids and appends items in row order. Orders without items come through
//! the LEFT JOIN as a single row whose item columns are all `NULL`; they end up
//! with an empty item list. An item whose product was deleted keeps its
//! captured price and gets a `null` product snapshot.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{FromQueryResult, prelude::DateTimeWithTimeZone};

use crate::{
    dto::orders::{
        AdminOrderWithItems, OrderHeader, OrderItemView, OrderWithItems, ProductSnapshot,
        UserSnapshot,
    },
    models::OrderStatus,
};

/// A flat joined row that contributes to one order view.
pub trait JoinedOrderRow {
    type Order: HasItems;

    fn order_id(&self) -> i64;

    /// Order view for the row's order, with no items yet.
    fn start_order(&self) -> Self::Order;

    /// The item carried by this row, if any.
    fn into_item(self) -> Option<OrderItemView>;
}

pub trait HasItems {
    fn items_mut(&mut self) -> &mut Vec<OrderItemView>;
}

impl HasItems for OrderWithItems {
    fn items_mut(&mut self) -> &mut Vec<OrderItemView> {
        &mut self.order_items
    }
}

impl HasItems for AdminOrderWithItems {
    fn items_mut(&mut self) -> &mut Vec<OrderItemView> {
        &mut self.order_items
    }
}

/// Group rows by order id. Output order is the first appearance of each id.
pub fn aggregate<R: JoinedOrderRow>(rows: impl IntoIterator<Item = R>) -> Vec<R::Order> {
    let (orders, _) = rows.into_iter().fold(
        (Vec::<R::Order>::new(), HashMap::<i64, usize>::new()),
        |(mut orders, mut index), row| {
            let slot = *index.entry(row.order_id()).or_insert_with(|| {
                orders.push(row.start_order());
                orders.len() - 1
            });
            if let Some(item) = row.into_item() {
                orders[slot].items_mut().push(item);
            }
            (orders, index)
        },
    );
    orders
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ItemColumns {
    order_item_id: Option<i64>,
    quantity: Option<i32>,
    item_price: Option<Decimal>,
    product_id: Option<i64>,
    product_name: Option<String>,
    product_description: Option<String>,
    product_price: Option<Decimal>,
}

impl ItemColumns {
    fn into_item(self) -> Option<OrderItemView> {
        let id = self.order_item_id?;
        let quantity = self.quantity?;
        let price = self.item_price?;
        let product = match (self.product_id, self.product_name, self.product_price) {
            (Some(id), Some(name), Some(price)) => Some(ProductSnapshot {
                id,
                name,
                description: self.product_description.unwrap_or_default(),
                price,
            }),
            _ => None,
        };
        Some(OrderItemView {
            id,
            quantity,
            price,
            product,
        })
    }
}

/// Row for a single customer's orders.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct OrderItemRow {
    pub order_id: i64,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTimeWithTimeZone,
    pub order_item_id: Option<i64>,
    pub quantity: Option<i32>,
    pub item_price: Option<Decimal>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub product_price: Option<Decimal>,
}

fn header(
    order_id: i64,
    total_price: Decimal,
    status: OrderStatus,
    order_date: &DateTimeWithTimeZone,
) -> OrderHeader {
    OrderHeader {
        id: order_id,
        total_price,
        status,
        created_at: order_date.with_timezone(&Utc),
    }
}

impl JoinedOrderRow for OrderItemRow {
    type Order = OrderWithItems;

    fn order_id(&self) -> i64 {
        self.order_id
    }

    fn start_order(&self) -> OrderWithItems {
        OrderWithItems {
            order: header(self.order_id, self.total_price, self.status, &self.order_date),
            order_items: Vec::new(),
        }
    }

    fn into_item(self) -> Option<OrderItemView> {
        ItemColumns {
            order_item_id: self.order_item_id,
            quantity: self.quantity,
            item_price: self.item_price,
            product_id: self.product_id,
            product_name: self.product_name,
            product_description: self.product_description,
            product_price: self.product_price,
        }
        .into_item()
    }
}

/// Row for the all-orders listing; carries the ordering user.
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct AdminOrderItemRow {
    pub order_id: i64,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub order_date: DateTimeWithTimeZone,
    pub user_id: i64,
    pub username: String,
    pub order_item_id: Option<i64>,
    pub quantity: Option<i32>,
    pub item_price: Option<Decimal>,
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    pub product_price: Option<Decimal>,
}

impl JoinedOrderRow for AdminOrderItemRow {
    type Order = AdminOrderWithItems;

    fn order_id(&self) -> i64 {
        self.order_id
    }

    fn start_order(&self) -> AdminOrderWithItems {
        AdminOrderWithItems {
            order: header(self.order_id, self.total_price, self.status, &self.order_date),
            user: UserSnapshot {
                id: self.user_id,
                username: self.username.clone(),
            },
            order_items: Vec::new(),
        }
    }

    fn into_item(self) -> Option<OrderItemView> {
        ItemColumns {
            order_item_id: self.order_item_id,
            quantity: self.quantity,
            item_price: self.item_price,
            product_id: self.product_id,
            product_name: self.product_name,
            product_description: self.product_description,
            product_price: self.product_price,
        }
        .into_item()
    }
}

pub(crate) const MY_ORDERS_SQL: &str = r#"
    SELECT
        o.id AS order_id,
        o.total_price,
        o.status,
        o.created_at AS order_date,
        oi.id AS order_item_id,
        oi.quantity,
        oi.price AS item_price,
        p.id AS product_id,
        p.name AS product_name,
        p.description AS product_description,
        p.price AS product_price
    FROM orders o
    LEFT JOIN order_items oi ON oi.order_id = o.id
    LEFT JOIN products p ON p.id = oi.product_id
    WHERE o.user_id = $1
    ORDER BY o.created_at DESC, o.id DESC, oi.id ASC
"#;

pub(crate) const ALL_ORDERS_SQL: &str = r#"
    SELECT
        o.id AS order_id,
        o.total_price,
        o.status,
        o.created_at AS order_date,
        u.id AS user_id,
        u.username,
        oi.id AS order_item_id,
        oi.quantity,
        oi.price AS item_price,
        p.id AS product_id,
        p.name AS product_name,
        p.description AS product_description,
        p.price AS product_price
    FROM orders o
    INNER JOIN users u ON u.id = o.user_id
    LEFT JOIN order_items oi ON oi.order_id = o.id
    LEFT JOIN products p ON p.id = oi.product_id
    ORDER BY o.created_at DESC, o.id DESC, oi.id ASC
"#;

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    use super::*;

    fn row(order_id: i64, item_id: Option<i64>) -> OrderItemRow {
        OrderItemRow {
            order_id,
            total_price: dec!(20.00),
            status: OrderStatus::Pending,
            order_date: DateTime::<Utc>::UNIX_EPOCH.fixed_offset(),
            order_item_id: item_id,
            quantity: item_id.map(|_| 2),
            item_price: item_id.map(|_| dec!(10.00)),
            product_id: item_id.map(|_| 1),
            product_name: item_id.map(|_| "Ferris Mug".to_string()),
            product_description: item_id.map(|_| "Mug".to_string()),
            product_price: item_id.map(|_| dec!(12.00)),
        }
    }

    #[test]
    fn groups_items_under_first_seen_order() {
        let rows = vec![
            row(9, Some(1)),
            row(4, Some(2)),
            row(9, Some(3)),
            row(4, Some(4)),
            row(9, Some(5)),
        ];
        let orders = aggregate(rows);
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].order.id, 9);
        assert_eq!(orders[1].order.id, 4);
        let ids: Vec<i64> = orders[0].order_items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(orders[1].order_items.len(), 2);
    }

    #[test]
    fn item_keeps_captured_price_separate_from_current_product_price() {
        let orders = aggregate(vec![row(1, Some(7))]);
        let item = &orders[0].order_items[0];
        assert_eq!(item.price, dec!(10.00));
        assert_eq!(item.product.as_ref().unwrap().price, dec!(12.00));
    }

    #[test]
    fn order_without_items_has_empty_item_list() {
        let orders = aggregate(vec![row(3, None)]);
        assert_eq!(orders.len(), 1);
        assert!(orders[0].order_items.is_empty());
    }

    #[test]
    fn deleted_product_yields_null_snapshot() {
        let mut r = row(5, Some(8));
        r.product_id = None;
        r.product_name = None;
        r.product_description = None;
        r.product_price = None;
        let orders = aggregate(vec![r]);
        let item = &orders[0].order_items[0];
        assert_eq!(item.quantity, 2);
        assert!(item.product.is_none());
    }

    #[test]
    fn admin_rows_carry_user_snapshot() {
        let rows = vec![
            AdminOrderItemRow {
                order_id: 1,
                total_price: dec!(5.00),
                status: OrderStatus::Entregado,
                order_date: DateTime::<Utc>::UNIX_EPOCH.fixed_offset(),
                user_id: 77,
                username: "ana".into(),
                order_item_id: Some(1),
                quantity: Some(1),
                item_price: Some(dec!(5.00)),
                product_id: Some(3),
                product_name: Some("Sticker".into()),
                product_description: Some(String::new()),
                product_price: Some(dec!(5.00)),
            };
            2
        ];
        let orders = aggregate(rows);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].user.id, 77);
        assert_eq!(orders[0].user.username, "ana");
        assert_eq!(orders[0].order_items.len(), 2);
    }

    #[test]
    fn empty_input_yields_no_orders() {
        assert!(aggregate(Vec::<OrderItemRow>::new()).is_empty());
    }
}
