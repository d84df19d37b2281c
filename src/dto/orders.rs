use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::OrderStatus;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "cart is empty"), nested)]
    pub cart_items: Vec<CartLine>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[validate(range(min = 1, message = "productId must be a positive integer"))]
    pub product_id: i64,
    #[validate(range(min = 1, message = "quantity must be a positive integer"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub message: String,
    pub order_id: i64,
    pub total_price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdated {
    pub message: String,
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderHeader {
    pub id: i64,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProductSnapshot {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderItemView {
    pub id: i64,
    pub quantity: i32,
    /// Unit price captured at order time.
    pub price: Decimal,
    /// `null` when the product has since been deleted.
    pub product: Option<ProductSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UserSnapshot {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderHeader,
    pub order_items: Vec<OrderItemView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AdminOrderWithItems {
    #[serde(flatten)]
    pub order: OrderHeader,
    pub user: UserSnapshot,
    pub order_items: Vec<OrderItemView>,
}
