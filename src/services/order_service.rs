use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use validator::Validate;

use crate::{
    audit::{AuditAction, record},
    dto::orders::{CartLine, CreateOrderRequest, OrderWithItems},
    entity::{
        order_items::ActiveModel as OrderItemActive,
        orders::ActiveModel as OrderActive,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::OrderStatus,
    services::order_aggregator::{MY_ORDERS_SQL, OrderItemRow, aggregate},
    state::AppState,
};

/// Result of a successful placement.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPlacement {
    pub order_id: i64,
    pub total_price: Decimal,
    pub item_count: usize,
}

/// Price and stock of a product as read under lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StockedPrice {
    pub price: Decimal,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

/// Largest total `orders.total_price` (`NUMERIC(14, 2)`) can hold.
pub fn max_order_total() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// Check every line against `catalog` and price the cart.
///
/// Lines naming the same product are checked against that product's stock
/// together. The first failing line decides the error. Nothing is written.
pub fn price_cart(
    lines: &[CartLine],
    catalog: &HashMap<i64, StockedPrice>,
) -> AppResult<PricedCart> {
    if lines.is_empty() {
        return Err(AppError::InvalidCart("cart is empty".into()));
    }

    let mut demand: HashMap<i64, i64> = HashMap::new();
    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::InvalidCart(format!(
                "quantity for product {} must be a positive integer",
                line.product_id
            )));
        }
        let product = catalog.get(&line.product_id).ok_or_else(|| {
            AppError::InvalidCart(format!("product {} does not exist", line.product_id))
        })?;

        let requested = demand.entry(line.product_id).or_default();
        *requested += i64::from(line.quantity);
        if *requested > i64::from(product.stock) {
            return Err(AppError::InsufficientStock {
                product_id: line.product_id,
                requested: *requested,
                available: product.stock,
            });
        }

        total = product
            .price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|subtotal| total.checked_add(subtotal))
            .filter(|sum| *sum <= max_order_total())
            .ok_or_else(|| AppError::InvalidCart("order total is out of range".into()))?;

        priced.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    Ok(PricedCart {
        lines: priced,
        total,
    })
}

/// Validate, price and persist an order, decrementing stock, in one
/// transaction.
#[tracing::instrument(skip(state, payload), fields(user_id = user.user_id))]
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<OrderPlacement> {
    payload
        .validate()
        .map_err(|err| AppError::InvalidCart(err.to_string()))?;
    let lines = payload.cart_items;

    let mut product_ids: Vec<i64> = lines.iter().map(|line| line.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    // Any early return drops `txn`, which rolls it back.
    let txn = state.orm.begin().await?;

    // Lock in id order so concurrent placements cannot deadlock each other.
    let catalog: HashMap<i64, StockedPrice> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| {
            (
                p.id,
                StockedPrice {
                    price: p.price,
                    stock: p.stock,
                },
            )
        })
        .collect();

    let priced = price_cart(&lines, &catalog).inspect_err(|err| {
        tracing::debug!(error = %err, "cart rejected");
    })?;

    let order = OrderActive {
        id: NotSet,
        user_id: Set(user.user_id),
        total_price: Set(priced.total),
        status: Set(OrderStatus::Pending),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    for line in &priced.lines {
        OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let result = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .col_expr(ProdCol::UpdatedAt, Expr::value(now))
            .filter(ProdCol::Id.eq(line.product_id))
            .filter(ProdCol::Stock.gte(line.quantity))
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            let available = catalog
                .get(&line.product_id)
                .map(|p| p.stock)
                .unwrap_or_default();
            return Err(AppError::InsufficientStock {
                product_id: line.product_id,
                requested: i64::from(line.quantity),
                available,
            });
        }
    }

    txn.commit().await?;

    let placement = OrderPlacement {
        order_id: order.id,
        total_price: priced.total,
        item_count: priced.lines.len(),
    };

    tracing::info!(
        order_id = placement.order_id,
        total_price = %placement.total_price,
        items = placement.item_count,
        "order placed"
    );
    record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderPlace,
        serde_json::json!({
            "order_id": placement.order_id,
            "total_price": placement.total_price,
        }),
    )
    .await;

    Ok(placement)
}

/// The caller's orders with their items, newest first.
pub async fn my_orders(state: &AppState, user: &AuthUser) -> AppResult<Vec<OrderWithItems>> {
    let rows = OrderItemRow::find_by_statement(Statement::from_sql_and_values(
        DbBackend::Postgres,
        MY_ORDERS_SQL,
        [user.user_id.into()],
    ))
    .all(&state.orm)
    .await?;

    Ok(aggregate(rows))
}
