use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter, Statement};

use crate::{
    audit::{AuditAction, record},
    dto::orders::AdminOrderWithItems,
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::OrderStatus,
    services::order_aggregator::{ALL_ORDERS_SQL, AdminOrderItemRow, aggregate},
    state::AppState,
};

/// Every order with its user and items, newest first.
pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<Vec<AdminOrderWithItems>> {
    ensure_admin(user)?;
    let rows = AdminOrderItemRow::find_by_statement(Statement::from_string(
        DbBackend::Postgres,
        ALL_ORDERS_SQL,
    ))
    .all(&state.orm)
    .await?;

    Ok(aggregate(rows))
}

/// Assign `raw_status` to the order. The status is parsed before the store
/// is touched, so an unknown literal leaves the order unchanged.
#[tracing::instrument(skip(state, user), fields(admin_id = user.user_id))]
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_id: i64,
    raw_status: &str,
) -> AppResult<OrderStatus> {
    ensure_admin(user)?;
    let status: OrderStatus = raw_status.parse()?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = Orders::update_many()
        .col_expr(OrderCol::Status, Expr::value(status.as_str()))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now))
        .filter(OrderCol::Id.eq(order_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Order"));
    }

    tracing::info!(order_id, status = %status, "order status updated");
    record(
        &state.pool,
        Some(user.user_id),
        AuditAction::OrderStatusUpdate,
        serde_json::json!({ "order_id": order_id, "status": status }),
    )
    .await;

    Ok(status)
}
