use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegister,
    UserLogin,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    OrderPlace,
    OrderStatusUpdate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegister => "user_register",
            AuditAction::UserLogin => "user_login",
            AuditAction::ProductCreate => "product_create",
            AuditAction::ProductUpdate => "product_update",
            AuditAction::ProductDelete => "product_delete",
            AuditAction::OrderPlace => "order_place",
            AuditAction::OrderStatusUpdate => "order_status_update",
        }
    }

    pub fn resource(&self) -> &'static str {
        match self {
            AuditAction::UserRegister | AuditAction::UserLogin => "users",
            AuditAction::ProductCreate | AuditAction::ProductUpdate | AuditAction::ProductDelete => {
                "products"
            }
            AuditAction::OrderPlace | AuditAction::OrderStatusUpdate => "orders",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<i64>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Best-effort audit write: failures are logged and swallowed.
pub async fn record(pool: &DbPool, user_id: Option<i64>, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, user_id, action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}
