use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use validator::Validate;

use crate::{
    audit::{AuditAction, record},
    dto::products::{CreateProductRequest, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    routes::params::ProductQuery,
    state::AppState,
};

pub async fn list_products<C: ConnectionTrait>(
    conn: &C,
    query: &ProductQuery,
) -> AppResult<Vec<Product>> {
    let mut condition = Condition::all();

    if let Some(category) = query.category() {
        condition = condition.add(Column::Category.eq(category));
    }

    if let Some(search) = query.search() {
        let pattern = format!("%{}%", escape_like(search));
        condition = condition.add(Expr::col(Column::Name).ilike(pattern));
    }

    let items = Products::find()
        .filter(condition)
        .order_by_asc(Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    Ok(items)
}

pub async fn get_product<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<Product> {
    Products::find_by_id(id)
        .one(conn)
        .await?
        .map(product_from_entity)
        .ok_or(AppError::NotFound("Product"))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<Product> {
    ensure_admin(user)?;
    payload.validate()?;

    let active = ActiveModel {
        id: NotSet,
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        category: Set(payload.category),
        image: Set(payload.image),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    tracing::info!(product_id = product.id, "product created");
    record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(product_from_entity(product))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateProductRequest,
) -> AppResult<Product> {
    ensure_admin(user)?;
    payload.validate()?;

    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    tracing::info!(product_id = product.id, "product updated");
    record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductUpdate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(product_from_entity(product))
}

pub async fn delete_product(state: &AppState, user: &AuthUser, id: i64) -> AppResult<()> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Product"));
    }

    tracing::info!(product_id = id, "product deleted");
    record(
        &state.pool,
        Some(user.user_id),
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(())
}

/// Escape LIKE metacharacters so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        category: model.category,
        image: model.image,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
