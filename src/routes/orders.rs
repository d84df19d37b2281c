use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};

use crate::{
    dto::orders::{
        AdminOrderWithItems, CreateOrderRequest, OrderCreated, OrderStatusUpdated,
        OrderWithItems, UpdateOrderStatusRequest,
    },
    error::AppResult,
    middleware::{
        auth::{AdminUser, AuthUser},
        json::{AppJson, AppPath},
    },
    services::{admin_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_orders))
        .route("/create", post(create_order))
        .route("/myorders", get(my_orders))
        .route("/{order_id}", put(update_order_status))
}

#[utoipa::path(
    post,
    path = "/api/orders/create",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderCreated),
        (status = 400, description = "Empty or invalid cart, or insufficient stock"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderCreated>)> {
    let placement = order_service::place_order(&state, &user, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderCreated {
            message: "Order created successfully".into(),
            order_id: placement.order_id,
            total_price: placement.total_price,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/myorders",
    responses(
        (status = 200, description = "Caller's orders with items", body = Vec<OrderWithItems>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<OrderWithItems>>> {
    let orders = order_service::my_orders(&state, &user).await?;
    Ok(Json(orders))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "All orders with user and items (admin only)", body = Vec<AdminOrderWithItems>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> AppResult<Json<Vec<AdminOrderWithItems>>> {
    let orders = admin_service::list_all_orders(&state, &user).await?;
    Ok(Json(orders))
}

#[utoipa::path(
    put,
    path = "/api/orders/{order_id}",
    params(
        ("order_id" = i64, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = OrderStatusUpdated),
        (status = 400, description = "Invalid status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    AppPath(order_id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateOrderStatusRequest>,
) -> AppResult<Json<OrderStatusUpdated>> {
    let status =
        admin_service::update_order_status(&state, &user, order_id, &payload.status).await?;
    Ok(Json(OrderStatusUpdated {
        message: "Order status updated".into(),
        order_id,
        status,
    }))
}
