use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        orders::{
            AdminOrderWithItems, CartLine, CreateOrderRequest, OrderCreated, OrderHeader,
            OrderItemView, OrderStatusUpdated, OrderWithItems, ProductSnapshot,
            UpdateOrderStatusRequest, UserSnapshot,
        },
        products::{CreateProductRequest, UpdateProductRequest},
    },
    models::{OrderStatus, Product, Role, User},
    routes::{auth, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        orders::create_order,
        orders::my_orders,
        orders::list_all_orders,
        orders::update_order_status,
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            OrderStatus,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            CreateOrderRequest,
            CartLine,
            OrderCreated,
            UpdateOrderStatusRequest,
            OrderStatusUpdated,
            OrderHeader,
            OrderItemView,
            ProductSnapshot,
            UserSnapshot,
            OrderWithItems,
            AdminOrderWithItems,
            params::ProductQuery,
            health::HealthData,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Products", description = "Product catalog"),
        (name = "Orders", description = "Order placement and tracking"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
