use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "valid_price"))]
    pub price: Decimal,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i32,
    #[serde(default)]
    #[validate(length(max = 100, message = "category must be at most 100 characters"))]
    pub category: String,
    #[serde(default)]
    pub image: String,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "valid_price"))]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: Option<i32>,
    #[validate(length(max = 100, message = "category must be at most 100 characters"))]
    pub category: Option<String>,
    pub image: Option<String>,
}

/// Prices are stored as `NUMERIC(12, 2)`: at most ten integer digits and two
/// decimal places.
fn valid_price(price: &Decimal) -> Result<(), ValidationError> {
    let (code, message) = if *price < Decimal::ZERO {
        ("non_negative", "price cannot be negative")
    } else if *price >= Decimal::from(10_000_000_000_i64) {
        ("max_price", "price must be below 10000000000")
    } else if price.normalize().scale() > 2 {
        ("price_scale", "price can have at most two decimal places")
    } else {
        return Ok(());
    };

    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    Err(err)
}
