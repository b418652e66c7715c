use crate::{
    entities::product::{self, Entity as Product, ProductStatus},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A requested order line as submitted by the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A line item that passed every catalog check. `unit_price` is the live
/// product price captured at validation time; it becomes the frozen price
/// stored on the order line.
#[derive(Debug, Clone)]
pub struct ValidatedItem {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Validates requested line items against the live catalog. Read-only:
/// nothing here writes, so a failure at any point leaves no state behind.
pub struct CatalogValidator;

impl CatalogValidator {
    /// Checks every requested line against current product state, failing on
    /// the first violation. Runs against whatever connection the caller
    /// provides, so the coordinator can hand in its open transaction.
    pub async fn validate_items<C: ConnectionTrait>(
        conn: &C,
        items: &[RequestedItem],
    ) -> Result<Vec<ValidatedItem>, ServiceError> {
        let mut validated = Vec::with_capacity(items.len());

        for item in items {
            let product = Product::find_by_id(item.product_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::ProductNotFound(format!("product {}", item.product_id))
                })?;

            check_line(&product, item.quantity)?;

            let unit_price = product.price;
            validated.push(ValidatedItem {
                product_id: product.id,
                seller_id: product.seller_id,
                product_name: product.name,
                quantity: item.quantity,
                unit_price,
                line_total: unit_price * Decimal::from(item.quantity),
            });
        }

        Ok(validated)
    }
}

/// Per-line checks, in contract order: availability, stock, quantity bounds.
/// A non-positive quantity is rejected outright; it must never reach the
/// stock decrement, where subtracting it would add stock back.
fn check_line(product: &product::Model, quantity: i32) -> Result<(), ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::ValidationError(format!(
            "{}: quantity must be at least 1",
            product.name
        )));
    }
    if product.status != ProductStatus::Active {
        return Err(ServiceError::ProductUnavailable(format!(
            "{} is not available for purchase",
            product.name
        )));
    }
    if quantity > product.stock_quantity {
        return Err(ServiceError::InsufficientStock(format!(
            "{}: requested {}, available {}",
            product.name, quantity, product.stock_quantity
        )));
    }
    if quantity < product.min_order_quantity {
        return Err(ServiceError::BelowMinimumQuantity(format!(
            "{}: minimum order is {} {}",
            product.name, product.min_order_quantity, product.unit
        )));
    }
    if let Some(max) = product.max_order_quantity {
        if quantity > max {
            return Err(ServiceError::AboveMaximumQuantity(format!(
                "{}: maximum order is {} {}",
                product.name, max, product.unit
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample_product() -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: "Carrots".to_string(),
            description: "Fresh carrots".to_string(),
            price: dec!(12.50),
            stock_quantity: 10,
            min_order_quantity: 1,
            max_order_quantity: None,
            unit: "kg".to_string(),
            seller_id: Uuid::new_v4(),
            shop_id: None,
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_valid_quantity() {
        let product = sample_product();
        assert!(check_line(&product, 5).is_ok());
    }

    #[test]
    fn rejects_non_positive_quantity() {
        // min_order_quantity 0 must not open the door to zero or negative
        // quantities
        let mut product = sample_product();
        product.min_order_quantity = 0;
        assert_matches!(check_line(&product, 0), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            check_line(&product, -3),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn rejects_inactive_product() {
        let mut product = sample_product();
        product.status = ProductStatus::Inactive;
        assert_matches!(
            check_line(&product, 1),
            Err(ServiceError::ProductUnavailable(_))
        );
    }

    #[test]
    fn rejects_quantity_beyond_stock() {
        let mut product = sample_product();
        product.stock_quantity = 2;
        assert_matches!(
            check_line(&product, 3),
            Err(ServiceError::InsufficientStock(_))
        );
    }

    #[test]
    fn rejects_quantity_below_minimum() {
        let mut product = sample_product();
        product.min_order_quantity = 5;
        assert_matches!(
            check_line(&product, 1),
            Err(ServiceError::BelowMinimumQuantity(_))
        );
    }

    #[test]
    fn rejects_quantity_above_maximum() {
        let mut product = sample_product();
        product.max_order_quantity = Some(4);
        assert_matches!(
            check_line(&product, 5),
            Err(ServiceError::AboveMaximumQuantity(_))
        );
    }

    #[test]
    fn stock_check_runs_before_minimum_check() {
        // quantity both above stock and below minimum: stock wins
        let mut product = sample_product();
        product.stock_quantity = 2;
        product.min_order_quantity = 5;
        assert_matches!(
            check_line(&product, 3),
            Err(ServiceError::InsufficientStock(_))
        );
    }

    #[test]
    fn unavailable_check_runs_before_stock_check() {
        let mut product = sample_product();
        product.status = ProductStatus::Archived;
        product.stock_quantity = 0;
        assert_matches!(
            check_line(&product, 1),
            Err(ServiceError::ProductUnavailable(_))
        );
    }
}
