use crate::{
    db::DbPool,
    entities::{
        cart_item::{self, Entity as CartItem},
        product::{Entity as Product, ProductStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

/// Manages cart lines: one row per (customer, product), upserted on add.
/// Checkout deletes the purchased lines itself, inside its own transaction.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CartService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Adds quantity to the customer's line for the product, creating the
    /// line if none exists. The product must be an active listing.
    #[instrument(skip(self, request), fields(customer_id = %customer_id, product_id = %request.product_id))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        request: AddToCartRequest,
    ) -> Result<cart_item::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let product = Product::find_by_id(request.product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::ProductNotFound(format!("product {}", request.product_id))
            })?;
        if product.status != ProductStatus::Active {
            return Err(ServiceError::ProductUnavailable(format!(
                "{} is not available",
                product.name
            )));
        }

        let now = Utc::now();
        let existing = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(request.product_id))
            .one(&*self.db)
            .await?;

        let line = match existing {
            Some(line) => {
                let quantity = line.quantity + request.quantity;
                let mut active: cart_item::ActiveModel = line.into();
                active.quantity = Set(quantity);
                active.updated_at = Set(now);
                active.update(&*self.db).await?
            }
            None => {
                let active = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer_id),
                    product_id: Set(request.product_id),
                    quantity: Set(request.quantity),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(&*self.db).await?
            }
        };

        self.notify(customer_id, request.product_id).await;
        Ok(line)
    }

    /// Sets the quantity of an existing line.
    #[instrument(skip(self), fields(customer_id = %customer_id, product_id = %product_id))]
    pub async fn update_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }

        let line = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("cart line not found".to_string()))?;

        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.notify(customer_id, product_id).await;
        Ok(updated)
    }

    /// Removes the customer's line for the product.
    #[instrument(skip(self), fields(customer_id = %customer_id, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = CartItem::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("cart line not found".to_string()));
        }

        self.notify(customer_id, product_id).await;
        Ok(())
    }

    /// Lists the customer's cart lines.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_cart(&self, customer_id: Uuid) -> Result<Vec<cart_item::Model>, ServiceError> {
        Ok(CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .all(&*self.db)
            .await?)
    }

    async fn notify(&self, customer_id: Uuid, product_id: Uuid) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::CartUpdated {
                    customer_id,
                    product_id,
                })
                .await
            {
                warn!(error = %e, "failed to send cart updated event");
            }
        }
    }
}
