use crate::{
    db::DbPool,
    entities::{
        address::{self, Entity as Address},
        cart_item::{self, Entity as CartItem},
        order::{self, ActiveModel as OrderActiveModel, Entity as Order, OrderStatus, PaymentStatus},
        order_item::{self, Entity as OrderItem},
        product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::{CatalogValidator, RequestedItem},
        pricing::PricingEngine,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Payment methods the marketplace accepts.
const PAYMENT_METHODS: &[&str] = &["CASH_ON_DELIVERY", "BANK_TRANSFER", "E_WALLET", "CARD"];

/// Process-wide order number source: unix timestamp plus a running sequence.
/// The sequence is read-and-incremented atomically, so two concurrent
/// checkouts can never observe the same value the way a `count(orders)`
/// lookup could. The unique index on `orders.order_number` is the backstop.
#[derive(Debug)]
pub struct OrderNumberSequence {
    counter: AtomicU64,
}

impl OrderNumberSequence {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("ORD-{}-{:04}", Utc::now().timestamp(), seq % 10_000)
    }
}

impl Default for OrderNumberSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub customer_id: Uuid,
    pub delivery_address_id: Uuid,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<RequestedItem>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Fully-populated order as returned to the caller: header, lines and the
/// resolved delivery address.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub items: Vec<OrderItemResponse>,
    pub delivery_address: Option<address::Model>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Coordinates the checkout transaction: catalog validation, pricing, and
/// the all-or-nothing commit of order, lines, stock decrement and cart
/// cleanup.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    pricing: PricingEngine,
    sequence: Arc<OrderNumberSequence>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        pricing: PricingEngine,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            pricing,
            sequence: Arc::new(OrderNumberSequence::new()),
            event_sender,
        }
    }

    /// Creates an order for the customer.
    ///
    /// Validation and pricing happen before anything is written; every write
    /// (order row, order lines, stock decrements, cart cleanup) happens in
    /// one transaction. Any failure before commit rolls the whole unit back,
    /// leaving stock, orders and cart untouched.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if !PAYMENT_METHODS.contains(&request.payment_method.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "unknown payment method '{}'",
                request.payment_method
            )));
        }

        // Address must exist and belong to the ordering customer.
        let delivery_address = Address::find_by_id(request.delivery_address_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError("delivery address not found".to_string())
            })?;
        if delivery_address.customer_id != request.customer_id {
            return Err(ServiceError::Forbidden(
                "delivery address does not belong to customer".to_string(),
            ));
        }

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "failed to start checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        // Read-then-decide against the open transaction; no writes yet.
        let validated = CatalogValidator::validate_items(&txn, &request.items).await?;
        let breakdown = self
            .pricing
            .price_order(&txn, &validated, request.coupon_code.as_deref())
            .await?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = self.sequence.next();

        let order_row = OrderActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            customer_id: Set(request.customer_id),
            status: Set(OrderStatus::Pending),
            subtotal: Set(breakdown.subtotal),
            delivery_fee: Set(breakdown.delivery_fee),
            discount: Set(breakdown.discount),
            total: Set(breakdown.total),
            payment_method: Set(request.payment_method.clone()),
            payment_status: Set(PaymentStatus::Pending),
            delivery_address_id: Set(request.delivery_address_id),
            notes: Set(None),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let order_model = order_row.insert(&txn).await?;

        let mut item_responses = Vec::with_capacity(validated.len());
        for item in &validated {
            let line = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                seller_id: Set(item.seller_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.line_total),
                created_at: Set(now),
            };
            let line = line.insert(&txn).await?;

            // Guarded decrement: only succeeds while enough stock remains,
            // so a rival checkout that got there first aborts this one.
            let updated = product::Entity::update_many()
                .col_expr(
                    product::Column::StockQuantity,
                    Expr::col(product::Column::StockQuantity).sub(item.quantity),
                )
                .filter(product::Column::Id.eq(item.product_id))
                .filter(product::Column::StockQuantity.gte(item.quantity))
                .exec(&txn)
                .await?;
            if updated.rows_affected == 0 {
                warn!(product_id = %item.product_id, "stock changed during checkout; aborting");
                return Err(ServiceError::InsufficientStock(format!(
                    "{} sold out during checkout",
                    item.product_name
                )));
            }

            item_responses.push(OrderItemResponse {
                id: line.id,
                product_id: line.product_id,
                seller_id: line.seller_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total_price,
            });
        }

        // Clear only the cart lines for products just purchased; the rest of
        // the customer's cart survives.
        let purchased: Vec<Uuid> = validated.iter().map(|item| item.product_id).collect();
        CartItem::delete_many()
            .filter(cart_item::Column::CustomerId.eq(request.customer_id))
            .filter(cart_item::Column::ProductId.is_in(purchased))
            .exec(&txn)
            .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, %order_id, "failed to commit checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(%order_id, %order_number, total = %breakdown.total, "order created");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderCreated {
                    order_id,
                    order_number: order_number.clone(),
                    customer_id: request.customer_id,
                })
                .await
            {
                warn!(error = %e, %order_id, "failed to send order created event");
            }
        }

        Ok(assemble_response(
            order_model,
            item_responses,
            Some(delivery_address),
        ))
    }

    /// Retrieves an order with its lines and delivery address.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<Option<OrderResponse>, ServiceError> {
        let Some(order_model) = Order::find_by_id(order_id).one(&*self.db).await? else {
            return Ok(None);
        };
        Ok(Some(self.populate(order_model).await?))
    }

    /// Lists a customer's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        customer_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::CreatedAt);
        if let Some(customer_id) = customer_id {
            query = query.filter(order::Column::CustomerId.eq(customer_id));
        }
        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let page_models = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut orders = Vec::with_capacity(page_models.len());
        for model in page_models {
            orders.push(self.populate(model).await?);
        }

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Moves an order along its status state machine. Illegal transitions
    /// are rejected before anything is written.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        notes: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let txn = self.db.begin().await?;

        let order_model = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order_model.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatusTransition(format!(
                "{} -> {}",
                old_status, new_status
            )));
        }

        let version = order_model.version;
        let mut active: OrderActiveModel = order_model.into();
        active.status = Set(new_status);
        active.version = Set(version + 1);
        active.updated_at = Set(Some(Utc::now()));
        if let Some(notes) = notes {
            active.notes = Set(Some(notes));
        }
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(%order_id, %old_status, %new_status, "order status updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, %order_id, "failed to send status changed event");
            }
        }

        self.populate(updated).await
    }

    /// Cancels an order. Allowed from any pre-delivery state; stock is not
    /// restored.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderResponse, ServiceError> {
        let response = self
            .update_order_status(order_id, OrderStatus::Cancelled, reason)
            .await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::OrderCancelled(order_id)).await {
                warn!(error = %e, %order_id, "failed to send order cancelled event");
            }
        }

        Ok(response)
    }

    async fn populate(&self, order_model: order::Model) -> Result<OrderResponse, ServiceError> {
        let lines = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_model.id))
            .all(&*self.db)
            .await?;
        let delivery_address = Address::find_by_id(order_model.delivery_address_id)
            .one(&*self.db)
            .await?;

        let items = lines
            .into_iter()
            .map(|line| OrderItemResponse {
                id: line.id,
                product_id: line.product_id,
                seller_id: line.seller_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                total_price: line.total_price,
            })
            .collect();

        Ok(assemble_response(order_model, items, delivery_address))
    }
}

fn assemble_response(
    model: order::Model,
    items: Vec<OrderItemResponse>,
    delivery_address: Option<address::Model>,
) -> OrderResponse {
    OrderResponse {
        id: model.id,
        order_number: model.order_number,
        customer_id: model.customer_id,
        status: model.status,
        subtotal: model.subtotal,
        delivery_fee: model.delivery_fee,
        discount: model.discount,
        total: model.total,
        payment_method: model.payment_method,
        payment_status: model.payment_status,
        items,
        delivery_address,
        notes: model.notes,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}
