use crate::{
    config::AppConfig,
    entities::coupon::{self, DiscountType, Entity as Coupon},
    errors::ServiceError,
    events::{Event, EventSender},
    services::catalog::ValidatedItem,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Delivery fee rule, injected rather than hardcoded so area-specific fees
/// can replace the flat rule without touching the transaction coordinator.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryFeePolicy {
    /// Subtotals strictly above this ship free
    pub free_over: Decimal,
    /// Flat fee charged otherwise
    pub flat_fee: Decimal,
}

impl DeliveryFeePolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            free_over: cfg.free_delivery_over,
            flat_fee: cfg.delivery_flat_fee,
        }
    }

    pub fn fee_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_over {
            Decimal::ZERO
        } else {
            self.flat_fee
        }
    }
}

impl Default for DeliveryFeePolicy {
    fn default() -> Self {
        Self {
            free_over: Decimal::new(1000, 0),
            flat_fee: Decimal::new(50, 0),
        }
    }
}

/// Computed totals for an order about to be committed.
#[derive(Debug, Clone, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Why a supplied coupon code contributed no discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponRejection {
    Unknown,
    Inactive,
    OutsideValidityWindow,
    BelowMinimumOrderValue,
}

impl CouponRejection {
    fn as_str(self) -> &'static str {
        match self {
            CouponRejection::Unknown => "unknown code",
            CouponRejection::Inactive => "coupon inactive",
            CouponRejection::OutsideValidityWindow => "outside validity window",
            CouponRejection::BelowMinimumOrderValue => "subtotal below minimum order value",
        }
    }
}

/// Prices validated line items: subtotal, delivery fee, optional coupon
/// discount, final total. Decimal arithmetic throughout.
#[derive(Clone)]
pub struct PricingEngine {
    policy: DeliveryFeePolicy,
    event_sender: Option<Arc<EventSender>>,
}

impl PricingEngine {
    pub fn new(policy: DeliveryFeePolicy, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            policy,
            event_sender,
        }
    }

    /// Computes order totals over validated items. A coupon code that does
    /// not resolve to an applicable coupon contributes zero discount and
    /// never blocks checkout; the decision is logged and emitted as an event.
    #[instrument(skip(self, conn, items))]
    pub async fn price_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        items: &[ValidatedItem],
        coupon_code: Option<&str>,
    ) -> Result<PriceBreakdown, ServiceError> {
        let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();
        let delivery_fee = self.policy.fee_for(subtotal);

        let discount = match coupon_code {
            Some(code) => self.resolve_discount(conn, code, subtotal).await?,
            None => Decimal::ZERO,
        };

        Ok(PriceBreakdown {
            subtotal,
            delivery_fee,
            discount,
            total: subtotal + delivery_fee - discount,
        })
    }

    async fn resolve_discount<C: ConnectionTrait>(
        &self,
        conn: &C,
        code: &str,
        subtotal: Decimal,
    ) -> Result<Decimal, ServiceError> {
        let found = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(conn)
            .await?;

        let outcome = match found {
            Some(coupon) => match applicable(&coupon, subtotal, Utc::now()) {
                Ok(()) => return Ok(discount_amount(&coupon, subtotal)),
                Err(rejection) => rejection,
            },
            None => CouponRejection::Unknown,
        };

        warn!(code, reason = outcome.as_str(), "coupon ignored");
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::CouponIgnored {
                    code: code.to_string(),
                    reason: outcome.as_str().to_string(),
                    timestamp: Utc::now(),
                })
                .await
            {
                warn!(error = %e, "failed to send coupon ignored event");
            }
        }
        Ok(Decimal::ZERO)
    }
}

/// Eligibility checks for a coupon against the current subtotal and clock.
fn applicable(
    coupon: &coupon::Model,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if now < coupon.valid_from || now > coupon.valid_until {
        return Err(CouponRejection::OutsideValidityWindow);
    }
    let min_order = coupon.min_order_value.unwrap_or(Decimal::ZERO);
    if subtotal < min_order {
        return Err(CouponRejection::BelowMinimumOrderValue);
    }
    Ok(())
}

/// Discount for an applicable coupon. Percentage discounts clamp to
/// `max_discount` when set; fixed discounts apply as-is.
fn discount_amount(coupon: &coupon::Model, subtotal: Decimal) -> Decimal {
    match coupon.discount_type {
        DiscountType::Percentage => {
            let raw = subtotal * coupon.discount_value / Decimal::new(100, 0);
            match coupon.max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountType::Fixed => coupon.discount_value,
    }
}
