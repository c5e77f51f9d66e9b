use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// Lifecycle of a tracked vehicle request.
///
/// `FactoryOrder`, `Locate` and `DealerExchange` are the ways an order can
/// start; every one of them moves to `Received` and then `Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    FactoryOrder,
    Locate,
    DealerExchange,
    Received,
    Delivered,
}

impl OrderStatus {
    pub const INITIAL: [OrderStatus; 3] = [OrderStatus::FactoryOrder, OrderStatus::Locate, OrderStatus::DealerExchange];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::FactoryOrder => "FactoryOrder",
            OrderStatus::Locate => "Locate",
            OrderStatus::DealerExchange => "DealerExchange",
            OrderStatus::Received => "Received",
            OrderStatus::Delivered => "Delivered",
        }
    }

    pub fn is_initial(&self) -> bool {
        Self::INITIAL.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    /// Whether `next` is a legal forward step. Staying put is not a step.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (from, OrderStatus::Received) => from.is_initial(),
            (OrderStatus::Received, OrderStatus::Delivered) => true,
            _ => false,
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::FactoryOrder
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FactoryOrder" => Ok(OrderStatus::FactoryOrder),
            "Locate" => Ok(OrderStatus::Locate),
            "DealerExchange" => Ok(OrderStatus::DealerExchange),
            "Received" => Ok(OrderStatus::Received),
            "Delivered" => Ok(OrderStatus::Delivered),
            other => Err(AppError::invalid_argument(format!("unknown order status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub creator_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub vehicle_model: String,
    pub trim_level: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    #[serde(default)]
    pub option_codes: Vec<String>,
    pub msrp_cents: Option<i64>,
    pub selling_price_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Business fields a client submits; ownership fields are stamped server side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreateRequest {
    #[schema(example = "Grace Hopper")]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    #[schema(example = "Model Y")]
    pub vehicle_model: String,
    pub trim_level: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    #[serde(default)]
    pub option_codes: Vec<String>,
    pub msrp_cents: Option<i64>,
    pub selling_price_cents: Option<i64>,
    pub deposit_cents: Option<i64>,
    pub notes: Option<String>,
    pub status: Option<OrderStatus>,
}

/// Merge patch for an order. Owners may touch the customer fields and
/// notes; status moves are admin only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
    pub status: Option<OrderStatus>,
}
