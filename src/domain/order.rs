//! Order aggregate and lifecycle state machine.
//!
//! Orders are mutated only through the explicit transition methods below.
//! Each transition validates legality against [`OrderStatus::can_transition`]
//! and maintains `filled_quantity + remaining_quantity == quantity`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    /// Limit and stop-limit orders carry a limit price.
    pub fn requires_price(&self) -> bool {
        matches!(self, OrderType::Limit | OrderType::StopLimit)
    }

    /// Stop and stop-limit orders carry a trigger price.
    pub fn requires_stop_price(&self) -> bool {
        matches!(self, OrderType::Stop | OrderType::StopLimit)
    }
}

/// Order validity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till canceled.
    Gtc,
    /// Immediate or cancel.
    Ioc,
    /// Fill or kill.
    Fok,
    /// Valid for the trading day.
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created locally, not yet handed to the exchange.
    Pending,
    /// Resting on the exchange.
    Submitted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Legal transition table.
    pub fn can_transition(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending, Submitted) | (Pending, Rejected) | (Pending, Canceled) => true,
            (Submitted, PartiallyFilled)
            | (Submitted, Filled)
            | (Submitted, Canceled)
            | (Submitted, Rejected)
            | (Submitted, Expired) => true,
            (PartiallyFilled, PartiallyFilled)
            | (PartiallyFilled, Filled)
            | (PartiallyFilled, Canceled) => true,
            _ => false,
        }
    }
}

/// A discrete execution event against an order. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub id: u64,
    pub order_id: OrderId,
    pub quantity: f64,
    pub price: f64,
    pub commission: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub portfolio_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub stop_price: Option<f64>,
    pub time_in_force: TimeInForce,
    pub status: OrderStatus,
    pub filled_quantity: f64,
    pub remaining_quantity: f64,
    /// Volume-weighted average fill price; 0 until the first fill.
    pub avg_fill_price: f64,
    /// Commission accumulated across fills.
    pub commission: f64,
    pub fills: Vec<Fill>,
    pub stop_loss_child: Option<OrderId>,
    pub take_profit_child: Option<OrderId>,
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: OrderId,
        portfolio_id: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        quantity: f64,
        price: Option<f64>,
        stop_price: Option<f64>,
        time_in_force: TimeInForce,
        now: DateTime<Utc>,
    ) -> Self {
        Order {
            id,
            portfolio_id: portfolio_id.into(),
            symbol: symbol.into(),
            side,
            order_type,
            quantity,
            price,
            stop_price,
            time_in_force,
            status: OrderStatus::Pending,
            filled_quantity: 0.0,
            remaining_quantity: quantity,
            avg_fill_price: 0.0,
            commission: 0.0,
            fills: Vec::new(),
            stop_loss_child: None,
            take_profit_child: None,
            reject_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), EngineError> {
        if !self.status.can_transition(next) {
            return Err(EngineError::Invariant {
                reason: format!(
                    "illegal order transition {:?} -> {:?} for order {}",
                    self.status, next, self.id
                ),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Mark the order as accepted by the exchange.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.transition(OrderStatus::Submitted, now)
    }

    /// Apply one fill. Transitions to `PartiallyFilled` or `Filled` depending
    /// on remaining quantity.
    pub fn apply_fill(&mut self, fill: Fill) -> Result<(), EngineError> {
        if !matches!(
            self.status,
            OrderStatus::Submitted | OrderStatus::PartiallyFilled
        ) {
            return Err(EngineError::Invariant {
                reason: format!(
                    "cannot fill order {} in status {:?}",
                    self.id, self.status
                ),
            });
        }
        if fill.quantity <= 0.0 {
            return Err(EngineError::Invariant {
                reason: format!("fill quantity must be positive, got {}", fill.quantity),
            });
        }
        if fill.quantity > self.remaining_quantity + 1e-9 {
            return Err(EngineError::Invariant {
                reason: format!(
                    "fill quantity {} exceeds remaining {} on order {}",
                    fill.quantity, self.remaining_quantity, self.id
                ),
            });
        }

        let now = fill.timestamp;
        let fill_value = fill.quantity * fill.price;
        let total_value = self.avg_fill_price * self.filled_quantity + fill_value;

        self.filled_quantity += fill.quantity;
        self.remaining_quantity = (self.quantity - self.filled_quantity).max(0.0);
        self.avg_fill_price = total_value / self.filled_quantity;
        self.commission += fill.commission;
        self.fills.push(fill);

        if self.remaining_quantity <= 1e-9 {
            self.remaining_quantity = 0.0;
            self.filled_quantity = self.quantity;
            self.transition(OrderStatus::Filled, now)
        } else {
            self.transition(OrderStatus::PartiallyFilled, now)
        }
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.transition(OrderStatus::Canceled, now)
    }

    pub fn reject(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.reject_reason = Some(reason.into());
        self.transition(OrderStatus::Rejected, now)
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.transition(OrderStatus::Expired, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn make_order(quantity: f64) -> Order {
        Order::new(
            OrderId(1),
            "p1",
            "BTCUSDT",
            OrderSide::Buy,
            OrderType::Market,
            quantity,
            None,
            None,
            TimeInForce::Gtc,
            now(),
        )
    }

    fn make_fill(quantity: f64, price: f64) -> Fill {
        Fill {
            id: 1,
            order_id: OrderId(1),
            quantity,
            price,
            commission: 1.0,
            timestamp: now(),
        }
    }

    #[test]
    fn new_order_is_pending() {
        let order = make_order(10.0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!((order.remaining_quantity - 10.0).abs() < f64::EPSILON);
        assert!((order.filled_quantity - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn full_fill_reaches_terminal() {
        let mut order = make_order(10.0);
        order.submit(now()).unwrap();
        order.apply_fill(make_fill(10.0, 100.0)).unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.status.is_terminal());
        assert!((order.filled_quantity - 10.0).abs() < f64::EPSILON);
        assert!((order.remaining_quantity - 0.0).abs() < f64::EPSILON);
        assert!((order.avg_fill_price - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_fills_accumulate_vwap() {
        let mut order = make_order(10.0);
        order.submit(now()).unwrap();
        order.apply_fill(make_fill(4.0, 100.0)).unwrap();
        assert_eq!(order.status, OrderStatus::PartiallyFilled);

        order.apply_fill(make_fill(6.0, 110.0)).unwrap();
        assert_eq!(order.status, OrderStatus::Filled);

        // (4*100 + 6*110) / 10 = 106
        assert!((order.avg_fill_price - 106.0).abs() < 1e-9);
        assert!((order.commission - 2.0).abs() < f64::EPSILON);
        assert_eq!(order.fills.len(), 2);
    }

    #[test]
    fn quantity_invariant_holds_after_each_fill() {
        let mut order = make_order(10.0);
        order.submit(now()).unwrap();
        for qty in [2.5, 3.5, 4.0] {
            order.apply_fill(make_fill(qty, 100.0)).unwrap();
            assert!(
                (order.filled_quantity + order.remaining_quantity - order.quantity).abs() < 1e-9
            );
        }
    }

    #[test]
    fn overfill_rejected() {
        let mut order = make_order(5.0);
        order.submit(now()).unwrap();
        let result = order.apply_fill(make_fill(6.0, 100.0));
        assert!(matches!(result, Err(EngineError::Invariant { .. })));
    }

    #[test]
    fn cancel_from_pending_and_submitted() {
        let mut order = make_order(5.0);
        order.cancel(now()).unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);

        let mut order = make_order(5.0);
        order.submit(now()).unwrap();
        order.cancel(now()).unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
    }

    #[test]
    fn cancel_after_filled_is_illegal() {
        let mut order = make_order(5.0);
        order.submit(now()).unwrap();
        order.apply_fill(make_fill(5.0, 100.0)).unwrap();

        let result = order.cancel(now());
        assert!(matches!(result, Err(EngineError::Invariant { .. })));
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn reject_records_reason() {
        let mut order = make_order(5.0);
        order.reject("insufficient cash", now()).unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
        assert_eq!(order.reject_reason.as_deref(), Some("insufficient cash"));
    }

    #[test]
    fn expire_only_from_submitted() {
        let mut order = make_order(5.0);
        assert!(order.expire(now()).is_err());

        order.submit(now()).unwrap();
        order.expire(now()).unwrap();
        assert_eq!(order.status, OrderStatus::Expired);
    }

    #[test]
    fn fill_before_submit_is_illegal() {
        let mut order = make_order(5.0);
        let result = order.apply_fill(make_fill(5.0, 100.0));
        assert!(result.is_err());
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn order_type_price_requirements() {
        assert!(OrderType::Limit.requires_price());
        assert!(OrderType::StopLimit.requires_price());
        assert!(!OrderType::Market.requires_price());
        assert!(OrderType::Stop.requires_stop_price());
        assert!(OrderType::StopLimit.requires_stop_price());
        assert!(!OrderType::Limit.requires_stop_price());
    }
}
