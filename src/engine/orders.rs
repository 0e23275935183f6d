//! Order lifecycle manager: validation, execution, cancel/modify, expiry.
//!
//! Execution model: market orders are deemed immediately and fully filled at
//! the estimated price. This is the simulation's contract, not a matching
//! engine. The fill and the ledger posting happen inside one serialized step
//! per order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Datelike, Duration, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::error::EngineError;
use crate::domain::market::AssetClass;
use crate::domain::order::{
    Fill, Order, OrderId, OrderSide, OrderStatus, OrderType, TimeInForce,
};
use crate::domain::portfolio::Trade;
use crate::engine::events::EventBus;
use crate::engine::ledger::Ledger;
use crate::engine::risk::RiskEngine;
use crate::ports::exchange::ExchangePort;
use crate::ports::store::StorePort;

/// Basis-point commission schedule with an absolute per-fill floor.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionSchedule {
    pub crypto_bps: f64,
    pub fx_bps: f64,
    pub equity_bps: f64,
    pub min_commission: f64,
}

impl Default for CommissionSchedule {
    fn default() -> Self {
        Self {
            crypto_bps: 10.0,
            fx_bps: 2.0,
            equity_bps: 5.0,
            min_commission: 0.10,
        }
    }
}

impl CommissionSchedule {
    pub fn commission(&self, symbol: &str, notional: f64) -> f64 {
        let bps = match AssetClass::of(symbol) {
            AssetClass::Crypto => self.crypto_bps,
            AssetClass::Fx => self.fx_bps,
            AssetClass::Equity => self.equity_bps,
        };
        (notional.abs() * bps / 10_000.0).max(self.min_commission)
    }
}

/// Simplified session gate. Crypto trades around the clock; FX keeps the
/// Sunday 22:00 to Friday 22:00 UTC week; equities keep the 14:30 to 21:00
/// UTC weekday session.
pub fn market_open(symbol: &str, at: DateTime<Utc>) -> bool {
    match AssetClass::of(symbol) {
        AssetClass::Crypto => true,
        AssetClass::Fx => match at.weekday() {
            Weekday::Sat => false,
            Weekday::Sun => at.hour() >= 22,
            Weekday::Fri => at.hour() < 22,
            _ => true,
        },
        AssetClass::Equity => {
            let open = NaiveTime::from_hms_opt(14, 30, 0).unwrap_or_default();
            let close = NaiveTime::from_hms_opt(21, 0, 0).unwrap_or_default();
            let t = at.time();
            !matches!(at.weekday(), Weekday::Sat | Weekday::Sun) && t >= open && t < close
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub portfolio_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub stop_price: Option<f64>,
    pub time_in_force: TimeInForce,
    /// Protective levels; a filled parent derives child orders from them.
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl OrderRequest {
    pub fn market(
        portfolio_id: impl Into<String>,
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: f64,
    ) -> Self {
        Self {
            portfolio_id: portfolio_id.into(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            stop_price: None,
            time_in_force: TimeInForce::Gtc,
            stop_loss: None,
            take_profit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

/// Outcome of the pre-trade validation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub estimated_cost: f64,
    pub estimated_commission: f64,
    pub risk: RiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub order: Option<Order>,
    pub message: String,
}

impl ExecutionReport {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            order: None,
            message: message.into(),
        }
    }
}

pub struct OrderManager {
    orders: Mutex<HashMap<OrderId, Order>>,
    exchange_ids: Mutex<HashMap<OrderId, String>>,
    next_order_id: Mutex<u64>,
    next_fill_id: Mutex<u64>,
    exchange: Arc<dyn ExchangePort>,
    store: Arc<dyn StorePort>,
    risk: Arc<RiskEngine>,
    ledger: Arc<Ledger>,
    commission: CommissionSchedule,
    order_bus: Arc<EventBus<Order>>,
    execution_bus: Arc<EventBus<Fill>>,
}

impl OrderManager {
    pub fn new(
        exchange: Arc<dyn ExchangePort>,
        store: Arc<dyn StorePort>,
        risk: Arc<RiskEngine>,
        ledger: Arc<Ledger>,
        commission: CommissionSchedule,
        order_bus: Arc<EventBus<Order>>,
        execution_bus: Arc<EventBus<Fill>>,
    ) -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            exchange_ids: Mutex::new(HashMap::new()),
            next_order_id: Mutex::new(1),
            next_fill_id: Mutex::new(1),
            exchange,
            store,
            risk,
            ledger,
            commission,
            order_bus,
            execution_bus,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<OrderId, Order>> {
        self.orders.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn allocate_order_id(&self) -> OrderId {
        let mut next = self.next_order_id.lock().unwrap_or_else(|e| e.into_inner());
        let id = OrderId(*next);
        *next += 1;
        id
    }

    fn allocate_fill_id(&self) -> u64 {
        let mut next = self.next_fill_id.lock().unwrap_or_else(|e| e.into_inner());
        let id = *next;
        *next += 1;
        id
    }

    pub fn order(&self, id: OrderId) -> Option<Order> {
        self.map().get(&id).cloned()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.map().values().cloned().collect()
    }

    /// Pre-trade validation chain: field checks, portfolio existence, cost
    /// and commission estimation, cash or position sufficiency, risk-engine
    /// delegation, market-hours warning, coarse risk assessment. Stages after
    /// a failed one are skipped.
    pub fn validate(&self, request: &OrderRequest) -> OrderValidation {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if request.symbol.trim().is_empty() {
            errors.push("symbol is required".to_string());
        }
        if request.quantity <= 0.0 {
            errors.push("quantity must be positive".to_string());
        }
        if request.order_type.requires_price() && request.price.is_none() {
            errors.push(format!("{:?} orders require a price", request.order_type));
        }
        if request.order_type.requires_stop_price() && request.stop_price.is_none() {
            errors.push(format!(
                "{:?} orders require a stop price",
                request.order_type
            ));
        }

        let mut estimated_cost = 0.0;
        let mut estimated_commission = 0.0;
        let mut risk = RiskAssessment {
            level: RiskLevel::Low,
            factors: Vec::new(),
        };

        if errors.is_empty() {
            match self.ledger.portfolio(&request.portfolio_id) {
                None => errors.push(format!("portfolio '{}' not found", request.portfolio_id)),
                Some(portfolio) => match self.estimate_price(request) {
                    Err(err) => errors.push(format!("cannot estimate price: {err}")),
                    Ok(price) => {
                        estimated_cost = request.quantity * price;
                        estimated_commission =
                            self.commission.commission(&request.symbol, estimated_cost);

                        match request.side {
                            OrderSide::Buy => {
                                if estimated_cost + estimated_commission > portfolio.cash_balance {
                                    errors.push(format!(
                                        "insufficient cash: need {:.2}, have {:.2}",
                                        estimated_cost + estimated_commission,
                                        portfolio.cash_balance
                                    ));
                                }
                            }
                            OrderSide::Sell => {
                                let held = portfolio
                                    .position(&request.symbol)
                                    .map(|p| p.quantity)
                                    .unwrap_or(0.0);
                                if request.quantity > held + 1e-9 {
                                    errors.push(format!(
                                        "insufficient position: selling {} of {} held",
                                        request.quantity, held
                                    ));
                                }
                            }
                        }

                        if errors.is_empty() {
                            let account = crate::domain::account::AccountSnapshot {
                                balance: portfolio.cash_balance,
                                equity: portfolio.total_equity,
                                margin_used: portfolio.margin_used,
                                free_margin: portfolio.free_margin,
                            };
                            if let Err(err) = self.risk.validate_order(
                                &request.symbol,
                                request.side,
                                request.quantity,
                                price,
                                &portfolio,
                                &account,
                            ) {
                                errors.push(err.to_string());
                            }
                        }

                        if !market_open(&request.symbol, Utc::now()) {
                            warnings.push(format!("market for {} is closed", request.symbol));
                        }

                        risk = assess_risk(
                            self.risk.limits().max_position_size_pct,
                            estimated_cost,
                            portfolio.total_value,
                            request,
                        );
                    }
                },
            }
        }

        OrderValidation {
            valid: errors.is_empty(),
            errors,
            warnings,
            estimated_cost,
            estimated_commission,
            risk,
        }
    }

    /// Validate and execute. A failed validation yields a failed report and
    /// no order. Market orders fill immediately at the estimated price and
    /// post the net trade to the ledger; limit and stop orders rest as
    /// `Submitted`.
    pub fn execute(&self, request: &OrderRequest) -> ExecutionReport {
        let validation = self.validate(request);
        if !validation.valid {
            return ExecutionReport::failed(validation.errors.join("; "));
        }
        for warning in &validation.warnings {
            warn!(symbol = %request.symbol, "{warning}");
        }

        let now = Utc::now();
        let id = self.allocate_order_id();
        let mut order = Order::new(
            id,
            request.portfolio_id.clone(),
            request.symbol.clone(),
            request.side,
            request.order_type,
            request.quantity,
            request.price,
            request.stop_price,
            request.time_in_force,
            now,
        );

        let placed = self.exchange.place_order(
            &request.symbol,
            request.order_type,
            request.side,
            request.quantity,
            request.price,
        );
        let exchange_order = match placed {
            Ok(exchange_order) => exchange_order,
            Err(err) => {
                let message = format!("exchange rejected order: {err}");
                if let Err(inner) = order.reject(message.clone(), now) {
                    warn!(order = %id, error = %inner, "reject transition failed");
                }
                self.remember(order.clone());
                return ExecutionReport {
                    success: false,
                    order: Some(order),
                    message,
                };
            }
        };

        if let Err(err) = order.submit(now) {
            return ExecutionReport::failed(format!("submit failed: {err}"));
        }
        self.exchange_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, exchange_order.id.clone());

        let message = if request.order_type == OrderType::Market {
            match self.fill_market_order(&mut order, exchange_order.price, request) {
                Ok(()) => format!("order {id} filled at {:.2}", order.avg_fill_price),
                Err(err) => {
                    self.remember(order.clone());
                    return ExecutionReport {
                        success: false,
                        order: Some(order),
                        message: format!("fill failed: {err}"),
                    };
                }
            }
        } else {
            format!("order {id} resting on exchange")
        };

        self.remember(order.clone());
        info!(order = %id, symbol = %request.symbol, "{message}");
        ExecutionReport {
            success: true,
            order: Some(order),
            message,
        }
    }

    /// Cancel a working order. Returns `Ok(false)` when the order is already
    /// terminal.
    pub fn cancel(&self, id: OrderId) -> Result<bool, EngineError> {
        let mut map = self.map();
        let order = map
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("order", id.to_string()))?;
        if order.status.is_terminal() {
            return Ok(false);
        }

        if order.status != OrderStatus::Pending {
            let exchange_id = self
                .exchange_ids
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(&id)
                .cloned();
            if let Some(exchange_id) = exchange_id {
                if let Err(err) = self.exchange.cancel_order(&exchange_id) {
                    warn!(order = %id, error = %err, "exchange cancel failed");
                }
            }
        }

        order.cancel(Utc::now())?;
        let snapshot = order.clone();
        drop(map);
        self.persist(&snapshot);
        self.order_bus.publish(&snapshot);
        Ok(true)
    }

    /// Modify a resting order by canceling and resubmitting under the same
    /// identity. Only legal while `Submitted`.
    pub fn modify(
        &self,
        id: OrderId,
        price: Option<f64>,
        quantity: Option<f64>,
        stop_price: Option<f64>,
    ) -> Result<Order, EngineError> {
        let mut map = self.map();
        let order = map
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("order", id.to_string()))?;
        if order.status != OrderStatus::Submitted {
            return Err(EngineError::validation(format!(
                "order {id} is {:?}, only submitted orders can be modified",
                order.status
            )));
        }
        if let Some(quantity) = quantity {
            if quantity <= 0.0 {
                return Err(EngineError::validation("quantity must be positive"));
            }
        }

        let exchange_id = self
            .exchange_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned();
        if let Some(exchange_id) = &exchange_id {
            self.exchange.cancel_order(exchange_id)?;
        }

        if let Some(price) = price {
            order.price = Some(price);
        }
        if let Some(quantity) = quantity {
            order.quantity = quantity;
            order.remaining_quantity = quantity - order.filled_quantity;
        }
        if let Some(stop_price) = stop_price {
            order.stop_price = Some(stop_price);
        }

        let replacement = self.exchange.place_order(
            &order.symbol,
            order.order_type,
            order.side,
            order.remaining_quantity,
            order.price,
        )?;
        self.exchange_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, replacement.id);
        order.updated_at = Utc::now();

        let snapshot = order.clone();
        drop(map);
        self.persist(&snapshot);
        self.order_bus.publish(&snapshot);
        Ok(snapshot)
    }

    /// Expire resting orders older than `max_age`. Day orders expire on this
    /// sweep regardless of age once their creation day has passed.
    pub fn expire_stale(&self, max_age: Duration, now: DateTime<Utc>) -> Vec<OrderId> {
        let mut expired = Vec::new();
        let mut map = self.map();
        for (id, order) in map.iter_mut() {
            if order.status != OrderStatus::Submitted {
                continue;
            }
            let day_rolled = order.time_in_force == TimeInForce::Day
                && now.date_naive() > order.created_at.date_naive();
            let stale = now - order.created_at > max_age;
            if !(day_rolled || stale) {
                continue;
            }
            match order.expire(now) {
                Ok(()) => expired.push(*id),
                Err(err) => warn!(order = %id, error = %err, "expire transition failed"),
            }
        }
        let snapshots: Vec<Order> = expired
            .iter()
            .filter_map(|id| map.get(id).cloned())
            .collect();
        drop(map);

        for snapshot in &snapshots {
            self.persist(snapshot);
            self.order_bus.publish(snapshot);
        }
        expired
    }

    fn estimate_price(&self, request: &OrderRequest) -> Result<f64, EngineError> {
        if let Some(price) = request.price {
            return Ok(price);
        }
        let ticker = self.exchange.fetch_ticker(&request.symbol)?;
        Ok(ticker.last)
    }

    /// Fill a market order fully, post the trade to the ledger, and derive
    /// protective child orders. One serialized step for order and portfolio.
    fn fill_market_order(
        &self,
        order: &mut Order,
        price: f64,
        request: &OrderRequest,
    ) -> Result<(), EngineError> {
        let now = Utc::now();
        let commission = self.commission.commission(&order.symbol, order.quantity * price);
        let fill = Fill {
            id: self.allocate_fill_id(),
            order_id: order.id,
            quantity: order.quantity,
            price,
            commission,
            timestamp: now,
        };
        order.apply_fill(fill.clone())?;

        let trade = Trade {
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: fill.quantity,
            price: fill.price,
            commission: fill.commission,
            timestamp: now,
        };
        self.ledger.apply_trades(&order.portfolio_id, &[trade])?;

        self.execution_bus.publish(&fill);
        self.submit_children(order, request);
        Ok(())
    }

    /// Best-effort child stop-loss/take-profit orders for a filled parent.
    /// Child failures are logged, never propagated.
    fn submit_children(&self, parent: &mut Order, request: &OrderRequest) {
        let child_side = match parent.side {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        };

        if let Some(stop_loss) = request.stop_loss {
            match self.submit_child(parent, child_side, OrderType::Stop, None, Some(stop_loss)) {
                Ok(child_id) => parent.stop_loss_child = Some(child_id),
                Err(err) => warn!(order = %parent.id, error = %err, "stop-loss child failed"),
            }
        }
        if let Some(take_profit) = request.take_profit {
            match self.submit_child(parent, child_side, OrderType::Limit, Some(take_profit), None) {
                Ok(child_id) => parent.take_profit_child = Some(child_id),
                Err(err) => warn!(order = %parent.id, error = %err, "take-profit child failed"),
            }
        }
    }

    fn submit_child(
        &self,
        parent: &Order,
        side: OrderSide,
        order_type: OrderType,
        price: Option<f64>,
        stop_price: Option<f64>,
    ) -> Result<OrderId, EngineError> {
        let now = Utc::now();
        let id = self.allocate_order_id();
        let mut child = Order::new(
            id,
            parent.portfolio_id.clone(),
            parent.symbol.clone(),
            side,
            order_type,
            parent.filled_quantity,
            price,
            stop_price,
            TimeInForce::Gtc,
            now,
        );
        let placed = self
            .exchange
            .place_order(&parent.symbol, order_type, side, child.quantity, price)?;
        child.submit(now)?;
        self.exchange_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, placed.id);
        self.remember(child);
        Ok(id)
    }

    fn remember(&self, order: Order) {
        self.persist(&order);
        self.order_bus.publish(&order);
        self.map().insert(order.id, order);
    }

    fn persist(&self, order: &Order) {
        if let Err(err) = self.store.save_order(order) {
            warn!(order = %order.id, error = %err, "order save failed");
        }
    }
}

/// Coarse pre-trade risk assessment derived from position size relative to
/// the configured ceiling.
fn assess_risk(
    max_position_size_pct: f64,
    estimated_cost: f64,
    portfolio_value: f64,
    request: &OrderRequest,
) -> RiskAssessment {
    let mut factors = Vec::new();
    let size_pct = if portfolio_value > 0.0 {
        estimated_cost / portfolio_value * 100.0
    } else {
        0.0
    };

    let level = if size_pct > 0.8 * max_position_size_pct {
        factors.push(format!(
            "order is {size_pct:.1}% of portfolio, near the {max_position_size_pct:.1}% ceiling"
        ));
        RiskLevel::High
    } else if size_pct > 0.5 * max_position_size_pct {
        factors.push(format!("order is {size_pct:.1}% of portfolio"));
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    if request.order_type == OrderType::Market {
        factors.push("market order executes at the prevailing price".to_string());
    }
    if request.stop_loss.is_none() && request.side == OrderSide::Buy {
        factors.push("no stop-loss attached".to_string());
    }

    RiskAssessment { level, factors }
}
