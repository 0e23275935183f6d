//! Engine services and their wiring.

pub mod events;
pub mod ledger;
pub mod orders;
pub mod risk;
pub mod strategy;

use std::sync::Arc;

use crate::domain::limits::RiskLimits;
use crate::domain::order::{Fill, Order};
use crate::domain::portfolio::Portfolio;
use crate::domain::signal::Signal;
use crate::ports::exchange::ExchangePort;
use crate::ports::store::StorePort;

use events::{EventBus, SubscriptionId};
use ledger::Ledger;
use orders::{CommissionSchedule, OrderManager};
use risk::RiskEngine;
use strategy::StrategyEngine;

/// The engine context: every service constructed once over the injected
/// ports, no global state. Portfolio updates feed the risk engine's equity
/// history automatically.
pub struct Engine {
    pub strategies: StrategyEngine,
    pub risk: Arc<RiskEngine>,
    pub ledger: Arc<Ledger>,
    pub orders: OrderManager,
    signal_bus: Arc<EventBus<Signal>>,
    order_bus: Arc<EventBus<Order>>,
    execution_bus: Arc<EventBus<Fill>>,
    portfolio_bus: Arc<EventBus<Portfolio>>,
}

impl Engine {
    pub fn new(
        exchange: Arc<dyn ExchangePort>,
        store: Arc<dyn StorePort>,
        limits: RiskLimits,
        commission: CommissionSchedule,
    ) -> Self {
        let signal_bus = Arc::new(EventBus::new());
        let order_bus = Arc::new(EventBus::new());
        let execution_bus = Arc::new(EventBus::new());
        let portfolio_bus = Arc::new(EventBus::new());

        let risk = Arc::new(RiskEngine::new(limits));
        let ledger = Arc::new(Ledger::new(Arc::clone(&store), Arc::clone(&portfolio_bus)));

        let equity_sink = Arc::clone(&risk);
        portfolio_bus.subscribe(move |portfolio: &Portfolio| {
            equity_sink.record_equity(&portfolio.id, portfolio.total_equity);
        });

        let orders = OrderManager::new(
            exchange,
            store,
            Arc::clone(&risk),
            Arc::clone(&ledger),
            commission,
            Arc::clone(&order_bus),
            Arc::clone(&execution_bus),
        );
        let strategies = StrategyEngine::new(Arc::clone(&signal_bus));

        Self {
            strategies,
            risk,
            ledger,
            orders,
            signal_bus,
            order_bus,
            execution_bus,
            portfolio_bus,
        }
    }

    pub fn subscribe_to_signals<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        self.signal_bus.subscribe(callback)
    }

    pub fn subscribe_to_orders<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Order) + Send + Sync + 'static,
    {
        self.order_bus.subscribe(callback)
    }

    pub fn subscribe_to_executions<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Fill) + Send + Sync + 'static,
    {
        self.execution_bus.subscribe(callback)
    }

    pub fn subscribe_to_portfolio<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Portfolio) + Send + Sync + 'static,
    {
        self.portfolio_bus.subscribe(callback)
    }

    pub fn unsubscribe_from_signals(&self, id: SubscriptionId) -> bool {
        self.signal_bus.unsubscribe(id)
    }

    pub fn unsubscribe_from_orders(&self, id: SubscriptionId) -> bool {
        self.order_bus.unsubscribe(id)
    }

    pub fn unsubscribe_from_executions(&self, id: SubscriptionId) -> bool {
        self.execution_bus.unsubscribe(id)
    }

    pub fn unsubscribe_from_portfolio(&self, id: SubscriptionId) -> bool {
        self.portfolio_bus.unsubscribe(id)
    }
}
