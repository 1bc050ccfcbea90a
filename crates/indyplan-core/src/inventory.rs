//! FIFO inventory valuation.
//!
//! A holding records an on-hand quantity plus acquisition lots with known
//! unit costs. Valuation consumes lots oldest-first on paper only: the
//! snapshot is never mutated, so valuing the same requirement twice gives
//! identical results.

use crate::id::TypeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One acquisition lot: a quantity bought at a known unit cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLot {
    pub quantity: i64,
    pub unit_cost: f64,
    /// Opaque acquisition marker; lots order oldest-first by this value.
    pub acquired_at: Option<u64>,
}

impl InventoryLot {
    pub fn new(quantity: i64, unit_cost: f64) -> Self {
        Self {
            quantity,
            unit_cost,
            acquired_at: None,
        }
    }

    pub fn acquired_at(mut self, marker: u64) -> Self {
        self.acquired_at = Some(marker);
        self
    }
}

/// Inventory position for one type. `on_hand` may exceed the lot total;
/// the excess is unknown-basis stock valued at market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub on_hand: i64,
    lots: Vec<InventoryLot>,
}

impl Holding {
    /// Build a holding. Lots are ordered oldest-first by their marker;
    /// unmarked lots sort before marked ones, preserving input order.
    pub fn new(on_hand: i64, mut lots: Vec<InventoryLot>) -> Self {
        lots.sort_by_key(|lot| lot.acquired_at);
        Self { on_hand, lots }
    }

    pub fn lots(&self) -> &[InventoryLot] {
        &self.lots
    }
}

/// Result of allocating a quantity across FIFO lots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FifoAllocation {
    /// Quantity covered by lots with a known basis.
    pub priced_quantity: i64,
    /// Cost of the priced quantity.
    pub total_cost: f64,
    /// Requested quantity not covered by any lot.
    pub remaining_unpriced: i64,
}

/// Walk lots oldest-first and price as much of `quantity` as they cover.
pub fn fifo_allocate(lots: &[InventoryLot], quantity: i64) -> FifoAllocation {
    let mut remaining = quantity.max(0);
    let mut priced_quantity = 0_i64;
    let mut total_cost = 0.0_f64;
    for lot in lots {
        if remaining == 0 {
            break;
        }
        let available = lot.quantity.max(0);
        if available == 0 {
            continue;
        }
        let take = available.min(remaining);
        priced_quantity += take;
        total_cost += take as f64 * lot.unit_cost;
        remaining -= take;
    }
    FifoAllocation {
        priced_quantity,
        total_cost,
        remaining_unpriced: remaining,
    }
}

/// Full valuation of a requirement against a holding and a market quote.
///
/// Invariants: `inventory_used = min(required, on_hand)`,
/// `fifo_priced <= inventory_used`,
/// `inventory_used + buy_now == required_quantity`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub required_quantity: i64,
    pub inventory_on_hand: i64,
    /// Units drawn from inventory on paper.
    pub inventory_used: i64,
    /// Portion of `inventory_used` with a FIFO-known basis.
    pub fifo_priced: i64,
    /// Cost of the FIFO-priced portion.
    pub fifo_cost: f64,
    /// Inventory consumed beyond the lot total, valued at market.
    pub unknown_basis: i64,
    /// Units that must be bought now.
    pub buy_now: i64,
    /// Market unit price used for the non-FIFO portions, when known.
    pub market_unit_price: Option<f64>,
    /// Market-only cost of the full requirement, ignoring inventory.
    pub buy_cost: Option<f64>,
    /// Inventory-aware acquisition cost. `None` marks an unknowable cost:
    /// some portion needs a market price that does not exist.
    pub effective_cost: Option<f64>,
}

impl Valuation {
    /// Effective cost per unit, when the total is known.
    pub fn effective_unit_cost(&self) -> Option<f64> {
        if self.required_quantity <= 0 {
            return None;
        }
        self.effective_cost
            .map(|c| c / self.required_quantity as f64)
    }

    /// Cost of the inventory-drawn portion alone (FIFO lots plus the
    /// unknown-basis units at market). `None` when unknown-basis stock
    /// exists but no market price does.
    pub fn inventory_portion_cost(&self) -> Option<f64> {
        if self.unknown_basis == 0 {
            return Some(self.fifo_cost);
        }
        self.market_unit_price
            .map(|u| self.fifo_cost + self.unknown_basis as f64 * u)
    }

    /// Market cost of the buy-now shortfall alone. `Some(0.0)` when there
    /// is no shortfall.
    pub fn shortfall_cost(&self) -> Option<f64> {
        if self.buy_now == 0 {
            return Some(0.0);
        }
        self.market_unit_price.map(|u| self.buy_now as f64 * u)
    }
}

/// Value a requirement: FIFO lots first, then market for unknown-basis
/// stock and the shortfall. Pure; the holding is read-only.
pub fn valuate(holding: Option<&Holding>, required: i64, market_unit_price: Option<f64>) -> Valuation {
    let required = required.max(0);
    let on_hand = holding.map(|h| h.on_hand.max(0)).unwrap_or(0);
    let inventory_used = required.min(on_hand);
    let allocation = match holding {
        Some(h) => fifo_allocate(h.lots(), inventory_used),
        None => FifoAllocation::default(),
    };
    let fifo_priced = allocation.priced_quantity.min(inventory_used);
    let unknown_basis = inventory_used - fifo_priced;
    let buy_now = required - inventory_used;
    let market_needed = unknown_basis + buy_now;

    let effective_cost = if market_needed == 0 {
        Some(allocation.total_cost)
    } else {
        market_unit_price.map(|u| allocation.total_cost + market_needed as f64 * u)
    };
    let buy_cost = if required == 0 {
        Some(0.0)
    } else {
        market_unit_price.map(|u| required as f64 * u)
    };

    Valuation {
        required_quantity: required,
        inventory_on_hand: on_hand,
        inventory_used,
        fifo_priced,
        fifo_cost: allocation.total_cost,
        unknown_basis,
        buy_now,
        market_unit_price,
        buy_cost,
        effective_cost,
    }
}

/// Immutable per-type inventory snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySnapshot {
    holdings: HashMap<TypeId, Holding>,
}

impl InventorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_id: TypeId, holding: Holding) {
        self.holdings.insert(type_id, holding);
    }

    pub fn holding(&self, type_id: TypeId) -> Option<&Holding> {
        self.holdings.get(&type_id)
    }

    /// Value a requirement for one type against this snapshot.
    pub fn valuate(
        &self,
        type_id: TypeId,
        required: i64,
        market_unit_price: Option<f64>,
    ) -> Valuation {
        valuate(self.holding(type_id), required, market_unit_price)
    }
}
