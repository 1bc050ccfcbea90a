use crate::id::TypeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Market reference prices for one type. Either field may be absent, and a
/// non-positive value counts as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Rolling average market price per unit.
    pub average: Option<f64>,
    /// Authority-published adjusted price per unit, used for job-fee bases.
    pub adjusted: Option<f64>,
}

impl PriceQuote {
    pub fn new(average: Option<f64>, adjusted: Option<f64>) -> Self {
        Self { average, adjusted }
    }
}

fn positive(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > 0.0)
}

/// Immutable snapshot of per-type market prices.
///
/// Two selection rules, matching their distinct consumers:
/// - buy decisions use [`buy_unit_price`](Self::buy_unit_price): average
///   first, adjusted as fallback;
/// - estimated-value bases (job fees) use
///   [`basis_unit_price`](Self::basis_unit_price): adjusted first, average
///   as fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSnapshot {
    quotes: HashMap<TypeId, PriceQuote>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_id: TypeId, quote: PriceQuote) {
        self.quotes.insert(type_id, quote);
    }

    pub fn quote(&self, type_id: TypeId) -> Option<PriceQuote> {
        self.quotes.get(&type_id).copied()
    }

    /// Unit price for buy-vs-build comparisons: average, else adjusted.
    pub fn buy_unit_price(&self, type_id: TypeId) -> Option<f64> {
        let q = self.quotes.get(&type_id)?;
        positive(q.average).or(positive(q.adjusted))
    }

    /// Unit price for EIV and job-fee bases: adjusted, else average.
    pub fn basis_unit_price(&self, type_id: TypeId) -> Option<f64> {
        let q = self.quotes.get(&type_id)?;
        positive(q.adjusted).or(positive(q.average))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl FromIterator<(TypeId, PriceQuote)> for PriceSnapshot {
    fn from_iter<I: IntoIterator<Item = (TypeId, PriceQuote)>>(iter: I) -> Self {
        Self {
            quotes: iter.into_iter().collect(),
        }
    }
}
