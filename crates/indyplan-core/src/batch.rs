//! Batch planning over many targets.
//!
//! Each target plans independently against the same read-only snapshots,
//! so results never depend on batch order or on sibling failures. With
//! the `parallel` feature the batch fans out on a rayon pool; the
//! sequential fallback is behaviorally identical.

use crate::id::TypeId;
use crate::planner::{PlanError, PlanResult, Planner};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One target of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub type_id: TypeId,
    pub quantity: i64,
}

impl PlanRequest {
    pub fn new(type_id: TypeId, quantity: i64) -> Self {
        Self { type_id, quantity }
    }
}

/// Plan every request. Output order matches input order; a failing
/// target yields its own `Err` without disturbing the others.
#[cfg(not(feature = "parallel"))]
pub fn plan_batch(
    planner: &Planner<'_>,
    requests: &[PlanRequest],
) -> Vec<Result<PlanResult, PlanError>> {
    requests
        .iter()
        .map(|r| planner.resolve_and_plan(r.type_id, r.quantity))
        .collect()
}

/// Plan every request on the rayon pool. Output order matches input
/// order; a failing target yields its own `Err` without disturbing the
/// others.
#[cfg(feature = "parallel")]
pub fn plan_batch(
    planner: &Planner<'_>,
    requests: &[PlanRequest],
) -> Vec<Result<PlanResult, PlanError>> {
    requests
        .par_iter()
        .map(|r| planner.resolve_and_plan(r.type_id, r.quantity))
        .collect()
}
