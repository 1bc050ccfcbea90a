//! Job installation fees.
//!
//! Every activity charges against a job-cost base derived from the
//! estimated item value (EIV) of the run's ME0 inputs at basis prices.
//! The fee formula is shared; only the base fraction differs per activity.

use crate::catalog::Activity;
use serde::{Deserialize, Serialize};

impl Activity {
    /// Fraction of the material EIV that forms the job-cost base.
    pub fn job_cost_base_fraction(self) -> f64 {
        match self {
            Activity::Manufacturing => 0.01,
            Activity::Copying => 0.02,
            Activity::Invention => 1.0,
            Activity::Reaction => 1.0,
        }
    }
}

/// Itemized job fee. `total_job_cost` is the only field that feeds cost
/// totals; the rest exist so callers can display the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JobFeeBreakdown {
    /// Job-cost base (EIV times the activity fraction).
    pub job_cost_base: f64,
    pub cost_index: f64,
    /// Combined facility + rig cost reduction applied to the gross cost.
    pub cost_reduction: f64,
    /// Tax-like fraction charged on the base, unaffected by bonuses.
    pub surcharge: f64,
    pub gross_cost: f64,
    pub gross_cost_after_bonuses: f64,
    pub taxes: f64,
    pub total_job_cost: f64,
}

/// Compute a job fee from its base. Cost reductions only shrink the
/// index-driven part; taxes always apply to the full base. The total
/// never goes negative.
pub fn job_fee(
    job_cost_base: f64,
    cost_index: f64,
    cost_reduction: f64,
    surcharge: f64,
) -> JobFeeBreakdown {
    let base = job_cost_base.max(0.0);
    let gross_cost = base * cost_index.max(0.0);
    let reduction = cost_reduction.clamp(0.0, 1.0);
    let gross_cost_after_bonuses = gross_cost * (1.0 - reduction);
    let taxes = base * surcharge.max(0.0);
    let total_job_cost = (gross_cost_after_bonuses + taxes).max(0.0);
    JobFeeBreakdown {
        job_cost_base: base,
        cost_index,
        cost_reduction: reduction,
        surcharge,
        gross_cost,
        gross_cost_after_bonuses,
        taxes,
        total_job_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn fee_arithmetic() {
        // base 1_000_000, index 5%, reduction 3%, surcharge 4%.
        let fee = job_fee(1_000_000.0, 0.05, 0.03, 0.04);
        assert_close(fee.gross_cost, 50_000.0);
        assert_close(fee.gross_cost_after_bonuses, 48_500.0);
        assert_close(fee.taxes, 40_000.0);
        assert_close(fee.total_job_cost, 88_500.0);
    }

    #[test]
    fn zero_index_still_charges_taxes() {
        let fee = job_fee(1_000_000.0, 0.0, 0.0, 0.04);
        assert_close(fee.gross_cost, 0.0);
        assert_close(fee.total_job_cost, 40_000.0);
    }

    #[test]
    fn full_reduction_leaves_only_taxes() {
        let fee = job_fee(500_000.0, 0.1, 1.0, 0.02);
        assert_close(fee.gross_cost_after_bonuses, 0.0);
        assert_close(fee.total_job_cost, 10_000.0);
    }

    #[test]
    fn total_never_negative() {
        let fee = job_fee(-100.0, 0.05, 0.0, 0.0);
        assert_eq!(fee.total_job_cost, 0.0);
        assert_eq!(fee.job_cost_base, 0.0);
    }

    #[test]
    fn reduction_out_of_range_is_clamped() {
        let fee = job_fee(100.0, 1.0, 1.5, 0.0);
        assert_close(fee.gross_cost_after_bonuses, 0.0);
    }

    #[test]
    fn base_fractions_per_activity() {
        assert_eq!(Activity::Manufacturing.job_cost_base_fraction(), 0.01);
        assert_eq!(Activity::Copying.job_cost_base_fraction(), 0.02);
        assert_eq!(Activity::Invention.job_cost_base_fraction(), 1.0);
        assert_eq!(Activity::Reaction.job_cost_base_fraction(), 1.0);
    }

    #[test]
    fn fee_is_monotonic_in_base() {
        let small = job_fee(100.0, 0.05, 0.1, 0.02);
        let large = job_fee(200.0, 0.05, 0.1, 0.02);
        assert!(large.total_job_cost > small.total_job_cost);
    }
}
