//! Multiplicative bonus stacking.
//!
//! Reductions combine as `1 - prod(1 - f_i)`, so stacking 5% and 4.2%
//! yields 8.99%, never 9.2%. A full reduction of 1.0 saturates the
//! stack; partial reductions alone never reach it.

use crate::catalog::{Activity, Catalog, RIG_GROUP_ALL, RigMetric};
use crate::id::TypeId;

/// Combine reduction fractions multiplicatively. Inputs are fractions in
/// [0, 1]: non-positive and non-finite entries are skipped, entries
/// above 1 clamp to 1, and any input of 1 makes the result 1. Percent
/// normalization of untyped config happens at the profile boundary
/// ([`crate::profile::as_fraction`]), not here.
pub fn combined_reduction<I>(fractions: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut remaining = 1.0_f64;
    for raw in fractions {
        if !raw.is_finite() || raw <= 0.0 {
            continue;
        }
        remaining *= 1.0 - raw.min(1.0);
    }
    (1.0 - remaining).clamp(0.0, 1.0)
}

/// Combined reduction from the installed rigs that match an activity,
/// product group and metric. A rig effect in the "All" group applies to
/// every product group.
pub fn rig_reduction(
    catalog: &Catalog,
    rig_type_ids: &[TypeId],
    activity: Activity,
    group: &str,
    metric: RigMetric,
) -> f64 {
    let matching = rig_type_ids
        .iter()
        .flat_map(|rig| catalog.rig_effects(*rig))
        .filter(|effect| {
            effect.activity == activity
                && effect.metric == metric
                && (effect.group == group || effect.group == RIG_GROUP_ALL)
        })
        .map(|effect| effect.reduction);
    combined_reduction(matching)
}

/// Layer a facility-level reduction with a rig-level reduction. Either
/// layer may be zero; the same stacking formula applies across layers.
pub fn layered_reduction(facility: f64, rig: f64) -> f64 {
    combined_reduction([facility, rig])
}
