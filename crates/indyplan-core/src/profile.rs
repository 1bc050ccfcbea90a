use crate::catalog::Activity;
use crate::id::TypeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normalize a bonus input to a fraction in [0, 1]. Values >= 1 are read
/// as percentages (10 means 10%); negatives clamp to zero.
pub fn as_fraction(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let mut f = value;
    while f >= 1.0 {
        f /= 100.0;
    }
    f.clamp(0.0, 1.0)
}

/// Per-activity system cost indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostIndices {
    pub manufacturing: f64,
    pub invention: f64,
    pub copying: f64,
    pub reaction: f64,
}

impl CostIndices {
    pub fn index_for(&self, activity: Activity) -> f64 {
        match activity {
            Activity::Manufacturing => self.manufacturing,
            Activity::Invention => self.invention,
            Activity::Copying => self.copying,
            Activity::Reaction => self.reaction,
        }
    }
}

/// Where jobs run: taxes, structure-own bonuses, installed rigs and the
/// local cost indices. All reduction fields are fractions (see
/// [`as_fraction`] for the accepted input shapes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityProfile {
    /// Facility owner's tax fraction on the job-cost base.
    pub facility_tax: f64,
    /// Authority surcharge fraction on the job-cost base (SCC-style).
    pub surcharge: f64,
    /// Structure-own material reduction, before rigs.
    pub material_reduction: f64,
    /// Structure-own time reduction, before rigs.
    pub time_reduction: f64,
    /// Structure-own job-cost reduction, before rigs.
    pub cost_reduction: f64,
    /// Installed rig type ids, resolved against the catalog.
    pub rig_type_ids: Vec<TypeId>,
    pub cost_indices: CostIndices,
}

impl FacilityProfile {
    /// Total tax-like fraction applied on top of the bonused job cost.
    pub fn surcharge_total(&self) -> f64 {
        (as_fraction(self.facility_tax) + as_fraction(self.surcharge)).max(0.0)
    }
}

/// Trained skill levels for one character. Levels clamp to 0..=5.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterSkills {
    levels: HashMap<TypeId, u8>,
}

impl CharacterSkills {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&mut self, skill: TypeId, level: u8) {
        self.levels.insert(skill, level.min(5));
    }

    /// Trained level for a skill, zero when untrained.
    pub fn trained_level(&self, skill: TypeId) -> u8 {
        self.levels.get(&skill).copied().unwrap_or(0)
    }
}

impl FromIterator<(TypeId, u8)> for CharacterSkills {
    fn from_iter<I: IntoIterator<Item = (TypeId, u8)>>(iter: I) -> Self {
        let mut skills = Self::new();
        for (skill, level) in iter {
            skills.set_level(skill, level);
        }
        skills
    }
}
