use crate::config::{ProjectType, SuiApplicability};
use crate::engine::map_units::MapUnit;
use crate::error::ValidationError;
use crate::layers::vector::{
    FieldKey, DISTURBANCE_SUBTYPE_DEFAULT, DISTURBANCE_TYPE_DEFAULT,
};
use crate::tables::AttributeWeightTable;
use tracing::debug;

/// One named factor of the modifier product.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierTerm {
    /// Signed weight resolved from the attribute weight table via the
    /// unit's disturbance type and subtype.
    DisturbanceWeight,
    /// The unit's mean Space Use Index. Applies only when the run's
    /// project type is within the configured applicability set and the
    /// unit actually carries a value; otherwise the term is excluded
    /// from the product entirely.
    SpaceUseIndex,
    /// A fixed signed weight, independent of the unit.
    Fixed { name: String, weight: f64 },
}

/// Computes the per-unit credit/debit modifier as the product of
/// `(1 + term)` over all applicable terms. Pure over its inputs; units
/// are read, never mutated here.
pub struct ModifierCalculator<'a> {
    weights: &'a AttributeWeightTable,
    project_type: ProjectType,
    sui_applies_to: SuiApplicability,
}

impl<'a> ModifierCalculator<'a> {
    pub fn new(
        weights: &'a AttributeWeightTable,
        project_type: ProjectType,
        sui_applies_to: SuiApplicability,
    ) -> Self {
        Self {
            weights,
            project_type,
            sui_applies_to,
        }
    }

    /// The term list used by production runs.
    pub fn standard_terms() -> Vec<ModifierTerm> {
        vec![ModifierTerm::DisturbanceWeight, ModifierTerm::SpaceUseIndex]
    }

    /// Resolves each term against the unit and multiplies the applicable
    /// factors. An unresolvable weight lookup is fatal and names the
    /// offending category and subtype.
    pub fn calculate(
        &self,
        unit: &MapUnit,
        terms: &[ModifierTerm],
    ) -> Result<f64, ValidationError> {
        let mut modifier = 1.0;
        for term in terms {
            let Some(value) = self.resolve(unit, term)? else {
                continue;
            };
            modifier *= 1.0 + value;
        }
        debug!(unit = unit.id, modifier, "calculated modifier");
        Ok(modifier)
    }

    fn resolve(
        &self,
        unit: &MapUnit,
        term: &ModifierTerm,
    ) -> Result<Option<f64>, ValidationError> {
        match term {
            ModifierTerm::DisturbanceWeight => {
                let category = unit
                    .attrs
                    .get(FieldKey::DisturbanceType)
                    .unwrap_or(DISTURBANCE_TYPE_DEFAULT);
                let subtype = unit
                    .attrs
                    .get(FieldKey::DisturbanceSubtype)
                    .unwrap_or(DISTURBANCE_SUBTYPE_DEFAULT);
                self.weights.weight(category, subtype).map(Some)
            }
            ModifierTerm::SpaceUseIndex => {
                if !self.sui_applies_to.applies_to(self.project_type) {
                    return Ok(None);
                }
                Ok(unit.space_use_index)
            }
            ModifierTerm::Fixed { weight, .. } => Ok(Some(*weight)),
        }
    }
}
