use crate::error::ValidationError;
use crate::layers::vector::{CategoricalLayer, FieldKey};
use geo::{Area, BooleanOps, Intersects, MultiPolygon};
use tracing::{debug, info};

pub const SQUARE_METERS_PER_ACRE: f64 = 4046.8564224;

/// Fragments below this area (square meters) are treated as artifacts of
/// the boolean ops and discarded.
const AREA_EPSILON: f64 = 1e-6;

/// Attributes resolved onto a map unit by the overlay. Only fields a
/// supplied layer declares are populated; the rest stay `None` and pick
/// up the published column default in the simplifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttributeSet {
    pub meadow: Option<String>,
    pub disturbance_type: Option<String>,
    pub disturbance_subtype: Option<String>,
    pub land_cover: Option<String>,
}

impl AttributeSet {
    pub fn set(&mut self, key: FieldKey, value: String) {
        match key {
            FieldKey::Meadow => self.meadow = Some(value),
            FieldKey::DisturbanceType => self.disturbance_type = Some(value),
            FieldKey::DisturbanceSubtype => self.disturbance_subtype = Some(value),
            FieldKey::LandCover => self.land_cover = Some(value),
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<&str> {
        match key {
            FieldKey::Meadow => self.meadow.as_deref(),
            FieldKey::DisturbanceType => self.disturbance_type.as_deref(),
            FieldKey::DisturbanceSubtype => self.disturbance_subtype.as_deref(),
            FieldKey::LandCover => self.land_cover.as_deref(),
        }
    }
}

/// The atomic unit of scoring: one polygon of the planar subdivision with
/// its merged attributes. Enriched in place by the zonal and modifier
/// stages, then projected into the output table.
#[derive(Debug, Clone)]
pub struct MapUnit {
    pub id: u32,
    pub geometry: MultiPolygon<f64>,
    pub attrs: AttributeSet,
    pub dist_lek_class: Option<i32>,
    pub space_use_index: Option<f64>,
    pub modifier: Option<f64>,
}

impl MapUnit {
    pub fn acres(&self) -> f64 {
        self.geometry.unsigned_area() / SQUARE_METERS_PER_ACRE
    }
}

struct ProtoUnit {
    geometry: MultiPolygon<f64>,
    attrs: AttributeSet,
}

/// Overlays the ordered categorical layers into a set of pairwise
/// non-overlapping map units jointly covering the input extent.
pub struct MapUnitGenerator {
    minimum_unit_acres: f64,
}

impl MapUnitGenerator {
    pub fn new(minimum_unit_acres: f64) -> Self {
        Self { minimum_unit_acres }
    }

    /// Produces the full planar subdivision induced by the layers, in
    /// declared order. Where layers disagree on a field the later layer
    /// wins; within a layer the later feature wins. Uncovered area
    /// receives each declared field's default.
    pub fn generate(&self, layers: &[CategoricalLayer]) -> Result<Vec<MapUnit>, ValidationError> {
        let extent = combined_extent(layers);
        if extent.unsigned_area() <= AREA_EPSILON {
            return Err(ValidationError::EmptyExtent);
        }

        let mut defaults = AttributeSet::default();
        for layer in layers {
            for field in &layer.fields {
                defaults.set(field.key, field.default.clone());
            }
        }

        let mut units = vec![ProtoUnit {
            geometry: extent,
            attrs: defaults,
        }];

        for layer in layers {
            for feature in &layer.features {
                units = split_by_feature(units, layer, &feature.geometry, &feature.values);
            }
            debug!(layer = %layer.name, units = units.len(), "overlaid layer");
        }

        let units = self.absorb_slivers(units);
        let units = dissolve(units);

        let units: Vec<MapUnit> = units
            .into_iter()
            .enumerate()
            .map(|(index, proto)| MapUnit {
                id: index as u32 + 1,
                geometry: proto.geometry,
                attrs: proto.attrs,
                dist_lek_class: None,
                space_use_index: None,
                modifier: None,
            })
            .collect();

        info!(units = units.len(), "generated map units");
        Ok(units)
    }

    /// Merges sub-minimum-area polygons into an adjacent unit carrying an
    /// identical attribute tuple. Units differing in any attribute are
    /// never merged; a sliver without a matching neighbor is retained.
    fn absorb_slivers(&self, units: Vec<ProtoUnit>) -> Vec<ProtoUnit> {
        let min_area = self.minimum_unit_acres * SQUARE_METERS_PER_ACRE;
        if min_area <= 0.0 {
            return units;
        }

        let mut kept: Vec<ProtoUnit> = Vec::with_capacity(units.len());
        let mut slivers: Vec<ProtoUnit> = Vec::new();
        for unit in units {
            if unit.geometry.unsigned_area() < min_area {
                slivers.push(unit);
            } else {
                kept.push(unit);
            }
        }

        for sliver in slivers {
            let target = kept.iter_mut().find(|unit| {
                unit.attrs == sliver.attrs && unit.geometry.intersects(&sliver.geometry)
            });
            match target {
                Some(unit) => unit.geometry = unit.geometry.union(&sliver.geometry),
                None => kept.push(sliver),
            }
        }

        kept
    }
}

fn combined_extent(layers: &[CategoricalLayer]) -> MultiPolygon<f64> {
    let mut extent = MultiPolygon::<f64>::new(vec![]);
    for layer in layers {
        for feature in &layer.features {
            extent = extent.union(&feature.geometry);
        }
    }
    extent
}

fn split_by_feature(
    units: Vec<ProtoUnit>,
    layer: &CategoricalLayer,
    geometry: &MultiPolygon<f64>,
    values: &[String],
) -> Vec<ProtoUnit> {
    let mut next = Vec::with_capacity(units.len() + 1);
    for unit in units {
        if !unit.geometry.intersects(geometry) {
            next.push(unit);
            continue;
        }

        let inside = unit.geometry.intersection(geometry);
        let outside = unit.geometry.difference(geometry);

        if inside.unsigned_area() > AREA_EPSILON {
            let mut attrs = unit.attrs.clone();
            for (field, value) in layer.fields.iter().zip(values) {
                attrs.set(field.key, value.clone());
            }
            next.push(ProtoUnit {
                geometry: inside,
                attrs,
            });
        }
        if outside.unsigned_area() > AREA_EPSILON {
            next.push(ProtoUnit {
                geometry: outside,
                attrs: unit.attrs,
            });
        }
    }
    next
}

/// Unions units sharing the full attribute tuple into one (possibly
/// multi-part) unit, preserving first-seen order.
fn dissolve(units: Vec<ProtoUnit>) -> Vec<ProtoUnit> {
    let mut dissolved: Vec<ProtoUnit> = Vec::new();
    for unit in units {
        match dissolved
            .iter_mut()
            .find(|existing| existing.attrs == unit.attrs)
        {
            Some(existing) => existing.geometry = existing.geometry.union(&unit.geometry),
            None => dissolved.push(unit),
        }
    }
    dissolved
}
