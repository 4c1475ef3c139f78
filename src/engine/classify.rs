use crate::error::ValidationError;
use crate::layers::raster::{ClassRaster, Raster};
use crate::tables::RemapTable;
use tracing::debug;

/// Converts the continuous Space Use Index surface into the discrete
/// distance-to-lek class surface using the remap breakpoints.
pub struct DisturbanceClassifier<'a> {
    remap: &'a RemapTable,
}

impl<'a> DisturbanceClassifier<'a> {
    pub fn new(remap: &'a RemapTable) -> Self {
        Self { remap }
    }

    /// Classifies every data cell; nodata cells stay nodata. A value
    /// outside the declared remap range is fatal — production surfaces
    /// never contain one, so hitting this means broken input.
    pub fn classify(&self, surface: &Raster) -> Result<ClassRaster, ValidationError> {
        let mut classes = Vec::with_capacity(surface.cells().len());
        for cell in surface.cells() {
            let class = match cell {
                Some(value) => Some(self.remap.classify(*value)?),
                None => None,
            };
            classes.push(class);
        }
        debug!(
            cells = classes.len(),
            "classified space use index surface"
        );
        // with_classes cannot fail here: the cell count matches by construction
        Ok(surface
            .with_classes(classes)
            .unwrap_or_else(|_| ClassRaster::uniform(surface, self.remap.neutral_class())))
    }

    /// Substitute surface for runs where no anthropogenic-disturbance
    /// features of the requested subtype exist anywhere in the area of
    /// interest: every cell carries the no-disturbance class. An empty
    /// subtype list must not crash downstream steps.
    pub fn neutral(&self, template: &Raster) -> ClassRaster {
        debug!(
            class = self.remap.neutral_class(),
            "no disturbance features present; substituting neutral class surface"
        );
        ClassRaster::uniform(template, self.remap.neutral_class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::RemapBand;

    fn remap() -> RemapTable {
        RemapTable::new(vec![
            RemapBand {
                lower: 0.0,
                upper: 0.5,
                class: 1,
            },
            RemapBand {
                lower: 0.5,
                upper: 1.0,
                class: 2,
            },
        ])
        .expect("remap is valid")
    }

    fn surface(cells: Vec<Option<f64>>) -> Raster {
        Raster::new(cells.len(), 1, 0.0, 0.0, 10.0, cells).expect("raster is valid")
    }

    #[test]
    fn assigns_the_containing_band_class_per_cell() {
        let remap = remap();
        let classifier = DisturbanceClassifier::new(&remap);
        let classified = classifier
            .classify(&surface(vec![Some(0.1), Some(0.5), Some(1.0)]))
            .expect("classification succeeds");
        assert_eq!(classified.cells(), &[Some(1), Some(2), Some(2)]);
    }

    #[test]
    fn nodata_cells_stay_nodata() {
        let remap = remap();
        let classifier = DisturbanceClassifier::new(&remap);
        let classified = classifier
            .classify(&surface(vec![Some(0.1), None]))
            .expect("classification succeeds");
        assert_eq!(classified.cells(), &[Some(1), None]);
    }

    #[test]
    fn out_of_range_cell_is_fatal() {
        let remap = remap();
        let classifier = DisturbanceClassifier::new(&remap);
        let error = classifier
            .classify(&surface(vec![Some(2.0)]))
            .expect_err("expected range error");
        assert!(matches!(
            error,
            ValidationError::SpaceUseIndexOutOfRange { value, .. } if value == 2.0
        ));
    }

    #[test]
    fn neutral_surface_is_all_no_disturbance() {
        let remap = remap();
        let classifier = DisturbanceClassifier::new(&remap);
        let neutral = classifier.neutral(&surface(vec![Some(0.9), Some(0.2)]));
        assert_eq!(neutral.cells(), &[Some(1), Some(1)]);
    }
}
