use crate::error::{EngineError, ValidationError};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One breakpoint interval of the Space-Use-Index remap. Bands are
/// half-open `[lower, upper)`; the final band is closed at its upper bound
/// so the declared domain is total and exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemapBand {
    pub lower: f64,
    pub upper: f64,
    pub class: i32,
}

/// Ordered breakpoints partitioning the continuous Space Use Index domain
/// into integer distance-to-lek classes. Contiguity and coverage are
/// validated at load; a value outside the declared range is an error, not
/// silently clamped.
#[derive(Debug, Clone)]
pub struct RemapTable {
    bands: Vec<RemapBand>,
}

#[derive(Debug, Deserialize)]
struct RemapRow {
    #[serde(rename = "LowerBound")]
    lower: f64,
    #[serde(rename = "UpperBound")]
    upper: f64,
    #[serde(rename = "Class")]
    class: i32,
}

impl RemapTable {
    pub fn new(mut bands: Vec<RemapBand>) -> Result<Self, ValidationError> {
        if bands.is_empty() {
            return Err(ValidationError::EmptyRemapTable);
        }

        bands.sort_by(|a, b| a.lower.total_cmp(&b.lower));

        for (index, band) in bands.iter().enumerate() {
            if band.lower >= band.upper {
                return Err(ValidationError::InvertedRemapBand {
                    index,
                    lower: band.lower,
                    upper: band.upper,
                });
            }
            if index > 0 {
                let expected = bands[index - 1].upper;
                if band.lower != expected {
                    return Err(ValidationError::NonContiguousRemap {
                        index,
                        lower: band.lower,
                        expected,
                    });
                }
            }
        }

        Ok(Self { bands })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EngineError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut bands = Vec::new();
        for record in csv_reader.deserialize::<RemapRow>() {
            let row = record?;
            bands.push(RemapBand {
                lower: row.lower,
                upper: row.upper,
                class: row.class,
            });
        }

        Ok(Self::new(bands)?)
    }

    /// Declared (inclusive) domain covered by the breakpoints.
    pub fn domain(&self) -> (f64, f64) {
        // new() guarantees at least one band
        (self.bands[0].lower, self.bands[self.bands.len() - 1].upper)
    }

    /// Class assigned where no anthropogenic disturbance is present: the
    /// band at the bottom of the declared domain.
    pub fn neutral_class(&self) -> i32 {
        self.bands[0].class
    }

    /// Finds the unique band containing `value` and returns its class.
    pub fn classify(&self, value: f64) -> Result<i32, ValidationError> {
        let (lower, upper) = self.domain();
        let last = self.bands.len() - 1;
        for (index, band) in self.bands.iter().enumerate() {
            let closed_upper = index == last && value == band.upper;
            if (value >= band.lower && value < band.upper) || closed_upper {
                return Ok(band.class);
            }
        }
        Err(ValidationError::SpaceUseIndexOutOfRange { value, lower, upper })
    }

    pub fn bands(&self) -> &[RemapBand] {
        &self.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sui_remap() -> RemapTable {
        let csv = "LowerBound,UpperBound,Class\n\
                   0.0,0.25,1\n\
                   0.25,0.5,2\n\
                   0.5,0.75,3\n\
                   0.75,1.0,4\n";
        RemapTable::from_reader(Cursor::new(csv)).expect("remap loads")
    }

    #[test]
    fn classification_is_total_and_exclusive_over_the_domain() {
        let table = sui_remap();
        assert_eq!(table.classify(0.0).expect("lower edge"), 1);
        assert_eq!(table.classify(0.24).expect("inside first band"), 1);
        assert_eq!(table.classify(0.25).expect("breakpoint goes up"), 2);
        assert_eq!(table.classify(0.6).expect("third band"), 3);
        assert_eq!(table.classify(1.0).expect("closed upper edge"), 4);
    }

    #[test]
    fn out_of_range_value_is_fatal() {
        let table = sui_remap();
        let error = table.classify(1.2).expect_err("expected range error");
        assert!(matches!(
            error,
            ValidationError::SpaceUseIndexOutOfRange { value, .. } if value == 1.2
        ));
        assert!(table.classify(-0.01).is_err());
    }

    #[test]
    fn gaps_between_bands_are_rejected() {
        let csv = "LowerBound,UpperBound,Class\n0.0,0.25,1\n0.3,1.0,2\n";
        let error = RemapTable::from_reader(Cursor::new(csv)).expect_err("expected gap error");
        assert!(matches!(
            error,
            EngineError::Validation(ValidationError::NonContiguousRemap { index: 1, .. })
        ));
    }

    #[test]
    fn inverted_band_is_rejected() {
        let error = RemapTable::new(vec![RemapBand {
            lower: 0.5,
            upper: 0.5,
            class: 1,
        }])
        .expect_err("expected inverted band error");
        assert!(matches!(
            error,
            ValidationError::InvertedRemapBand { index: 0, .. }
        ));
    }

    #[test]
    fn bands_are_sorted_on_load() {
        let table = RemapTable::new(vec![
            RemapBand {
                lower: 0.5,
                upper: 1.0,
                class: 2,
            },
            RemapBand {
                lower: 0.0,
                upper: 0.5,
                class: 1,
            },
        ])
        .expect("unordered rows load");
        assert_eq!(table.domain(), (0.0, 1.0));
        assert_eq!(table.neutral_class(), 1);
    }
}
