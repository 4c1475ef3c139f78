use crate::error::{EngineError, ValidationError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Static reference data mapping each anthropogenic feature subtype to its
/// signed scoring weight. Loaded once per run and read-only afterwards.
///
/// Lookups are strict: a (category, subtype) pair that is not present in
/// the table is a fatal validation error, never a silent default. A
/// spelling mismatch between an input layer and this table must stop the
/// run before any output is written.
#[derive(Debug, Clone)]
pub struct AttributeWeightTable {
    weights: HashMap<(String, String), f64>,
}

#[derive(Debug, Deserialize)]
struct WeightRow {
    #[serde(rename = "Category")]
    category: String,
    #[serde(rename = "Subtype")]
    subtype: String,
    #[serde(rename = "Weight")]
    weight: f64,
}

impl AttributeWeightTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, EngineError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut weights = HashMap::new();
        for record in csv_reader.deserialize::<WeightRow>() {
            let row = record?;
            let key = (row.category.clone(), row.subtype.clone());
            if weights.insert(key, row.weight).is_some() {
                return Err(ValidationError::DuplicateWeightRow {
                    category: row.category,
                    subtype: row.subtype,
                }
                .into());
            }
        }

        if weights.is_empty() {
            return Err(ValidationError::EmptyWeightTable.into());
        }

        Ok(Self { weights })
    }

    pub fn from_rows<I, S>(rows: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (S, S, f64)>,
        S: Into<String>,
    {
        let mut weights = HashMap::new();
        for (category, subtype, weight) in rows {
            let category = category.into();
            let subtype = subtype.into();
            if weights
                .insert((category.clone(), subtype.clone()), weight)
                .is_some()
            {
                return Err(ValidationError::DuplicateWeightRow { category, subtype });
            }
        }
        if weights.is_empty() {
            return Err(ValidationError::EmptyWeightTable);
        }
        Ok(Self { weights })
    }

    /// Resolves the weight for a (category, subtype) pair, failing with the
    /// offending identifiers when the pair has no row.
    pub fn weight(&self, category: &str, subtype: &str) -> Result<f64, ValidationError> {
        self.weights
            .get(&(category.to_string(), subtype.to_string()))
            .copied()
            .ok_or_else(|| ValidationError::UnresolvedSubtype {
                category: category.to_string(),
                subtype: subtype.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
