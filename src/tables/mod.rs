mod remap;
mod weights;

pub use remap::{RemapBand, RemapTable};
pub use weights::AttributeWeightTable;
