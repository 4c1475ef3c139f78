pub mod raster;
pub mod vector;

pub use raster::{ClassRaster, Raster};
pub use vector::{CategoricalLayer, FieldKey, FieldSpec, PolygonFeature};
