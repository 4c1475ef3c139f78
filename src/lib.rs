//! Habitat quantification engine: derives scoring map units from
//! categorical polygon layers and prices them with multiplicative
//! credit/debit modifiers.
//!
//! The pipeline runs in strict dependency order: reference tables and
//! layers load first, the overlay derives the map units, the Space Use
//! Index surface (when supplied) is classified and aggregated per unit,
//! the modifier product is computed, and the simplifier projects the
//! result onto the published output schema.

pub mod config;
pub mod engine;
pub mod error;
pub mod layers;
pub mod tables;
pub mod telemetry;
