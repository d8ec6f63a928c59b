//! Export PostgreSQL/PostGIS et reprojection PROJ

pub mod pool;
pub mod postgres;
pub mod reproject;
pub mod transaction;

#[cfg(feature = "reproject")]
pub use reproject::Reprojector;
