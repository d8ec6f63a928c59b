//! # geocoder-pl
//!
//! Import des bâtiments BDOT10K et des points adresse PRG vers PostGIS,
//! avec rattachement de chaque adresse au bâtiment le plus proche.
//!
//! ## Features
//!
//! - Import dans PostgreSQL/PostGIS par `COPY`, pool de connexions
//! - Une transaction par voïvodie, reprise incrémentale par checksum
//! - Vérification d'appartenance à la gmina, relocalisation via Nominatim
//! - Reprojection PUWG 1992 en Rust pur (PROJ en option)
//! - Recherche textuelle dans l'index d'adresses par secteur
//!
//! ## Usage CLI
//!
//! ```bash
//! geocoder-pl import-buildings --path ./bdot10k/ --dictionaries ./dicts/
//! geocoder-pl import-points --path ./prg/ --regions ./jednostki.geojson
//! geocoder-pl search "Kraków, Floriańska 1"
//! ```

pub mod cli;
pub mod config;
pub mod export;
pub mod geocoder;
pub mod input;
pub mod report;
pub mod reproject_lite;

pub use config::Settings;
pub use export::pool::{create_pool, DatabaseConfig};
pub use geocoder::NominatimGeocoder;
pub use report::{ImportReport, ImportStatus};
pub use reproject_lite::SmartReprojector;
