//! A small Rust client for the USGS earthquake catalog (FDSN Event web
//! service).
//!
//! The crate is mostly a data model: it parses the service's GeoJSON
//! responses into typed, immutable records, normalizing the feed's loose
//! encodings on the way in — millisecond epoch timestamps become UTC
//! instants, comma-delimited strings become sets, and product content
//! entries are resolved to exactly one of their inline/remote variants.
//! Validation happens once, at construction: a document either yields a
//! complete record or a [`ValidationError`] naming the offending field.
//!
//! ## Quick start
//! - Optionally configure a mirror URL or a contact address via environment
//!   variables (`QUAKEFEED_URL`, `QUAKEFEED_CONTACT`) or a `.quakefeedrc`
//!   file (supported in the current directory and in your home directory).
//!   With no configuration at all, the public USGS endpoint is used.
//! - Call [`Client::query`] with the service's query parameters.
//!
//! ```no_run
//! use anyhow::Result;
//! use quakefeed::Client;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let catalog = client.query(&json!({
//!         "starttime": "2024-03-01",
//!         "endtime": "2024-03-08",
//!         "minmagnitude": 5,
//!     }))?;
//!     for quake in &catalog.features {
//!         println!("{}", quake.properties.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Summary features link to a per-event detail record
//! ([`Client::detail`]) carrying the event's products; remote product
//! artifacts can be saved with [`Client::download`].

#![forbid(unsafe_code)]

mod client;
mod config;
mod decode;
mod error;
mod geojson;
mod product;
mod quake;
pub mod time;
mod util;

pub use client::{Client, ClientConfig};
pub use error::ValidationError;
pub use geojson::{Feature, FeatureCollection, Geometry, PointGeometry};
pub use product::{ByteContent, Content, Product, UrlContent};
pub use quake::{
    AlertLevel, EarthquakeCatalog, EarthquakeDetailFeature, EarthquakeFeature,
    EarthquakeProperties, EarthquakeSummaryFeature, ReviewStatus,
};
