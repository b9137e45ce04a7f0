//! Application Layer
//!
//! Use cases that wire domain logic to the ports.

mod geoblock_service;

pub use geoblock_service::GeoBlockService;
