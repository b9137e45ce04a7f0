mod geoblock_layer;

pub use geoblock_layer::{request_meta, GeoBlockLayer, GeoBlockMiddleware};
