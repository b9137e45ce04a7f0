//! Domain Layer
//!
//! Pure types and decision logic. Nothing here performs I/O.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
