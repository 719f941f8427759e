//! Property Management Back Office Library
//!
//! This library provides the reconciliation core for a property-management
//! back office, including:
//! - Pavilion name normalization and location-string expansion
//! - Meter/reading import from Excel uploads
//! - Tenant/contract roster import with building inference
//! - Electric-shield assignment and pavilion bulk loads
//!
//! Imports run single-threaded and request-scoped; concurrent imports are
//! not defended against and must be serialized by the caller.

pub mod api;
pub mod db;
pub mod models;
pub mod schema;
pub mod services;
pub mod store;
