//! Billsheet API Library
//!
//! Turns a photographed or described bill into a reconciled xlsx report:
//! vision-model extraction, deterministic invoice reconciliation, and
//! spreadsheet rendering, served over HTTP.
//!
//! # Modules
//!
//! - `cache`: Extraction cache entries and request digests.
//! - `circuit_breaker`: Circuit breaker for the vision upstream.
//! - `coerce`: Loose field to number coercion.
//! - `config`: Configuration management.
//! - `engine`: The invoice reconciliation engine.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `invoice`: Invoice record types.
//! - `report`: xlsx report rendering.
//! - `tax`: Tax-rate inference from free text.
//! - `vision`: Vision-model extraction client.

pub mod cache;
pub mod circuit_breaker;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod invoice;
pub mod report;
pub mod tax;
pub mod vision;
