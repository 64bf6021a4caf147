//! eta-export - invoice acquisition from the ETA e-invoicing portal.
//!
//! Core library: record normalization, pagination, endpoint discovery and
//! the multi-page acquisition pipeline, plus the browser and HTTP transports.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod portal;
pub mod scrapers;
