//! Crafting profit calculator for Albion Online.
//!
//! `domain` holds the pure arithmetic (price resolution, profit breakdown,
//! item catalog). `infra` talks to the Albion Online Data API. `app` ties a
//! recipe to fetched prices.

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod report;
