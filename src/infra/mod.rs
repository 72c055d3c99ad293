//! Remote market data and the caches in front of it.

pub mod albion;
pub mod cache;
