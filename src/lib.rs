//! Homestead - autonomous settlement simulation
//!
//! Settlements on a tile grid grow, plan their own construction and send
//! builders, workers and traders across terrain-aware paths.

pub mod agent;
pub mod city;
pub mod core;
pub mod simulation;
pub mod spatial;
