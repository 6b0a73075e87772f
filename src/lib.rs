//! Multi-period production, transport and inventory planning for clinker
//! networks.
//!
//! The crate assembles a validated planning dataset from master data,
//! formulates deterministic or uncertainty-aware (two-stage stochastic /
//! worst-case robust) mixed-integer programs, orchestrates solver execution
//! with backend fallback and feasibility repair, parses solved variable
//! assignments into canonical result tables, and computes post-hoc analytics
//! (utilisation, bottlenecks, cost drivers, resilience) over a solved plan.
pub mod analytics;
pub mod cli;
pub mod dataset;
pub mod demand;
#[cfg(test)]
pub(crate) mod fixture;
pub mod id;
pub mod input;
pub mod inventory;
pub mod log;
pub mod optimisation;
pub mod output;
pub mod planning;
pub mod plant;
pub mod results;
pub mod route;
pub mod scenario;
pub mod settings;
pub mod solver;

/// The URL for filing bug reports
pub const ISSUES_URL: &str = "https://github.com/clinkplan/clinkplan/issues";
