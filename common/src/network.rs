//! Candidate and measurement models.
//!
//! * [`target`]: `(ip, domain)` pairs and their grouping into per-IP probe targets.
//! * [`probe`]: latency values, probe statuses and outcomes.

pub mod probe;
pub mod target;
