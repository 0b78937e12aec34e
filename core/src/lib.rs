//! # HostPin Core
//!
//! The two engines behind `hostpin`:
//!
//! - **Probing**: [`probe`] measures one IP, [`scheduler`] runs it over
//!   every unique IP with bounded concurrency and cooperative cancellation,
//!   and [`aggregate`] turns the outcome stream into ranked rows.
//! - **Hosts editing**: [`hosts`] rewrites the managed block transactionally,
//!   [`backup`] snapshots and restores the file.
//!
//! [`sources`] supplies the candidate pairs and [`system`] wraps the host
//! side effects (DNS flush, privilege checks).

pub mod aggregate;
pub mod backup;
pub mod hosts;
pub mod probe;
pub mod scheduler;
pub mod sources;
pub mod system;
