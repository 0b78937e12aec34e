//! Where candidate `(ip, domain)` pairs come from.
//!
//! - [`remote`]: curated hosts lists fetched over HTTP.
//! - [`resolve`]: the system resolver's current answers for a set of domains.

pub mod remote;
pub mod resolve;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("none of the {tried} remote hosts sources returned a usable list")]
    NoUsableSource { tried: usize },

    #[error("remote source index {index} out of range (1..={available})")]
    UnknownSource { index: usize, available: usize },
}
