#![doc = include_str!("../readme.md")]

pub mod bound;
pub mod config;
pub mod continuous;
pub mod discrete;
pub mod error;
pub mod frechet;
pub mod graph;
pub mod index;
pub mod io;
pub mod path;
pub mod query;
pub mod search;
pub mod spatial;
pub mod util;

#[doc(hidden)]
#[cfg(test)]
mod test_utils;

#[doc(inline)]
pub use config::{QueryConfig, QueryMode};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use graph::Graph;
#[doc(inline)]
pub use path::{CompletePath, ReferencePath, RoadPath};
#[doc(inline)]
pub use query::{Record, RoundReport, Session, Verdict};
