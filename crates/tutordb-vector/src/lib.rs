//! Dense vector index over one corpus: exact inner-product search plus a
//! small binary file format.

pub mod flat;
pub mod store;

pub use flat::FlatIpIndex;
pub use store::{decode, load, persist};
