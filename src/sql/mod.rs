//! SQL building and parameter binding: identifiers from declarations only, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
