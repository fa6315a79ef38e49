//! Turning recognized row text into dimension tokens

pub mod aggregate;
pub mod normalize;
pub mod parse;

pub use aggregate::{aggregate, aggregate_rows, AggregatedResult, RowResult};
pub use normalize::SubstitutionTable;
pub use parse::{parse, parse_line, DimensionToken, ParsedLine};
