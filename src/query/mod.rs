pub mod executor;
pub mod parser;

pub use executor::QueryExecutor;
pub use parser::{Query, QueryNode, parse_query};
