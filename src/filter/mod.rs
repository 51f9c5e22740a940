pub mod parser;
pub mod types;

pub use parser::parse_filters;
pub use types::FilterMap;
