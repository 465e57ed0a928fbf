pub mod ast;
pub mod control;
pub mod filter;
pub mod parser;

pub use ast::{Operator, Value};
pub use control::Paging;
pub use filter::{Clause, DateRange, Filter};
pub use parser::{parse, ParseError};
