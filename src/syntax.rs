//! Front end for the supported Go subset: terminator insertion, parsing and
//! printing.

use crate::ast::SourceFile;
use crate::errors::{GuardError, SourceContext};

pub mod lexer;
pub mod parser;
pub mod printer;

pub use parser::parse;
pub use printer::print_file;

/// Parses `text` under a placeholder file name. Convenient for tests and tools.
pub fn parse_str(text: &str) -> Result<SourceFile, GuardError> {
    parse(&SourceContext::from_file("<input>", text))
}
