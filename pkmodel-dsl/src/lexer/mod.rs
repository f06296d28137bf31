//! Lexer for `$NMXML` values and `$MAIN`/`$TABLE` expressions

pub mod scanner;
pub mod token;

pub use scanner::*;
pub use token::*;
