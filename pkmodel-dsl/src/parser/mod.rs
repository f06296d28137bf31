//! Parser module for model files

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
