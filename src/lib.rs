pub mod ast;
pub mod check;
pub mod driver;
pub mod ir;
pub mod lowering;
pub mod parser;
pub mod rewrite;
pub mod runtime;
