pub mod cmdline;
pub mod core;
pub mod environment;
pub mod evaluator;
pub mod expander;
pub mod interpreter;
pub mod printer;
pub mod reader;
pub mod special_forms;

#[macro_use]
extern crate lazy_static;

mod strings;
pub mod types;

pub use types::Value;
