pub mod definitions;
pub mod encoding;
mod error;
pub mod generator;
pub mod input;
pub mod interpreter;
pub mod ternary;

// reexporting for convenience
pub use error::*;
pub use generator::{GenerationConfig, GenerationResult, ProgramGenerator};
pub use interpreter::{ExecutionResult, Interpreter, InterpreterOptions, Machine, RunOptions};
