//! Bytecode compiler and cooperative virtual machine for Scratch 3 projects.

pub mod block;
pub mod blocks;
pub mod bytecode;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod host;
pub mod list;
pub mod project;
pub mod promise;
pub mod registry;
pub mod runtime;
pub mod script;
pub mod target;
pub mod thread;
pub mod value;
pub mod vm;

pub use compiler::{CodeType, Compiler};
pub use engine::Engine;
pub use error::LoadError;
pub use host::{Host, StdHost};
pub use project::Config;
pub use value::Value;
