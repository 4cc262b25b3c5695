use std::collections::{HashMap, HashSet};

use crate::compiler::Compiler;

pub type CompileFn = fn(&mut Compiler);

/// A category of blocks (control, operators, ...) that registers its
/// compile functions with the registry.
pub trait BlockSection {
    fn name(&self) -> &str;
    fn register_blocks(&self, registry: &mut BlockRegistry);
}

/// Maps block opcodes to compile functions. Opcodes missing from the
/// registry compile to nothing and are reported as unsupported.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    sections: Vec<String>,
    compile_functions: HashMap<String, CompileFn>,
    hat_predicates: HashMap<String, CompileFn>,
    hats: HashSet<String>,
    booleans: HashSet<String>,
    field_values: HashMap<(String, String), i32>,
}

impl BlockRegistry {
    pub fn new() -> BlockRegistry {
        BlockRegistry::default()
    }

    /// A registry with every built-in section.
    pub fn with_default_sections() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        for section in crate::blocks::default_sections() {
            registry.register_section(section.as_ref());
        }
        registry
    }

    pub fn register_section(&mut self, section: &dyn BlockSection) {
        self.sections.push(section.name().to_string());
        section.register_blocks(self);
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn add_compile_function(&mut self, opcode: &str, compile: CompileFn) {
        self.compile_functions.insert(opcode.to_string(), compile);
    }

    /// Registers a reporter that always produces a boolean.
    pub fn add_boolean_block(&mut self, opcode: &str, compile: CompileFn) {
        self.booleans.insert(opcode.to_string());
        self.add_compile_function(opcode, compile);
    }

    pub fn add_hat_block(&mut self, opcode: &str) {
        self.hats.insert(opcode.to_string());
    }

    /// Registers the predicate of an edge-triggered hat.
    pub fn add_hat_predicate(&mut self, opcode: &str, compile: CompileFn) {
        self.hats.insert(opcode.to_string());
        self.hat_predicates.insert(opcode.to_string(), compile);
    }

    pub fn add_field_value(&mut self, field: &str, value: &str, id: i32) {
        self.field_values
            .insert((field.to_string(), value.to_string()), id);
    }

    pub fn compile_function(&self, opcode: &str) -> Option<CompileFn> {
        self.compile_functions.get(opcode).copied()
    }

    pub fn hat_predicate(&self, opcode: &str) -> Option<CompileFn> {
        self.hat_predicates.get(opcode).copied()
    }

    pub fn is_hat(&self, opcode: &str) -> bool {
        self.hats.contains(opcode)
    }

    pub fn is_boolean(&self, opcode: &str) -> bool {
        self.booleans.contains(opcode)
    }

    pub fn field_value_id(&self, field: &str, value: &str) -> Option<i32> {
        self.field_values
            .get(&(field.to_string(), value.to_string()))
            .copied()
    }
}
