use std::rc::Rc;

use derivative::Derivative;

use crate::block::Reference;
use crate::bytecode::Code;
use crate::value::Value;
use crate::vm::NativeFn;

/// Tables filled in by one compiler and shared by every script it compiled.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct ScriptTables {
    pub constants: Vec<Value>,
    pub variables: Vec<Reference>,
    pub lists: Vec<Reference>,
    /// Proc-codes in the order procedures were first referenced.
    pub procedure_codes: Vec<String>,
    /// Procedure bodies, by procedure index. `None` when called but never defined.
    pub procedures: Vec<Option<Code>>,
    #[derivative(Debug = "ignore")]
    pub functions: Vec<NativeFn>,
}

/// Where the VM is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blob {
    Main,
    HatPredicate,
    Procedure(usize),
}

/// A compiled hat script: its body, an optional edge-hat predicate and the
/// tables both refer to.
#[derive(Debug)]
pub struct Script {
    code: Code,
    hat_predicate: Option<Code>,
    tables: Rc<ScriptTables>,
}

impl Script {
    pub fn new(bytecode: Vec<u32>, tables: Rc<ScriptTables>) -> Script {
        Script {
            code: Code::new(bytecode),
            hat_predicate: None,
            tables,
        }
    }

    pub fn with_hat_predicate(mut self, bytecode: Vec<u32>) -> Script {
        self.hat_predicate = Some(Code::new(bytecode));
        self
    }

    pub fn bytecode(&self) -> &[u32] {
        &self.code.words
    }

    pub fn hat_predicate(&self) -> Option<&Code> {
        self.hat_predicate.as_ref()
    }

    pub fn tables(&self) -> &ScriptTables {
        &self.tables
    }

    pub fn code(&self, blob: Blob) -> Option<&Code> {
        match blob {
            Blob::Main => Some(&self.code),
            Blob::HatPredicate => self.hat_predicate.as_ref(),
            Blob::Procedure(index) => self.tables.procedures.get(index)?.as_ref(),
        }
    }

    pub fn constants(&self) -> &[Value] {
        &self.tables.constants
    }

    pub fn variables(&self) -> &[Reference] {
        &self.tables.variables
    }

    pub fn lists(&self) -> &[Reference] {
        &self.tables.lists
    }

    pub fn procedure_index(&self, proc_code: &str) -> Option<usize> {
        self.tables
            .procedure_codes
            .iter()
            .position(|code| code == proc_code)
    }
}
