use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use derivative::Derivative;
use log::warn;

use crate::block::{Block, BlockMap, Field, InputValue, Prototype, Reference};
use crate::bytecode::{Code, Opcode};
use crate::registry::BlockRegistry;
use crate::script::ScriptTables;
use crate::value::Value;
use crate::vm::NativeFn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeType {
    /// A command stack, starting at (and skipping) its hat.
    Script,
    /// A single value-producing block; leaves one value on the stack.
    Reporter,
    /// The predicate of an edge-triggered hat.
    HatPredicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstackType {
    Loop,
    IfStatement,
}

/// Turns block trees of one target into bytecode. Tables are shared by every
/// script compiled with the same compiler.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Compiler<'a> {
    #[derivative(Debug = "ignore")]
    registry: &'a BlockRegistry,
    blocks: Rc<BlockMap>,
    block: Option<String>,
    bytecode: Vec<u32>,
    code_type: CodeType,
    tables: ScriptTables,
    prototype: Option<Prototype>,
    definitions: HashMap<String, Prototype>,
    warp: bool,
    unsupported_blocks: BTreeSet<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a BlockRegistry, blocks: Rc<BlockMap>) -> Compiler<'a> {
        Compiler {
            registry,
            blocks,
            block: None,
            bytecode: Vec::new(),
            code_type: CodeType::Script,
            tables: ScriptTables::default(),
            prototype: None,
            definitions: HashMap::new(),
            warp: false,
            unsupported_blocks: BTreeSet::new(),
        }
    }

    /// Compiles the script rooted at `root`. Procedure definitions are also
    /// stored in the procedure table under their proc-code.
    pub fn compile(&mut self, root: &str, code_type: CodeType) -> Vec<u32> {
        self.bytecode.clear();
        self.code_type = code_type;
        self.prototype = None;
        self.warp = false;
        self.block = None;
        let unsupported = self.unsupported_blocks.len();

        self.add_instruction(Opcode::Start, &[]);
        match code_type {
            CodeType::Script => self.compile_stack(Some(root.to_string())),
            CodeType::Reporter => self.compile_reporter(root),
            CodeType::HatPredicate => self.compile_hat_predicate(root),
        }
        self.add_instruction(Opcode::Halt, &[]);

        if let Some(prototype) = self.prototype.take() {
            let index = self.procedure_index(&prototype.proc_code) as usize;
            if self.tables.procedures[index].is_none() {
                self.tables.procedures[index] = Some(Code::new(self.bytecode.clone()));
            }
        }
        if self.unsupported_blocks.len() > unsupported {
            warn!(
                "script {root:?} uses unsupported blocks: {:?}",
                self.unsupported_blocks
            );
        }
        self.block = None;
        std::mem::take(&mut self.bytecode)
    }

    pub fn finish(self) -> ScriptTables {
        self.tables
    }

    pub fn tables(&self) -> &ScriptTables {
        &self.tables
    }

    pub fn unsupported_blocks(&self) -> &BTreeSet<String> {
        &self.unsupported_blocks
    }

    pub fn code_type(&self) -> CodeType {
        self.code_type
    }

    /// The block being compiled.
    pub fn block(&self) -> Option<&Block> {
        self.blocks.get(self.block.as_ref()?)
    }

    pub fn add_instruction(&mut self, opcode: Opcode, operands: &[u32]) {
        self.bytecode.push(opcode.into());
        self.bytecode.extend_from_slice(operands);
    }

    /// Emits a call to a native function.
    pub fn add_function_call(&mut self, function: NativeFn) {
        let index = self.function_index(function);
        self.add_instruction(Opcode::Exec, &[index]);
    }

    pub fn add_const_value(&mut self, value: impl Into<Value>) {
        let index = self.const_index(value.into());
        self.add_instruction(Opcode::Const, &[index]);
    }

    /// Interns a constant. Values are matched by type and content, so `"10"`
    /// and `10` get separate slots.
    pub fn const_index(&mut self, value: Value) -> u32 {
        let constants = &mut self.tables.constants;
        match constants.iter().position(|c| c.is_identical(&value)) {
            Some(index) => index as u32,
            None => {
                constants.push(value);
                (constants.len() - 1) as u32
            }
        }
    }

    pub fn variable_index(&mut self, variable: &Reference) -> u32 {
        intern_reference(&mut self.tables.variables, variable)
    }

    pub fn list_index(&mut self, list: &Reference) -> u32 {
        intern_reference(&mut self.tables.lists, list)
    }

    pub fn procedure_index(&mut self, proc_code: &str) -> u32 {
        let codes = &mut self.tables.procedure_codes;
        match codes.iter().position(|c| c == proc_code) {
            Some(index) => index as u32,
            None => {
                codes.push(proc_code.to_string());
                self.tables.procedures.push(None);
                (codes.len() - 1) as u32
            }
        }
    }

    fn function_index(&mut self, function: NativeFn) -> u32 {
        let functions = &mut self.tables.functions;
        match functions.iter().position(|f| *f as usize == function as usize) {
            Some(index) => index as u32,
            None => {
                functions.push(function);
                (functions.len() - 1) as u32
            }
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.block()?.field(name)
    }

    pub fn field_value(&self, name: &str) -> Value {
        self.field(name).map(|f| f.value.clone()).unwrap_or_default()
    }

    /// Special-value id registered for the selected option of a field.
    pub fn field_id(&self, name: &str) -> Option<i32> {
        let value = self.field(name)?.value.to_string();
        self.registry.field_value_id(name, &value)
    }

    pub fn field_reference(&self, name: &str) -> Option<Reference> {
        self.field(name).map(Field::reference)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.block().is_some_and(|b| b.input(name).is_some())
    }

    /// The block plugged into an input, if it exists.
    pub fn input_block(&self, name: &str) -> Option<&Block> {
        match self.block()?.input(name)?.value.as_ref()? {
            InputValue::Block(id) => self.blocks.get(id),
            _ => None,
        }
    }

    /// Compiles an input so that it leaves exactly one value on the stack.
    pub fn add_input(&mut self, name: &str) {
        let Some(input) = self.block().and_then(|b| b.input(name)).cloned() else {
            self.add_instruction(Opcode::Null, &[]);
            return;
        };
        if !self.add_input_value(input.value.as_ref())
            && !self.add_input_value(input.shadow.as_ref())
        {
            self.add_instruction(Opcode::Null, &[]);
        }
    }

    /// Like [`Compiler::add_input`], but coerces non-boolean reporters with a
    /// double negation.
    pub fn add_condition_input(&mut self, name: &str) {
        let is_boolean = self
            .input_block(name)
            .is_some_and(|b| self.registry.is_boolean(&b.opcode));
        self.add_input(name);
        if !is_boolean {
            self.add_instruction(Opcode::Not, &[]);
            self.add_instruction(Opcode::Not, &[]);
        }
    }

    fn add_input_value(&mut self, value: Option<&InputValue>) -> bool {
        match value {
            None => false,
            Some(InputValue::Value(value)) => {
                self.add_const_value(value.clone());
                true
            }
            Some(InputValue::Broadcast(broadcast)) => {
                self.add_const_value(broadcast.name.as_str());
                true
            }
            Some(InputValue::Variable(variable)) => {
                let index = self.variable_index(variable);
                self.add_instruction(Opcode::ReadVar, &[index]);
                true
            }
            Some(InputValue::List(list)) => {
                let index = self.list_index(list);
                self.add_instruction(Opcode::ReadList, &[index]);
                true
            }
            Some(InputValue::Block(id)) => {
                let blocks = Rc::clone(&self.blocks);
                let Some(block) = blocks.get(id) else {
                    return false;
                };
                // Dropdown menus resolve to their selected option.
                if block.shadow && block.fields.len() == 1 {
                    if let Some(field) = block.fields.values().next() {
                        self.add_const_value(field.value.clone());
                        return true;
                    }
                }
                self.compile_reporter(id);
                true
            }
        }
    }

    /// Compiles the stack plugged into a C-block input. Loop bodies end with a
    /// frame break unless compiling in warp mode.
    pub fn compile_substack(&mut self, name: &str, substack_type: SubstackType) {
        let first = self.input_block(name).map(|b| b.id.clone());
        self.compile_stack(first);
        if substack_type == SubstackType::Loop && !self.warp {
            self.add_instruction(Opcode::BreakFrame, &[]);
        }
    }

    fn compile_stack(&mut self, first: Option<String>) {
        let blocks = Rc::clone(&self.blocks);
        let mut current = first;
        while let Some(id) = current {
            let Some(block) = blocks.get(&id) else {
                break;
            };
            let saved = self.block.replace(id.clone());
            if !self.registry.is_hat(&block.opcode) {
                match self.registry.compile_function(&block.opcode) {
                    Some(compile) => compile(self),
                    None => self.mark_unsupported(&id),
                }
            }
            self.block = saved;
            current = block.next.clone();
        }
    }

    fn compile_reporter(&mut self, id: &str) {
        let blocks = Rc::clone(&self.blocks);
        let Some(block) = blocks.get(id) else {
            self.add_instruction(Opcode::Null, &[]);
            return;
        };
        let saved = self.block.replace(id.to_string());
        match self.registry.compile_function(&block.opcode) {
            Some(compile) => compile(self),
            None => {
                self.mark_unsupported(id);
                self.add_instruction(Opcode::Null, &[]);
            }
        }
        self.block = saved;
    }

    fn compile_hat_predicate(&mut self, root: &str) {
        let blocks = Rc::clone(&self.blocks);
        let compile = blocks
            .get(root)
            .and_then(|b| self.registry.hat_predicate(&b.opcode));
        match compile {
            Some(compile) => {
                self.block = Some(root.to_string());
                compile(self);
            }
            None => self.add_instruction(Opcode::Null, &[]),
        }
    }

    // Records an unsupported block along with everything nested under it.
    fn mark_unsupported(&mut self, id: &str) {
        let blocks = Rc::clone(&self.blocks);
        let mut pending = vec![id.to_string()];
        while let Some(id) = pending.pop() {
            let Some(block) = blocks.get(&id) else {
                continue;
            };
            if block.shadow {
                continue;
            }
            if !self.registry.is_hat(&block.opcode)
                && self.registry.compile_function(&block.opcode).is_none()
            {
                self.unsupported_blocks.insert(block.opcode.clone());
            }
            for input in block.inputs.values() {
                if let Some(InputValue::Block(child)) = &input.value {
                    pending.push(child.clone());
                    let mut next = blocks.get(child).and_then(|b| b.next.clone());
                    while let Some(id) = next {
                        next = blocks.get(&id).and_then(|b| b.next.clone());
                        pending.push(id);
                    }
                }
            }
        }
    }

    pub fn prototype(&self) -> Option<&Prototype> {
        self.prototype.as_ref()
    }

    /// Marks the script being compiled as the body of a procedure.
    pub fn set_prototype(&mut self, prototype: Prototype) {
        self.procedure_index(&prototype.proc_code);
        self.warp = prototype.warp;
        self.definitions
            .insert(prototype.proc_code.clone(), prototype.clone());
        self.prototype = Some(prototype);
    }

    /// Signature of the procedure this target defines as `proc_code`.
    pub fn definition(&mut self, proc_code: &str) -> Option<Prototype> {
        if let Some(prototype) = self.definitions.get(proc_code) {
            return Some(prototype.clone());
        }
        let prototype = self
            .blocks
            .values()
            .filter(|b| b.opcode == "procedures_prototype")
            .filter_map(|b| b.mutation.as_ref())
            .map(Prototype::from_mutation)
            .find(|p| p.proc_code == proc_code)?;
        self.definitions
            .insert(proc_code.to_string(), prototype.clone());
        Some(prototype)
    }

    pub fn warp(&self) -> bool {
        self.warp
    }
}

fn intern_reference(table: &mut Vec<Reference>, reference: &Reference) -> u32 {
    match table.iter().position(|r| r.id == reference.id) {
        Some(index) => index as u32,
        None => {
            table.push(reference.clone());
            (table.len() - 1) as u32
        }
    }
}
