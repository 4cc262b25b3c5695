use crate::block::Prototype;
use crate::bytecode::Opcode;
use crate::compiler::Compiler;
use crate::registry::{BlockRegistry, BlockSection};

pub struct ProcedureBlocks;

impl BlockSection for ProcedureBlocks {
    fn name(&self) -> &str {
        "My Blocks"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("procedures_definition", compile_definition);
        registry.add_compile_function("procedures_call", compile_call);
        registry.add_compile_function(
            "argument_reporter_string_number",
            compile_argument_reporter,
        );
        registry.add_boolean_block("argument_reporter_boolean", compile_argument_reporter);
    }
}

fn compile_definition(compiler: &mut Compiler) {
    let Some(mutation) = compiler
        .input_block("custom_block")
        .and_then(|b| b.mutation.clone())
    else {
        return;
    };
    let prototype = Prototype::from_mutation(&mutation);
    let warp = prototype.warp;
    compiler.set_prototype(prototype);
    if warp {
        compiler.add_instruction(Opcode::Warp, &[]);
    }
}

// Arguments are evaluated left to right; a missing input binds the default
// declared by the definition.
fn compile_call(compiler: &mut Compiler) {
    let Some(mutation) = compiler.block().and_then(|b| b.mutation.clone()) else {
        return;
    };
    let call = Prototype::from_mutation(&mutation);
    let definition = compiler.definition(&call.proc_code);
    let defaults = definition.as_ref().unwrap_or(&call);
    let index = compiler.procedure_index(&call.proc_code);
    compiler.add_instruction(Opcode::InitProcedure, &[]);
    for (i, id) in call.argument_ids.iter().enumerate() {
        if compiler.has_input(id) {
            compiler.add_input(id);
        } else {
            compiler.add_const_value(defaults.default_argument(i));
        }
        compiler.add_instruction(Opcode::AddArg, &[]);
    }
    compiler.add_instruction(Opcode::CallProcedure, &[index]);
}

fn compile_argument_reporter(compiler: &mut Compiler) {
    let name = compiler.field_value("VALUE").to_string();
    let boolean = compiler
        .block()
        .is_some_and(|b| b.opcode == "argument_reporter_boolean");
    match compiler.prototype().and_then(|p| p.argument_index(&name)) {
        Some(index) => compiler.add_instruction(Opcode::ReadArg, &[index as u32]),
        None if boolean => compiler.add_const_value(false),
        None => compiler.add_const_value(0),
    }
}
