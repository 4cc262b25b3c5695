use crate::bytecode::Opcode;
use crate::compiler::Compiler;
use crate::registry::{BlockRegistry, BlockSection};

pub struct DataBlocks;

impl BlockSection for DataBlocks {
    fn name(&self) -> &str {
        "Variables"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("data_setvariableto", compile_set_variable_to);
        registry.add_compile_function("data_changevariableby", compile_change_variable_by);
        registry.add_compile_function("data_variable", compile_variable);
        registry.add_compile_function("data_addtolist", compile_add_to_list);
        registry.add_compile_function("data_deleteoflist", compile_delete_of_list);
        registry.add_compile_function("data_deletealloflist", compile_delete_all_of_list);
        registry.add_compile_function("data_insertatlist", compile_insert_at_list);
        registry.add_compile_function("data_replaceitemoflist", compile_replace_item_of_list);
        registry.add_compile_function("data_itemoflist", compile_item_of_list);
        registry.add_compile_function("data_itemnumoflist", compile_item_num_of_list);
        registry.add_compile_function("data_lengthoflist", compile_length_of_list);
        registry.add_boolean_block("data_listcontainsitem", compile_list_contains_item);
        registry.add_compile_function("data_listcontents", compile_list_contents);
    }
}

fn variable(compiler: &mut Compiler) -> Option<u32> {
    let variable = compiler.field_reference("VARIABLE")?;
    Some(compiler.variable_index(&variable))
}

fn list(compiler: &mut Compiler) -> Option<u32> {
    let list = compiler.field_reference("LIST")?;
    Some(compiler.list_index(&list))
}

/// Compiles `inputs` followed by a list instruction. Without a list the
/// block is a no-op, or pushes an empty value if it is a reporter.
fn list_op(compiler: &mut Compiler, inputs: &[&str], opcode: Opcode, reporter: bool) {
    let Some(index) = list(compiler) else {
        if reporter {
            compiler.add_instruction(Opcode::Null, &[]);
        }
        return;
    };
    for input in inputs {
        compiler.add_input(input);
    }
    compiler.add_instruction(opcode, &[index]);
}

fn compile_set_variable_to(compiler: &mut Compiler) {
    if let Some(index) = variable(compiler) {
        compiler.add_input("VALUE");
        compiler.add_instruction(Opcode::SetVar, &[index]);
    }
}

fn compile_change_variable_by(compiler: &mut Compiler) {
    if let Some(index) = variable(compiler) {
        compiler.add_input("VALUE");
        compiler.add_instruction(Opcode::ChangeVar, &[index]);
    }
}

fn compile_variable(compiler: &mut Compiler) {
    match variable(compiler) {
        Some(index) => compiler.add_instruction(Opcode::ReadVar, &[index]),
        None => compiler.add_instruction(Opcode::Null, &[]),
    }
}

fn compile_add_to_list(compiler: &mut Compiler) {
    list_op(compiler, &["ITEM"], Opcode::ListAppend, false);
}

fn compile_delete_of_list(compiler: &mut Compiler) {
    list_op(compiler, &["INDEX"], Opcode::ListDel, false);
}

fn compile_delete_all_of_list(compiler: &mut Compiler) {
    list_op(compiler, &[], Opcode::ListDelAll, false);
}

fn compile_insert_at_list(compiler: &mut Compiler) {
    list_op(compiler, &["ITEM", "INDEX"], Opcode::ListInsert, false);
}

fn compile_replace_item_of_list(compiler: &mut Compiler) {
    list_op(compiler, &["INDEX", "ITEM"], Opcode::ListReplace, false);
}

fn compile_item_of_list(compiler: &mut Compiler) {
    list_op(compiler, &["INDEX"], Opcode::ListGetItem, true);
}

fn compile_item_num_of_list(compiler: &mut Compiler) {
    list_op(compiler, &["ITEM"], Opcode::ListIndexOf, true);
}

fn compile_length_of_list(compiler: &mut Compiler) {
    list_op(compiler, &[], Opcode::ListLength, true);
}

fn compile_list_contains_item(compiler: &mut Compiler) {
    list_op(compiler, &["ITEM"], Opcode::ListContains, true);
}

fn compile_list_contents(compiler: &mut Compiler) {
    list_op(compiler, &[], Opcode::ReadList, true);
}
