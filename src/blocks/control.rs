use crate::bytecode::Opcode;
use crate::compiler::{Compiler, SubstackType};
use crate::registry::{BlockRegistry, BlockSection};
use crate::runtime::{Request, Runtime};
use crate::vm::{StackTimer, VirtualMachine};

const STOP_ALL: i32 = 0;
const STOP_THIS_SCRIPT: i32 = 1;
const STOP_OTHER_SCRIPTS: i32 = 2;

pub struct ControlBlocks;

impl BlockSection for ControlBlocks {
    fn name(&self) -> &str {
        "Control"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("control_forever", compile_forever);
        registry.add_compile_function("control_repeat", compile_repeat);
        registry.add_compile_function("control_repeat_until", compile_repeat_until);
        registry.add_compile_function("control_while", compile_while);
        registry.add_compile_function("control_for_each", compile_for_each);
        registry.add_compile_function("control_if", compile_if);
        registry.add_compile_function("control_if_else", compile_if_else);
        registry.add_compile_function("control_wait", compile_wait);
        registry.add_compile_function("control_wait_until", compile_wait_until);
        registry.add_compile_function("control_stop", compile_stop);
        registry.add_compile_function("control_create_clone_of", compile_create_clone_of);
        registry.add_compile_function("control_delete_this_clone", compile_delete_this_clone);
        registry.add_hat_block("control_start_as_clone");

        registry.add_field_value("STOP_OPTION", "all", STOP_ALL);
        registry.add_field_value("STOP_OPTION", "this script", STOP_THIS_SCRIPT);
        registry.add_field_value("STOP_OPTION", "other scripts in sprite", STOP_OTHER_SCRIPTS);
        registry.add_field_value("STOP_OPTION", "other scripts in stage", STOP_OTHER_SCRIPTS);
    }
}

fn compile_forever(compiler: &mut Compiler) {
    compiler.add_instruction(Opcode::ForeverLoop, &[]);
    compiler.compile_substack("SUBSTACK", SubstackType::Loop);
    compiler.add_instruction(Opcode::LoopEnd, &[]);
}

fn compile_repeat(compiler: &mut Compiler) {
    compiler.add_input("TIMES");
    compiler.add_instruction(Opcode::RepeatLoop, &[]);
    compiler.compile_substack("SUBSTACK", SubstackType::Loop);
    compiler.add_instruction(Opcode::LoopEnd, &[]);
}

fn compile_repeat_until(compiler: &mut Compiler) {
    compiler.add_instruction(Opcode::BeginUntilLoop, &[]);
    compiler.add_condition_input("CONDITION");
    compiler.add_instruction(Opcode::UntilLoop, &[]);
    compiler.compile_substack("SUBSTACK", SubstackType::Loop);
    compiler.add_instruction(Opcode::LoopEnd, &[]);
}

fn compile_while(compiler: &mut Compiler) {
    compiler.add_instruction(Opcode::BeginUntilLoop, &[]);
    compiler.add_condition_input("CONDITION");
    compiler.add_instruction(Opcode::Not, &[]);
    compiler.add_instruction(Opcode::UntilLoop, &[]);
    compiler.compile_substack("SUBSTACK", SubstackType::Loop);
    compiler.add_instruction(Opcode::LoopEnd, &[]);
}

// for each [VARIABLE] in (VALUE): sets the variable to 1, 2, ... ceil(VALUE).
fn compile_for_each(compiler: &mut Compiler) {
    let Some(variable) = compiler.field_reference("VARIABLE") else {
        return;
    };
    let index = compiler.variable_index(&variable);
    compiler.add_input("VALUE");
    compiler.add_instruction(Opcode::Ceil, &[]);
    compiler.add_instruction(Opcode::RepeatLoop, &[]);
    compiler.add_instruction(Opcode::RepeatLoopIndex1, &[]);
    compiler.add_instruction(Opcode::SetVar, &[index]);
    compiler.compile_substack("SUBSTACK", SubstackType::Loop);
    compiler.add_instruction(Opcode::LoopEnd, &[]);
}

fn compile_if(compiler: &mut Compiler) {
    compiler.add_condition_input("CONDITION");
    compiler.add_instruction(Opcode::If, &[]);
    compiler.compile_substack("SUBSTACK", SubstackType::IfStatement);
    compiler.add_instruction(Opcode::EndIf, &[]);
}

fn compile_if_else(compiler: &mut Compiler) {
    compiler.add_condition_input("CONDITION");
    compiler.add_instruction(Opcode::If, &[]);
    compiler.compile_substack("SUBSTACK", SubstackType::IfStatement);
    compiler.add_instruction(Opcode::Else, &[]);
    compiler.compile_substack("SUBSTACK2", SubstackType::IfStatement);
    compiler.add_instruction(Opcode::EndIf, &[]);
}

fn compile_wait(compiler: &mut Compiler) {
    compiler.add_input("DURATION");
    compiler.add_function_call(start_wait);
    compiler.add_instruction(Opcode::Checkpoint, &[]);
    compiler.add_function_call(wait);
}

fn compile_wait_until(compiler: &mut Compiler) {
    compiler.add_instruction(Opcode::Checkpoint, &[]);
    compiler.add_condition_input("CONDITION");
    compiler.add_function_call(wait_until);
}

fn compile_stop(compiler: &mut Compiler) {
    match compiler.field_id("STOP_OPTION") {
        Some(STOP_ALL) => compiler.add_function_call(stop_all),
        Some(STOP_THIS_SCRIPT) => compiler.add_function_call(stop_this_script),
        Some(STOP_OTHER_SCRIPTS) => compiler.add_function_call(stop_other_scripts),
        _ => {}
    }
}

fn compile_create_clone_of(compiler: &mut Compiler) {
    compiler.add_input("CLONE_OPTION");
    compiler.add_function_call(create_clone_of);
}

fn compile_delete_this_clone(compiler: &mut Compiler) {
    compiler.add_function_call(delete_this_clone);
}

/// Starts the stack timer for `DURATION` seconds and yields.
pub(crate) fn start_wait(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let duration = vm.input(0, 1).to_number();
    vm.set_timer(Some(StackTimer {
        start: rt.host.now(),
        duration,
    }));
    vm.yield_frame();
    1
}

/// Retries from the checkpoint until the stack timer has elapsed.
pub(crate) fn wait(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    match vm.timer() {
        Some(timer) if !timer.elapsed(rt.host.now()) => vm.retry(),
        _ => vm.set_timer(None),
    }
    0
}

fn wait_until(vm: &mut VirtualMachine, _: &mut Runtime) -> usize {
    if !vm.input(0, 1).to_bool() {
        vm.retry();
    }
    1
}

fn stop_all(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    rt.request(Request::StopAll);
    vm.finish();
    0
}

fn stop_this_script(vm: &mut VirtualMachine, _: &mut Runtime) -> usize {
    vm.stop_script();
    0
}

fn stop_other_scripts(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let except = rt.current_thread();
    rt.request(Request::StopOtherScripts {
        target: vm.target(),
        except,
    });
    0
}

fn create_clone_of(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let option = vm.input(0, 1).to_string();
    let source = if option == "_myself_" {
        Some(vm.target())
    } else {
        rt.find_target(&option)
    };
    if let Some(source) = source {
        rt.init_clone(source);
    }
    1
}

fn delete_this_clone(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    if rt.targets.get(vm.target()).is_some_and(|t| t.is_clone()) {
        rt.deinit_clone(vm.target());
        vm.finish();
    }
    0
}
