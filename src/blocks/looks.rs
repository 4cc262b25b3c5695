use crate::bytecode::Opcode;
use crate::compiler::Compiler;
use crate::registry::{BlockRegistry, BlockSection};
use crate::runtime::Runtime;
use crate::target::BubbleKind;
use crate::vm::{StackTimer, VirtualMachine};

use super::control::wait;

pub struct LooksBlocks;

impl BlockSection for LooksBlocks {
    fn name(&self) -> &str {
        "Looks"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("looks_say", compile_say);
        registry.add_compile_function("looks_think", compile_think);
        registry.add_compile_function("looks_sayforsecs", compile_say_for_secs);
        registry.add_compile_function("looks_thinkforsecs", compile_think_for_secs);
        registry.add_compile_function("looks_show", compile_show);
        registry.add_compile_function("looks_hide", compile_hide);
    }
}

fn compile_say(compiler: &mut Compiler) {
    compiler.add_input("MESSAGE");
    compiler.add_function_call(say);
}

fn compile_think(compiler: &mut Compiler) {
    compiler.add_input("MESSAGE");
    compiler.add_function_call(think);
}

fn compile_say_for_secs(compiler: &mut Compiler) {
    compiler.add_input("MESSAGE");
    compiler.add_input("SECS");
    compiler.add_function_call(start_say_for_secs);
    compiler.add_instruction(Opcode::Checkpoint, &[]);
    compiler.add_function_call(wait);
    compiler.add_function_call(clear_bubble);
}

fn compile_think_for_secs(compiler: &mut Compiler) {
    compiler.add_input("MESSAGE");
    compiler.add_input("SECS");
    compiler.add_function_call(start_think_for_secs);
    compiler.add_instruction(Opcode::Checkpoint, &[]);
    compiler.add_function_call(wait);
    compiler.add_function_call(clear_bubble);
}

fn compile_show(compiler: &mut Compiler) {
    compiler.add_function_call(show);
}

fn compile_hide(compiler: &mut Compiler) {
    compiler.add_function_call(hide);
}

fn bubble(vm: &mut VirtualMachine, rt: &mut Runtime, kind: BubbleKind, count: usize) {
    let text = vm.input(0, count).to_string();
    rt.set_bubble(vm.target(), kind, text);
}

fn say(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    bubble(vm, rt, BubbleKind::Say, 1);
    1
}

fn think(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    bubble(vm, rt, BubbleKind::Think, 1);
    1
}

fn bubble_for_secs(vm: &mut VirtualMachine, rt: &mut Runtime, kind: BubbleKind) -> usize {
    bubble(vm, rt, kind, 2);
    let duration = vm.input(1, 2).to_number();
    vm.set_timer(Some(StackTimer {
        start: rt.host.now(),
        duration,
    }));
    vm.yield_frame();
    2
}

fn start_say_for_secs(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    bubble_for_secs(vm, rt, BubbleKind::Say)
}

fn start_think_for_secs(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    bubble_for_secs(vm, rt, BubbleKind::Think)
}

fn clear_bubble(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    rt.set_bubble(vm.target(), BubbleKind::Say, String::new());
    0
}

fn set_visible(vm: &VirtualMachine, rt: &mut Runtime, visible: bool) {
    if let Some(target) = rt.targets.get_mut(vm.target()) {
        if !target.is_stage {
            target.visible = visible;
        }
    }
}

fn show(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    set_visible(vm, rt, true);
    0
}

fn hide(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    set_visible(vm, rt, false);
    0
}
