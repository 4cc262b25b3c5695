use crate::compiler::Compiler;
use crate::promise::Promise;
use crate::registry::{BlockRegistry, BlockSection};
use crate::runtime::Runtime;
use crate::vm::VirtualMachine;

const TIMER: i32 = 0;
const LOUDNESS: i32 = 1;

pub struct EventBlocks;

impl BlockSection for EventBlocks {
    fn name(&self) -> &str {
        "Events"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_hat_block("event_whenflagclicked");
        registry.add_hat_block("event_whenbroadcastreceived");
        registry.add_hat_block("event_whenkeypressed");
        registry.add_hat_block("event_whenthisspriteclicked");
        registry.add_hat_block("event_whenstageclicked");
        registry.add_hat_predicate("event_whengreaterthan", compile_when_greater_than);
        registry.add_compile_function("event_broadcast", compile_broadcast);
        registry.add_compile_function("event_broadcastandwait", compile_broadcast_and_wait);

        registry.add_field_value("WHENGREATERTHANMENU", "TIMER", TIMER);
        registry.add_field_value("WHENGREATERTHANMENU", "LOUDNESS", LOUDNESS);
    }
}

fn compile_when_greater_than(compiler: &mut Compiler) {
    match compiler.field_id("WHENGREATERTHANMENU") {
        Some(TIMER) => {
            compiler.add_input("VALUE");
            compiler.add_function_call(timer_greater_than);
        }
        Some(LOUDNESS) => {
            compiler.add_input("VALUE");
            compiler.add_function_call(loudness_greater_than);
        }
        _ => compiler.add_const_value(false),
    }
}

fn compile_broadcast(compiler: &mut Compiler) {
    compiler.add_input("BROADCAST_INPUT");
    compiler.add_function_call(broadcast);
}

fn compile_broadcast_and_wait(compiler: &mut Compiler) {
    compiler.add_input("BROADCAST_INPUT");
    compiler.add_function_call(broadcast_and_wait);
}

fn timer_greater_than(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let value = vm.input(0, 1).to_number();
    vm.set_return_value(rt.timer() > value);
    1
}

fn loudness_greater_than(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let value = vm.input(0, 1).to_number();
    vm.set_return_value(rt.host.loudness() > value);
    1
}

fn broadcast(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let name = vm.input(0, 1).to_string();
    rt.broadcast(&name, None);
    1
}

fn broadcast_and_wait(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let name = vm.input(0, 1).to_string();
    let promise = Promise::new();
    rt.broadcast(&name, Some(promise.clone()));
    vm.suspend(promise);
    1
}
