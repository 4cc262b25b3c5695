use crate::compiler::Compiler;
use crate::promise::Promise;
use crate::registry::{BlockRegistry, BlockSection};
use crate::runtime::Runtime;
use crate::value::Value;
use crate::vm::VirtualMachine;

use super::motion::limit_precision;

pub struct SensingBlocks;

impl BlockSection for SensingBlocks {
    fn name(&self) -> &str {
        "Sensing"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("sensing_askandwait", compile_ask_and_wait);
        registry.add_compile_function("sensing_answer", compile_answer);
        registry.add_compile_function("sensing_timer", compile_timer);
        registry.add_compile_function("sensing_resettimer", compile_reset_timer);
        registry.add_compile_function("sensing_mousex", compile_mouse_x);
        registry.add_compile_function("sensing_mousey", compile_mouse_y);
        registry.add_boolean_block("sensing_mousedown", compile_mouse_down);
        registry.add_boolean_block("sensing_keypressed", compile_key_pressed);
        registry.add_compile_function("sensing_loudness", compile_loudness);
        registry.add_compile_function("sensing_of", compile_of);
    }
}

fn compile_ask_and_wait(compiler: &mut Compiler) {
    compiler.add_input("QUESTION");
    compiler.add_function_call(ask_and_wait);
}

fn compile_answer(compiler: &mut Compiler) {
    compiler.add_function_call(answer);
}

fn compile_timer(compiler: &mut Compiler) {
    compiler.add_function_call(timer);
}

fn compile_reset_timer(compiler: &mut Compiler) {
    compiler.add_function_call(reset_timer);
}

fn compile_mouse_x(compiler: &mut Compiler) {
    compiler.add_function_call(mouse_x);
}

fn compile_mouse_y(compiler: &mut Compiler) {
    compiler.add_function_call(mouse_y);
}

fn compile_mouse_down(compiler: &mut Compiler) {
    compiler.add_function_call(mouse_down);
}

fn compile_key_pressed(compiler: &mut Compiler) {
    compiler.add_input("KEY_OPTION");
    compiler.add_function_call(key_pressed);
}

fn compile_loudness(compiler: &mut Compiler) {
    compiler.add_function_call(loudness);
}

fn compile_of(compiler: &mut Compiler) {
    let property = compiler.field_value("PROPERTY");
    compiler.add_const_value(property);
    compiler.add_input("OBJECT");
    compiler.add_function_call(of);
}

/// Queues the question and suspends until it is answered.
fn ask_and_wait(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let question = vm.input(0, 1).to_string();
    let promise = Promise::new();
    rt.ask(vm.target(), question, promise.clone());
    vm.suspend(promise);
    1
}

fn answer(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    vm.set_return_value(rt.questions.answer());
    0
}

fn timer(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    vm.set_return_value(rt.timer());
    0
}

fn reset_timer(_: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    rt.reset_timer();
    0
}

fn mouse_x(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    vm.set_return_value(rt.mouse_x());
    0
}

fn mouse_y(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    vm.set_return_value(rt.mouse_y());
    0
}

fn mouse_down(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    vm.set_return_value(rt.host.mouse_down());
    0
}

fn key_pressed(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let key = vm.input(0, 1).to_string();
    vm.set_return_value(rt.host.key_pressed(&key));
    1
}

fn loudness(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    vm.set_return_value(rt.host.loudness());
    0
}

/// `(property) of (object)`: sprite attributes, or a variable of the
/// target by name. Unknown targets and properties report 0.
fn of(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let property = vm.input(0, 2).to_string();
    let object = vm.input(1, 2).to_string();
    let value = rt
        .find_target(&object)
        .and_then(|id| rt.targets.get(id))
        .and_then(|target| match (property.as_str(), target.is_stage) {
            ("x position", false) => Some(Value::from(limit_precision(target.x))),
            ("y position", false) => Some(Value::from(limit_precision(target.y))),
            ("direction", false) => Some(Value::from(target.direction)),
            ("size", false) => Some(Value::from(target.size.round())),
            (name, _) => target.variable_by_name(name).map(|v| v.value.clone()),
        })
        .unwrap_or(Value::Number(0.));
    vm.set_return_value(value);
    2
}
