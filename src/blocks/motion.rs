use std::f64::consts::PI;

use crate::compiler::Compiler;
use crate::registry::{BlockRegistry, BlockSection};
use crate::runtime::Runtime;
use crate::target::Target;
use crate::vm::VirtualMachine;

pub struct MotionBlocks;

impl BlockSection for MotionBlocks {
    fn name(&self) -> &str {
        "Motion"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("motion_movesteps", compile_move_steps);
        registry.add_compile_function("motion_turnright", compile_turn_right);
        registry.add_compile_function("motion_turnleft", compile_turn_left);
        registry.add_compile_function("motion_gotoxy", compile_go_to_xy);
        registry.add_compile_function("motion_setx", compile_set_x);
        registry.add_compile_function("motion_sety", compile_set_y);
        registry.add_compile_function("motion_changexby", compile_change_x_by);
        registry.add_compile_function("motion_changeyby", compile_change_y_by);
        registry.add_compile_function("motion_pointindirection", compile_point_in_direction);
        registry.add_compile_function("motion_xposition", compile_x_position);
        registry.add_compile_function("motion_yposition", compile_y_position);
        registry.add_compile_function("motion_direction", compile_direction);
    }
}

fn compile_move_steps(compiler: &mut Compiler) {
    compiler.add_input("STEPS");
    compiler.add_function_call(move_steps);
}

fn compile_turn_right(compiler: &mut Compiler) {
    compiler.add_input("DEGREES");
    compiler.add_function_call(turn_right);
}

fn compile_turn_left(compiler: &mut Compiler) {
    compiler.add_input("DEGREES");
    compiler.add_function_call(turn_left);
}

fn compile_go_to_xy(compiler: &mut Compiler) {
    compiler.add_input("X");
    compiler.add_input("Y");
    compiler.add_function_call(go_to_xy);
}

fn compile_set_x(compiler: &mut Compiler) {
    compiler.add_input("X");
    compiler.add_function_call(set_x);
}

fn compile_set_y(compiler: &mut Compiler) {
    compiler.add_input("Y");
    compiler.add_function_call(set_y);
}

fn compile_change_x_by(compiler: &mut Compiler) {
    compiler.add_input("DX");
    compiler.add_function_call(change_x_by);
}

fn compile_change_y_by(compiler: &mut Compiler) {
    compiler.add_input("DY");
    compiler.add_function_call(change_y_by);
}

fn compile_point_in_direction(compiler: &mut Compiler) {
    compiler.add_input("DIRECTION");
    compiler.add_function_call(point_in_direction);
}

fn compile_x_position(compiler: &mut Compiler) {
    compiler.add_function_call(x_position);
}

fn compile_y_position(compiler: &mut Compiler) {
    compiler.add_function_call(y_position);
}

fn compile_direction(compiler: &mut Compiler) {
    compiler.add_function_call(direction);
}

/// Applies `update` to the running sprite. The stage has no position.
fn with_sprite(vm: &VirtualMachine, rt: &mut Runtime, update: impl FnOnce(&mut Target)) {
    if let Some(target) = rt.targets.get_mut(vm.target()) {
        if !target.is_stage {
            update(target);
        }
    }
}

/// Snaps coordinates that are within float error of an integer.
pub(crate) fn limit_precision(coordinate: f64) -> f64 {
    let rounded = coordinate.round();
    if (coordinate - rounded).abs() < 1e-9 {
        rounded
    } else {
        coordinate
    }
}

fn move_steps(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let steps = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| {
        let radians = (90. - target.direction) * PI / 180.;
        target.x += steps * radians.cos();
        target.y += steps * radians.sin();
    });
    1
}

fn turn_right(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let degrees = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| target.set_direction(target.direction + degrees));
    1
}

fn turn_left(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let degrees = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| target.set_direction(target.direction - degrees));
    1
}

fn go_to_xy(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let x = vm.input(0, 2).to_number();
    let y = vm.input(1, 2).to_number();
    with_sprite(vm, rt, |target| {
        target.x = x;
        target.y = y;
    });
    2
}

fn set_x(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let x = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| target.x = x);
    1
}

fn set_y(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let y = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| target.y = y);
    1
}

fn change_x_by(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let dx = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| target.x += dx);
    1
}

fn change_y_by(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let dy = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| target.y += dy);
    1
}

fn point_in_direction(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let direction = vm.input(0, 1).to_number();
    with_sprite(vm, rt, |target| target.set_direction(direction));
    1
}

fn report(vm: &mut VirtualMachine, rt: &Runtime, read: impl FnOnce(&Target) -> f64) -> usize {
    let value = rt
        .targets
        .get(vm.target())
        .filter(|t| !t.is_stage)
        .map(read)
        .unwrap_or(0.);
    vm.set_return_value(value);
    0
}

fn x_position(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    report(vm, rt, |t| limit_precision(t.x))
}

fn y_position(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    report(vm, rt, |t| limit_precision(t.y))
}

fn direction(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    report(vm, rt, |t| t.direction)
}
