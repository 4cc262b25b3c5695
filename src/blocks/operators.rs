use crate::bytecode::Opcode;
use crate::compiler::Compiler;
use crate::registry::{BlockRegistry, BlockSection};
use crate::runtime::Runtime;
use crate::vm::VirtualMachine;

pub struct OperatorBlocks;

const MATH_OPS: [(&str, Option<Opcode>); 14] = [
    ("abs", Some(Opcode::Abs)),
    ("floor", Some(Opcode::Floor)),
    ("ceiling", Some(Opcode::Ceil)),
    ("sqrt", Some(Opcode::Sqrt)),
    ("sin", Some(Opcode::Sin)),
    ("cos", Some(Opcode::Cos)),
    ("tan", Some(Opcode::Tan)),
    ("asin", Some(Opcode::Asin)),
    ("acos", Some(Opcode::Acos)),
    ("atan", Some(Opcode::Atan)),
    ("ln", None),
    ("log", None),
    ("e ^", None),
    ("10 ^", None),
];

impl BlockSection for OperatorBlocks {
    fn name(&self) -> &str {
        "Operators"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("operator_add", compile_add);
        registry.add_compile_function("operator_subtract", compile_subtract);
        registry.add_compile_function("operator_multiply", compile_multiply);
        registry.add_compile_function("operator_divide", compile_divide);
        registry.add_compile_function("operator_mod", compile_mod);
        registry.add_compile_function("operator_random", compile_random);
        registry.add_compile_function("operator_round", compile_round);
        registry.add_compile_function("operator_mathop", compile_mathop);
        registry.add_boolean_block("operator_gt", compile_gt);
        registry.add_boolean_block("operator_lt", compile_lt);
        registry.add_boolean_block("operator_equals", compile_equals);
        registry.add_boolean_block("operator_and", compile_and);
        registry.add_boolean_block("operator_or", compile_or);
        registry.add_boolean_block("operator_not", compile_not);
        registry.add_compile_function("operator_join", compile_join);
        registry.add_compile_function("operator_letter_of", compile_letter_of);
        registry.add_compile_function("operator_length", compile_length);
        registry.add_boolean_block("operator_contains", compile_contains);

        for (id, (name, _)) in MATH_OPS.iter().enumerate() {
            registry.add_field_value("OPERATOR", name, id as i32);
        }
    }
}

fn binary(compiler: &mut Compiler, first: &str, second: &str, opcode: Opcode) {
    compiler.add_input(first);
    compiler.add_input(second);
    compiler.add_instruction(opcode, &[]);
}

fn compile_add(compiler: &mut Compiler) {
    binary(compiler, "NUM1", "NUM2", Opcode::Add);
}

fn compile_subtract(compiler: &mut Compiler) {
    binary(compiler, "NUM1", "NUM2", Opcode::Subtract);
}

fn compile_multiply(compiler: &mut Compiler) {
    binary(compiler, "NUM1", "NUM2", Opcode::Multiply);
}

fn compile_divide(compiler: &mut Compiler) {
    binary(compiler, "NUM1", "NUM2", Opcode::Divide);
}

fn compile_mod(compiler: &mut Compiler) {
    binary(compiler, "NUM1", "NUM2", Opcode::Mod);
}

fn compile_random(compiler: &mut Compiler) {
    binary(compiler, "FROM", "TO", Opcode::Random);
}

fn compile_round(compiler: &mut Compiler) {
    compiler.add_input("NUM");
    compiler.add_instruction(Opcode::Round, &[]);
}

fn compile_mathop(compiler: &mut Compiler) {
    let Some(op) = compiler
        .field_id("OPERATOR")
        .and_then(|id| MATH_OPS.get(id as usize))
    else {
        compiler.add_const_value(0);
        return;
    };
    compiler.add_input("NUM");
    match op {
        (_, Some(opcode)) => compiler.add_instruction(*opcode, &[]),
        ("ln", None) => compiler.add_function_call(ln),
        ("log", None) => compiler.add_function_call(log10),
        ("e ^", None) => compiler.add_function_call(exp),
        _ => compiler.add_function_call(pow10),
    }
}

fn compile_gt(compiler: &mut Compiler) {
    binary(compiler, "OPERAND1", "OPERAND2", Opcode::GreaterThan);
}

fn compile_lt(compiler: &mut Compiler) {
    binary(compiler, "OPERAND1", "OPERAND2", Opcode::LessThan);
}

fn compile_equals(compiler: &mut Compiler) {
    binary(compiler, "OPERAND1", "OPERAND2", Opcode::Equals);
}

fn compile_and(compiler: &mut Compiler) {
    binary(compiler, "OPERAND1", "OPERAND2", Opcode::And);
}

fn compile_or(compiler: &mut Compiler) {
    binary(compiler, "OPERAND1", "OPERAND2", Opcode::Or);
}

fn compile_not(compiler: &mut Compiler) {
    compiler.add_input("OPERAND");
    compiler.add_instruction(Opcode::Not, &[]);
}

fn compile_join(compiler: &mut Compiler) {
    binary(compiler, "STRING1", "STRING2", Opcode::StrConcat);
}

fn compile_letter_of(compiler: &mut Compiler) {
    binary(compiler, "STRING", "LETTER", Opcode::StrAt);
}

fn compile_length(compiler: &mut Compiler) {
    compiler.add_input("STRING");
    compiler.add_instruction(Opcode::StrLength, &[]);
}

fn compile_contains(compiler: &mut Compiler) {
    binary(compiler, "STRING1", "STRING2", Opcode::StrContains);
}

fn unary(vm: &mut VirtualMachine, op: fn(f64) -> f64) -> usize {
    let n = vm.input(0, 1).to_number();
    vm.set_return_value(op(n));
    1
}

fn ln(vm: &mut VirtualMachine, _: &mut Runtime) -> usize {
    unary(vm, f64::ln)
}

fn log10(vm: &mut VirtualMachine, _: &mut Runtime) -> usize {
    unary(vm, f64::log10)
}

fn exp(vm: &mut VirtualMachine, _: &mut Runtime) -> usize {
    unary(vm, f64::exp)
}

fn pow10(vm: &mut VirtualMachine, _: &mut Runtime) -> usize {
    unary(vm, |n| 10f64.powf(n))
}
