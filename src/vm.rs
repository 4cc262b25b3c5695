use std::cmp::Ordering;
use std::f64::consts::PI;
use std::mem;
use std::rc::Rc;

use crate::bytecode::Opcode;
use crate::list::{List, ListIndex};
use crate::promise::Promise;
use crate::runtime::Runtime;
use crate::script::{Blob, Script};
use crate::target::{Slot, TargetId};
use crate::value::Value;

/// A native function called by `Exec`. Reads its inputs with
/// [`VirtualMachine::input`] and returns how many of them to pop.
pub type NativeFn = fn(&mut VirtualMachine, &mut Runtime) -> usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    Yielded,
    AwaitingPromise,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Branch {
    Repeat { index: usize, count: f64 },
    Until,
    Forever,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LoopFrame {
    branch: Branch,
    start: usize,
}

#[derive(Debug, Clone)]
struct CallFrame {
    blob: Blob,
    return_ip: usize,
    args: Vec<Value>,
    warp: bool,
    loop_base: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Suspend {
    #[default]
    None,
    Yield,
    Retry,
}

/// Timer for timed waits, running on the host clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackTimer {
    pub start: f64,
    pub duration: f64,
}

impl StackTimer {
    pub fn elapsed(&self, now: f64) -> bool {
        now - self.start >= self.duration
    }
}

/// Executes one script for one target. All state survives across `run`
/// calls so execution resumes exactly where it yielded.
#[derive(Debug)]
pub struct VirtualMachine {
    script: Rc<Script>,
    target: TargetId,
    variables: Vec<Slot>,
    lists: Vec<Slot>,
    ip: usize,
    stack: Vec<Value>,
    loops: Vec<LoopFrame>,
    calls: Vec<CallFrame>,
    pending_args: Vec<Vec<Value>>,
    checkpoint: Option<usize>,
    warp_depth: usize,
    state: VmState,
    suspend: Suspend,
    return_value: Option<Value>,
    promise: Option<Promise>,
    timer: Option<StackTimer>,
}

impl VirtualMachine {
    pub fn new(script: Rc<Script>, target: TargetId, rt: &mut Runtime) -> VirtualMachine {
        let variables = script
            .variables()
            .iter()
            .map(|v| rt.targets.resolve_variable(target, &v.id, &v.name))
            .collect();
        let lists = script
            .lists()
            .iter()
            .map(|l| rt.targets.resolve_list(target, &l.id, &l.name))
            .collect();
        let mut vm = VirtualMachine {
            script,
            target,
            variables,
            lists,
            ip: 0,
            stack: Vec::new(),
            loops: Vec::new(),
            calls: Vec::new(),
            pending_args: Vec::new(),
            checkpoint: None,
            warp_depth: 0,
            state: VmState::Running,
            suspend: Suspend::None,
            return_value: None,
            promise: None,
            timer: None,
        };
        vm.reset(Blob::Main);
        vm
    }

    /// Rewinds to the start of `entry`, dropping all execution state.
    pub fn reset(&mut self, entry: Blob) {
        self.ip = 0;
        self.stack.clear();
        self.loops.clear();
        self.calls.clear();
        self.calls.push(CallFrame {
            blob: entry,
            return_ip: 0,
            args: Vec::new(),
            warp: false,
            loop_base: 0,
        });
        self.pending_args.clear();
        self.checkpoint = None;
        self.warp_depth = 0;
        self.state = VmState::Running;
        self.suspend = Suspend::None;
        self.return_value = None;
        self.promise = None;
        self.timer = None;
    }

    pub fn script(&self) -> &Rc<Script> {
        &self.script
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == VmState::Finished
    }

    pub fn promise(&self) -> Option<&Promise> {
        self.promise.as_ref()
    }

    /// Value left on top of the stack, e.g. by a reporter.
    pub fn result(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn is_warp(&self) -> bool {
        self.warp_depth > 0
    }

    pub fn variable_slot(&self, index: usize) -> Option<Slot> {
        self.variables.get(index).copied()
    }

    pub fn list_slot(&self, index: usize) -> Option<Slot> {
        self.lists.get(index).copied()
    }

    /// The `index`-th of the `count` topmost stack values.
    pub fn input(&self, index: usize, count: usize) -> &Value {
        &self.stack[self.stack.len() - count + index]
    }

    /// Value pushed after the native's inputs are popped.
    pub fn set_return_value(&mut self, value: impl Into<Value>) {
        self.return_value = Some(value.into());
    }

    /// Suspends until the next frame.
    pub fn yield_frame(&mut self) {
        self.suspend = Suspend::Yield;
    }

    /// Suspends until the next frame and then re-runs from the last checkpoint.
    pub fn retry(&mut self) {
        self.suspend = Suspend::Retry;
    }

    /// Suspends until `promise` settles.
    pub fn suspend(&mut self, promise: Promise) {
        self.promise = Some(promise);
    }

    pub fn timer(&self) -> Option<StackTimer> {
        self.timer
    }

    pub fn set_timer(&mut self, timer: Option<StackTimer>) {
        self.timer = timer;
    }

    pub fn finish(&mut self) {
        self.state = VmState::Finished;
        self.loops.clear();
        self.calls.truncate(1);
        self.pending_args.clear();
        self.timer = None;
    }

    /// Ends the current procedure, or the script at top level.
    pub fn stop_script(&mut self) {
        if self.calls.len() > 1 {
            self.return_from_procedure();
        } else {
            self.finish();
        }
    }

    fn current_blob(&self) -> Blob {
        self.calls.last().map(|f| f.blob).unwrap_or(Blob::Main)
    }

    fn push(&mut self, value: impl Into<Value>) {
        self.stack.push(value.into());
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    fn pop_n(&mut self, count: usize) {
        let len = self.stack.len().saturating_sub(count);
        self.stack.truncate(len);
    }

    fn return_from_procedure(&mut self) {
        if self.calls.len() <= 1 {
            return;
        }
        if let Some(frame) = self.calls.pop() {
            if frame.warp {
                self.warp_depth -= 1;
            }
            self.loops.truncate(frame.loop_base);
            self.ip = frame.return_ip;
        }
    }

    /// Runs until the script yields, suspends on a promise or finishes.
    pub fn run(&mut self, rt: &mut Runtime) {
        match self.state {
            VmState::Finished => return,
            VmState::AwaitingPromise => {
                if self.promise.as_ref().is_some_and(Promise::is_pending) {
                    return;
                }
                self.promise = None;
            }
            _ => {}
        }
        self.state = VmState::Running;
        let script = Rc::clone(&self.script);
        while self.state == VmState::Running {
            let Some(code) = script.code(self.current_blob()) else {
                self.stop_script();
                continue;
            };
            let address = self.ip;
            let Some(opcode) = code.words.get(address).copied().and_then(Opcode::from_word) else {
                self.stop_script();
                continue;
            };
            let operand = code.words.get(address + 1).copied().unwrap_or(0) as usize;
            self.ip = address + 1 + opcode.operand_count();
            let skip_to = |ip: usize| code.jump(address).map(|target| target + 1).unwrap_or(ip);

            match opcode {
                Opcode::Start | Opcode::EndIf => {}
                Opcode::Halt => self.stop_script(),
                Opcode::Const => {
                    let value = script.constants()[operand].clone();
                    self.push(value);
                }
                Opcode::Null => self.push(Value::default()),
                Opcode::Checkpoint => self.checkpoint = Some(self.ip),
                Opcode::If => {
                    if !self.pop().to_bool() {
                        self.ip = skip_to(self.ip);
                    }
                }
                Opcode::Else => self.ip = skip_to(self.ip),
                Opcode::ForeverLoop => self.loops.push(LoopFrame {
                    branch: Branch::Forever,
                    start: self.ip,
                }),
                Opcode::RepeatLoop => {
                    let count = js_round(self.pop().to_number());
                    if count >= 1. {
                        self.loops.push(LoopFrame {
                            branch: Branch::Repeat { index: 0, count },
                            start: self.ip,
                        });
                    } else {
                        self.ip = skip_to(self.ip);
                    }
                }
                Opcode::RepeatLoopIndex1 => {
                    let index = self
                        .loops
                        .iter()
                        .rev()
                        .find_map(|frame| match frame.branch {
                            Branch::Repeat { index, .. } => Some(index),
                            _ => None,
                        })
                        .unwrap_or(0);
                    self.push(index + 1);
                }
                Opcode::BeginUntilLoop => self.loops.push(LoopFrame {
                    branch: Branch::Until,
                    start: self.ip,
                }),
                Opcode::UntilLoop => {
                    if self.pop().to_bool() {
                        self.loops.pop();
                        self.ip = skip_to(self.ip);
                    }
                }
                Opcode::LoopEnd => {
                    let mut done = false;
                    if let Some(frame) = self.loops.last_mut() {
                        if let Branch::Repeat { index, count } = &mut frame.branch {
                            *index += 1;
                            done = *index as f64 >= *count;
                        }
                        if !done {
                            self.ip = frame.start;
                        }
                    }
                    if done {
                        self.loops.pop();
                    }
                }
                Opcode::Add
                | Opcode::Subtract
                | Opcode::Multiply
                | Opcode::Divide
                | Opcode::Mod => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(match opcode {
                        Opcode::Add => a.add(&b),
                        Opcode::Subtract => a.subtract(&b),
                        Opcode::Multiply => a.multiply(&b),
                        Opcode::Divide => a.divide(&b),
                        _ => a.modulo(&b),
                    });
                }
                Opcode::Random => {
                    let to = self.pop();
                    let from = self.pop();
                    let value = random_between(&from, &to, rt.host.random());
                    self.push(value);
                }
                Opcode::Round
                | Opcode::Abs
                | Opcode::Floor
                | Opcode::Ceil
                | Opcode::Sqrt
                | Opcode::Sin
                | Opcode::Cos
                | Opcode::Tan
                | Opcode::Asin
                | Opcode::Acos
                | Opcode::Atan => {
                    let n = self.pop().to_number();
                    self.push(math_op(opcode, n));
                }
                Opcode::GreaterThan | Opcode::LessThan | Opcode::Equals => {
                    let b = self.pop();
                    let a = self.pop();
                    let expected = match opcode {
                        Opcode::GreaterThan => Ordering::Greater,
                        Opcode::LessThan => Ordering::Less,
                        _ => Ordering::Equal,
                    };
                    self.push(a.compare(&b) == expected);
                }
                Opcode::And | Opcode::Or => {
                    let b = self.pop().to_bool();
                    let a = self.pop().to_bool();
                    self.push(if opcode == Opcode::And { a && b } else { a || b });
                }
                Opcode::Not => {
                    let a = self.pop().to_bool();
                    self.push(!a);
                }
                Opcode::SetVar | Opcode::ChangeVar => {
                    let value = self.pop();
                    if let Some(variable) = self
                        .variables
                        .get(operand)
                        .and_then(|&slot| rt.targets.variable_mut(slot))
                    {
                        variable.value = if opcode == Opcode::SetVar {
                            value
                        } else {
                            Value::Number(variable.value.to_number() + value.to_number())
                        };
                    }
                }
                Opcode::ReadVar => {
                    let value = self
                        .variables
                        .get(operand)
                        .and_then(|&slot| rt.targets.variable(slot))
                        .map(|v| v.value.clone())
                        .unwrap_or_default();
                    self.push(value);
                }
                Opcode::ReadList => {
                    let value = self.read_list(rt, operand, |list| Value::String(list.to_string()));
                    self.push(value);
                }
                Opcode::ListAppend => {
                    let item = self.pop();
                    self.write_list(rt, operand, |list| list.push(item));
                }
                Opcode::ListDel => {
                    let index = self.pop();
                    let index = self.resolve_list_index(rt, operand, &index, 0, true);
                    self.write_list(rt, operand, |list| match index {
                        ListIndex::At(i) => {
                            list.remove_at(i);
                        }
                        ListIndex::All => list.clear(),
                        ListIndex::Invalid => {}
                    });
                }
                Opcode::ListDelAll => self.write_list(rt, operand, List::clear),
                Opcode::ListInsert => {
                    let index = self.pop();
                    let item = self.pop();
                    let position = self.resolve_list_index(rt, operand, &index, 1, false);
                    if let ListIndex::At(i) = position {
                        self.write_list(rt, operand, |list| list.insert(i, item));
                    }
                }
                Opcode::ListReplace => {
                    let item = self.pop();
                    let index = self.pop();
                    let position = self.resolve_list_index(rt, operand, &index, 0, false);
                    if let ListIndex::At(i) = position {
                        self.write_list(rt, operand, |list| list.replace(i, item));
                    }
                }
                Opcode::ListGetItem => {
                    let index = self.pop();
                    let item = match self.resolve_list_index(rt, operand, &index, 0, false) {
                        ListIndex::At(i) => self.read_list(rt, operand, |list| {
                            list.get(i).cloned().unwrap_or_default()
                        }),
                        _ => Value::default(),
                    };
                    self.push(item);
                }
                Opcode::ListIndexOf => {
                    let item = self.pop();
                    let index = self.read_list(rt, operand, |list| {
                        list.index_of(&item).map(|i| i + 1).unwrap_or(0)
                    });
                    self.push(index);
                }
                Opcode::ListLength => {
                    let length = self.read_list(rt, operand, List::len);
                    self.push(length);
                }
                Opcode::ListContains => {
                    let item = self.pop();
                    let contains = self.read_list(rt, operand, |list| list.contains(&item));
                    self.push(contains);
                }
                Opcode::StrConcat => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(format!("{a}{b}"));
                }
                Opcode::StrAt => {
                    let index = self.pop().to_number() - 1.;
                    let string = self.pop().to_string();
                    let letter = if index >= 0. {
                        string.chars().nth(index.floor() as usize)
                    } else {
                        None
                    };
                    self.push(letter.map(String::from).unwrap_or_default());
                }
                Opcode::StrLength => {
                    let string = self.pop().to_string();
                    self.push(string.chars().count());
                }
                Opcode::StrContains => {
                    let needle = self.pop().to_string().to_lowercase();
                    let haystack = self.pop().to_string().to_lowercase();
                    self.push(haystack.contains(&needle));
                }
                Opcode::Exec => {
                    let function = script.tables().functions[operand];
                    let count = function(self, rt);
                    match mem::take(&mut self.suspend) {
                        Suspend::Retry if self.checkpoint.is_none() => {
                            self.ip = address;
                            self.state = VmState::Yielded;
                        }
                        suspend => {
                            self.pop_n(count);
                            if let Some(value) = self.return_value.take() {
                                self.push(value);
                            }
                            if suspend == Suspend::Retry {
                                self.ip = self.checkpoint.unwrap_or(address);
                            }
                            if suspend != Suspend::None && self.state == VmState::Running {
                                self.state = VmState::Yielded;
                            }
                        }
                    }
                    if self.state != VmState::Finished
                        && self.promise.as_ref().is_some_and(Promise::is_pending)
                    {
                        self.state = VmState::AwaitingPromise;
                    }
                }
                Opcode::InitProcedure => self.pending_args.push(Vec::new()),
                Opcode::AddArg => {
                    let value = self.pop();
                    if let Some(args) = self.pending_args.last_mut() {
                        args.push(value);
                    }
                }
                Opcode::CallProcedure => {
                    let args = self.pending_args.pop().unwrap_or_default();
                    if script.code(Blob::Procedure(operand)).is_some() {
                        let blob = Blob::Procedure(operand);
                        let recursive = self.calls.iter().any(|frame| frame.blob == blob);
                        self.calls.push(CallFrame {
                            blob,
                            return_ip: self.ip,
                            args,
                            warp: false,
                            loop_base: self.loops.len(),
                        });
                        self.ip = 0;
                        if recursive && self.warp_depth == 0 {
                            self.state = VmState::Yielded;
                        }
                    }
                }
                Opcode::ReadArg => {
                    let value = self
                        .calls
                        .last()
                        .and_then(|frame| frame.args.get(operand))
                        .cloned()
                        .unwrap_or(Value::Number(0.));
                    self.push(value);
                }
                Opcode::BreakFrame => {
                    if self.warp_depth == 0 {
                        self.state = VmState::Yielded;
                    }
                }
                Opcode::Warp => {
                    if let Some(frame) = self.calls.last_mut() {
                        if !frame.warp {
                            frame.warp = true;
                            self.warp_depth += 1;
                        }
                    }
                }
            }
        }
    }

    fn read_list<T: Default>(
        &self,
        rt: &Runtime,
        index: usize,
        read: impl FnOnce(&List) -> T,
    ) -> T {
        self.lists
            .get(index)
            .and_then(|&slot| rt.targets.list(slot))
            .map(read)
            .unwrap_or_default()
    }

    fn write_list(&self, rt: &mut Runtime, index: usize, write: impl FnOnce(&mut List)) {
        if let Some(list) = self.lists.get(index).and_then(|&slot| rt.targets.list_mut(slot)) {
            write(list);
        }
    }

    fn resolve_list_index(
        &self,
        rt: &mut Runtime,
        list: usize,
        index: &Value,
        extra: usize,
        accept_all: bool,
    ) -> ListIndex {
        let length = self.read_list(rt, list, List::len) + extra;
        List::resolve_index(index, length, accept_all, || rt.host.random())
    }
}

/// `Math.round`: halves round towards positive infinity.
pub fn js_round(n: f64) -> f64 {
    (n + 0.5).floor()
}

/// `pick random`: integer bounds give an integer, anything else a float.
pub fn random_between(from: &Value, to: &Value, random: f64) -> Value {
    let a = from.to_number();
    let b = to.to_number();
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if low == high {
        return Value::Number(low);
    }
    if from.is_int() && to.is_int() {
        Value::Number(low + (random * (high + 1. - low)).floor())
    } else {
        Value::Number(random * (high - low) + low)
    }
}

fn math_op(opcode: Opcode, n: f64) -> f64 {
    let rounded = |x: f64| (x * 1e10).round() / 1e10;
    match opcode {
        Opcode::Round => js_round(n),
        Opcode::Abs => n.abs(),
        Opcode::Floor => n.floor(),
        Opcode::Ceil => n.ceil(),
        Opcode::Sqrt => n.sqrt(),
        Opcode::Sin => rounded((PI * n / 180.).sin()),
        Opcode::Cos => rounded((PI * n / 180.).cos()),
        Opcode::Tan => {
            let angle = n % 360.;
            match angle {
                a if a == -270. || a == 90. => f64::INFINITY,
                a if a == -90. || a == 270. => f64::NEG_INFINITY,
                _ => rounded((PI * angle / 180.).tan()),
            }
        }
        Opcode::Asin => n.asin() * 180. / PI,
        Opcode::Acos => n.acos() * 180. / PI,
        Opcode::Atan => n.atan() * 180. / PI,
        _ => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_like_javascript() {
        assert_eq!(js_round(2.5), 3.);
        assert_eq!(js_round(-2.5), -2.);
        assert_eq!(js_round(0.4), 0.);
    }

    #[test]
    fn trigonometry_in_degrees() {
        assert_eq!(math_op(Opcode::Sin, 30.), 0.5);
        assert_eq!(math_op(Opcode::Cos, 90.), 0.);
        assert_eq!(math_op(Opcode::Tan, 90.), f64::INFINITY);
        assert_eq!(math_op(Opcode::Tan, -90.), f64::NEG_INFINITY);
        assert_eq!(math_op(Opcode::Tan, 45.), 1.);
        assert_eq!(math_op(Opcode::Asin, 1.), 90.);
    }

    #[test]
    fn random_respects_integer_bounds() {
        assert_eq!(random_between(&Value::from(1), &Value::from(10), 0.999), Value::from(10));
        assert_eq!(random_between(&Value::from(10), &Value::from(1), 0.), Value::from(1));
        assert_eq!(random_between(&Value::from("1.0"), &Value::from(2), 0.5), Value::from(1.5));
        assert_eq!(random_between(&Value::from(3), &Value::from(3), 0.7), Value::from(3));
    }
}
