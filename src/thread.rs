use std::rc::Rc;

use log::debug;

use crate::promise::Promise;
use crate::runtime::Runtime;
use crate::script::{Blob, Script};
use crate::target::TargetId;
use crate::value::Value;
use crate::vm::{VirtualMachine, VmState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

// Predicates and reporters never contain loops, but a malformed one must
// still terminate.
const MAX_PASSES: usize = 1024;

/// One script running on one target.
#[derive(Debug)]
pub struct Thread {
    id: ThreadId,
    vm: VirtualMachine,
}

impl Thread {
    pub fn new(id: ThreadId, script: Rc<Script>, target: TargetId, rt: &mut Runtime) -> Thread {
        Thread {
            id,
            vm: VirtualMachine::new(script, target, rt),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn target(&self) -> TargetId {
        self.vm.target()
    }

    pub fn script(&self) -> &Rc<Script> {
        self.vm.script()
    }

    pub fn vm(&self) -> &VirtualMachine {
        &self.vm
    }

    /// Advances until the next yield point.
    pub fn run(&mut self, rt: &mut Runtime) {
        rt.set_current_thread(self.id);
        self.vm.run(rt);
    }

    /// Evaluates the script's hat predicate. The main body is left finished
    /// and must be restarted before running.
    pub fn run_predicate(&mut self, rt: &mut Runtime) -> bool {
        if self.script().hat_predicate().is_none() {
            return false;
        }
        self.run_to_end(rt, Blob::HatPredicate)
            .is_some_and(|v| v.to_bool())
    }

    /// Evaluates a script compiled as a reporter.
    pub fn run_reporter(&mut self, rt: &mut Runtime) -> Value {
        self.run_to_end(rt, Blob::Main).unwrap_or_default()
    }

    fn run_to_end(&mut self, rt: &mut Runtime, entry: Blob) -> Option<Value> {
        self.vm.reset(entry);
        rt.set_current_thread(self.id);
        for _ in 0..MAX_PASSES {
            self.vm.run(rt);
            if self.vm.state() != VmState::Yielded {
                break;
            }
        }
        let result = self.vm.is_finished().then(|| self.vm.result().cloned()).flatten();
        self.vm.finish();
        result
    }

    /// Stops the thread, releasing a pending promise first.
    pub fn kill(&mut self, rt: &mut Runtime) {
        self.release_promise(rt);
        self.vm.finish();
    }

    pub fn restart(&mut self, rt: &mut Runtime) {
        debug!("restarting thread {:?}", self.id);
        self.release_promise(rt);
        self.vm.reset(Blob::Main);
    }

    fn release_promise(&mut self, rt: &mut Runtime) {
        if let Some(promise) = self.vm.promise().cloned() {
            if promise.is_pending() {
                promise.cancel();
                rt.abort_promise(&promise);
            }
        }
    }

    pub fn promise(&self) -> Option<&Promise> {
        self.vm.promise().filter(|p| p.is_pending())
    }

    pub fn is_finished(&self) -> bool {
        self.vm.is_finished()
    }
}
