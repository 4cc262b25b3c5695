#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rustphorus_vm::registry::{BlockRegistry, BlockSection};
use rustphorus_vm::runtime::Runtime;
use rustphorus_vm::target::{Bubble, TargetId};
use rustphorus_vm::vm::VirtualMachine;
use rustphorus_vm::{Compiler, Config, Engine, Host};
use serde_json::{json, Value as Json};

/// Everything the engine told the host, plus the clock and random source
/// the test controls.
#[derive(Debug, Default)]
pub struct HostLog {
    pub prints: Vec<String>,
    pub questions: Vec<String>,
    pub aborted: usize,
    pub bubbles: Vec<(String, Option<String>)>,
    pub now: f64,
    pub random: f64,
}

pub struct RecordingHost(pub Rc<RefCell<HostLog>>);

impl Host for RecordingHost {
    fn print(&mut self, text: &str) {
        self.0.borrow_mut().prints.push(text.to_string());
    }

    fn now(&self) -> f64 {
        self.0.borrow().now
    }

    fn random(&mut self) -> f64 {
        self.0.borrow().random
    }

    fn question_asked(&mut self, question: &str) {
        self.0.borrow_mut().questions.push(question.to_string());
    }

    fn question_aborted(&mut self) {
        self.0.borrow_mut().aborted += 1;
    }

    fn bubble_changed(&mut self, target: &str, bubble: Option<&Bubble>) {
        self.0
            .borrow_mut()
            .bubbles
            .push((target.to_string(), bubble.map(|b| b.text.clone())));
    }
}

/// Adds `test_print`, which prints its `STRING` input through the host.
pub struct TestBlocks;

impl BlockSection for TestBlocks {
    fn name(&self) -> &str {
        "Test"
    }

    fn register_blocks(&self, registry: &mut BlockRegistry) {
        registry.add_compile_function("test_print", compile_print);
    }
}

fn compile_print(compiler: &mut Compiler) {
    compiler.add_input("STRING");
    compiler.add_function_call(print);
}

fn print(vm: &mut VirtualMachine, rt: &mut Runtime) -> usize {
    let text = vm.input(0, 1).to_string();
    rt.host.print(&text);
    1
}

pub struct Project {
    pub engine: Engine,
    pub log: Rc<RefCell<HostLog>>,
    pub stage: TargetId,
    pub sprite: TargetId,
}

impl Project {
    pub fn prints(&self) -> Vec<String> {
        self.log.borrow().prints.clone()
    }

    pub fn variable(&self, name: &str) -> f64 {
        self.engine
            .variable(self.sprite, name)
            .map(|v| v.to_double())
            .unwrap_or(f64::NAN)
    }

    pub fn set_time(&self, now: f64) {
        self.log.borrow_mut().now = now;
    }
}

/// A stage and one sprite `Sprite1` owning the variable `var` (id `vid`)
/// and the list `list` (id `lid`).
pub fn project(stage_blocks: Json, sprite_blocks: Json) -> Project {
    project_with(stage_blocks, sprite_blocks, true)
}

pub fn project_with(stage_blocks: Json, sprite_blocks: Json, visible: bool) -> Project {
    let json = json!({
        "targets": [
            {
                "isStage": true, "name": "Stage",
                "variables": {"gid": ["global", 0]},
                "lists": {},
                "blocks": stage_blocks
            },
            {
                "isStage": false, "name": "Sprite1", "visible": visible,
                "variables": {"vid": ["var", 0]},
                "lists": {"lid": ["list", []]},
                "blocks": sprite_blocks
            }
        ]
    });
    let log = Rc::new(RefCell::new(HostLog::default()));
    let mut engine = Engine::new(Config::default(), Box::new(RecordingHost(Rc::clone(&log))));
    engine.register_section(&TestBlocks);
    engine.load_json(&json.to_string()).unwrap();
    let stage = engine.find_target("_stage_").unwrap();
    let sprite = engine.find_target("Sprite1").unwrap();
    Project {
        engine,
        log,
        stage,
        sprite,
    }
}

/// Sprite blocks: a green flag hat followed by `body`, whose first block
/// must have the id `body`.
pub fn flag_script(mut body: Json) -> Json {
    body["flag"] = json!({"opcode": "event_whenflagclicked", "next": "body", "topLevel": true});
    body
}

pub fn print_block(text: &str) -> Json {
    json!({"opcode": "test_print", "inputs": {"STRING": [1, [10, text]]}})
}

pub fn print_next(text: &str, next: &str) -> Json {
    json!({"opcode": "test_print", "next": next, "inputs": {"STRING": [1, [10, text]]}})
}

/// `test_print` whose input is the reporter block `reporter`.
pub fn print_reporter(reporter: &str) -> Json {
    json!({"opcode": "test_print", "inputs": {"STRING": [3, reporter, [10, ""]]}})
}

pub fn variable_field() -> Json {
    json!({"VARIABLE": ["var", "vid"]})
}
