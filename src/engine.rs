use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use log::{debug, info};

use crate::block::{Block, BlockMap};
use crate::compiler::{CodeType, Compiler};
use crate::error::LoadError;
use crate::host::Host;
use crate::project::{parse_targets, Config};
use crate::promise::Promise;
use crate::registry::{BlockRegistry, BlockSection};
use crate::runtime::{Request, Runtime};
use crate::script::Script;
use crate::target::{BubbleKind, Target, TargetId};
use crate::thread::{Thread, ThreadId};
use crate::value::Value;

/// What starts a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HatKind {
    GreenFlag,
    /// Lowercased broadcast name.
    Broadcast(String),
    CloneStart,
    KeyPressed(String),
    SpriteClicked,
    StageClicked,
    /// Started when its predicate turns from false to true.
    Edge,
}

impl HatKind {
    fn from_block(block: &Block) -> HatKind {
        let field = |name: &str| {
            block
                .field(name)
                .map(|f| f.value.to_string())
                .unwrap_or_default()
        };
        match block.opcode.as_str() {
            "event_whenflagclicked" => HatKind::GreenFlag,
            "event_whenbroadcastreceived" => {
                HatKind::Broadcast(field("BROADCAST_OPTION").to_lowercase())
            }
            "control_start_as_clone" => HatKind::CloneStart,
            "event_whenkeypressed" => HatKind::KeyPressed(field("KEY_OPTION")),
            "event_whenthisspriteclicked" => HatKind::SpriteClicked,
            "event_whenstageclicked" => HatKind::StageClicked,
            _ => HatKind::Edge,
        }
    }
}

#[derive(Debug)]
struct ScriptEntry {
    hat: HatKind,
    /// The original target the script belongs to; its clones run it too.
    target: TargetId,
    script: Rc<Script>,
}

#[derive(Debug)]
struct EdgeHat {
    value: bool,
    thread: Thread,
}

#[derive(Debug)]
struct BroadcastWait {
    promise: Promise,
    receivers: Vec<ThreadId>,
}

/// Owns the targets, the compiled scripts and the running threads, and
/// steps them one frame at a time.
#[derive(Debug)]
pub struct Engine {
    rt: Runtime,
    registry: BlockRegistry,
    scripts: Vec<ScriptEntry>,
    threads: Vec<Thread>,
    next_thread: u64,
    edge_hats: HashMap<(usize, TargetId), EdgeHat>,
    broadcast_waits: Vec<BroadcastWait>,
    unsupported_blocks: BTreeSet<String>,
}

impl Engine {
    pub fn new(config: Config, host: Box<dyn Host>) -> Engine {
        Engine {
            rt: Runtime::new(config, host),
            registry: BlockRegistry::with_default_sections(),
            scripts: Vec::new(),
            threads: Vec::new(),
            next_thread: 0,
            edge_hats: HashMap::new(),
            broadcast_waits: Vec::new(),
            unsupported_blocks: BTreeSet::new(),
        }
    }

    /// Adds the targets of a `project.json` and compiles their scripts.
    pub fn load_json(&mut self, json: &str) -> Result<(), LoadError> {
        for target in parse_targets(json)? {
            self.add_target(target);
        }
        self.compile();
        Ok(())
    }

    pub fn add_target(&mut self, target: Target) -> TargetId {
        self.rt.targets.insert(target)
    }

    pub fn register_section(&mut self, section: &dyn BlockSection) {
        self.registry.register_section(section);
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    /// Compiles every hat script of every original target. Running threads are
    /// dropped.
    pub fn compile(&mut self) {
        self.stop();
        self.scripts.clear();
        self.edge_hats.clear();
        self.unsupported_blocks.clear();
        let targets: Vec<(TargetId, Rc<BlockMap>)> = self
            .rt
            .targets
            .iter()
            .filter(|(_, t)| !t.is_clone())
            .map(|(id, t)| (id, Rc::clone(&t.blocks)))
            .collect();
        for (target, blocks) in targets {
            let mut compiler = Compiler::new(&self.registry, Rc::clone(&blocks));
            for (id, block) in blocks.iter() {
                if block.top_level && block.opcode == "procedures_definition" {
                    compiler.compile(id, CodeType::Script);
                }
            }
            let mut compiled = Vec::new();
            for (id, block) in blocks.iter() {
                if !block.top_level || !self.registry.is_hat(&block.opcode) {
                    continue;
                }
                let bytecode = compiler.compile(id, CodeType::Script);
                let predicate = self
                    .registry
                    .hat_predicate(&block.opcode)
                    .map(|_| compiler.compile(id, CodeType::HatPredicate));
                compiled.push((HatKind::from_block(block), bytecode, predicate));
            }
            self.unsupported_blocks
                .extend(compiler.unsupported_blocks().iter().cloned());
            let tables = Rc::new(compiler.finish());
            for (hat, bytecode, predicate) in compiled {
                let mut script = Script::new(bytecode, Rc::clone(&tables));
                if let Some(predicate) = predicate {
                    script = script.with_hat_predicate(predicate);
                }
                self.scripts.push(ScriptEntry {
                    hat,
                    target,
                    script: Rc::new(script),
                });
            }
        }
        info!("compiled {} scripts", self.scripts.len());
    }

    pub fn unsupported_blocks(&self) -> &BTreeSet<String> {
        &self.unsupported_blocks
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.rt
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.rt.targets.get(id)
    }

    pub fn find_target(&self, name: &str) -> Option<TargetId> {
        self.rt.find_target(name)
    }

    pub fn target_at(&self, index: usize) -> Option<TargetId> {
        self.rt.target_at(index)
    }

    pub fn clone_count(&self) -> usize {
        self.rt.clone_count()
    }

    /// Current value of a target's variable, looked up by name.
    pub fn variable(&self, target: TargetId, name: &str) -> Option<&Value> {
        self.rt
            .targets
            .get(target)?
            .variable_by_name(name)
            .map(|v| &v.value)
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn is_running(&self) -> bool {
        self.threads.iter().any(|t| !t.is_finished())
    }

    /// Green flag: stops everything, then starts every flag script.
    pub fn start(&mut self) {
        self.stop();
        self.rt.reset_timer();
        self.start_hats(|hat| *hat == HatKind::GreenFlag, None, true);
    }

    /// Kills every thread, deletes all clones and clears speech bubbles.
    pub fn stop(&mut self) {
        for mut thread in std::mem::take(&mut self.threads) {
            thread.kill(&mut self.rt);
        }
        for wait in self.broadcast_waits.drain(..) {
            wait.promise.cancel();
        }
        for id in self.rt.targets.ids() {
            self.rt.deinit_clone(id);
        }
        let targets = &self.rt.targets;
        self.edge_hats.retain(|(_, t), _| targets.get(*t).is_some());
        for id in self.rt.targets.ids() {
            if self.rt.targets.get(id).is_some_and(|t| t.bubble.is_some()) {
                self.rt.set_bubble(id, BubbleKind::Say, String::new());
            }
        }
        self.rt.take_requests();
    }

    pub fn broadcast(&mut self, name: &str) {
        self.rt.broadcast(name, None);
        self.process_requests();
    }

    pub fn key_pressed(&mut self, key: &str) {
        self.start_hats(
            |hat| matches!(hat, HatKind::KeyPressed(k) if k == key || k == "any"),
            None,
            false,
        );
    }

    pub fn click_target(&mut self, id: TargetId) {
        let Some(target) = self.rt.targets.get(id) else {
            return;
        };
        let kind = if target.is_stage {
            HatKind::StageClicked
        } else {
            HatKind::SpriteClicked
        };
        self.start_hats(|hat| *hat == kind, Some(id), true);
    }

    pub fn answer_question(&mut self, answer: &str) {
        self.rt.answer_question(answer);
    }

    /// Text of the question currently shown, if any.
    pub fn pending_question(&self) -> Option<&str> {
        self.rt.questions.current()
    }

    /// Runs one frame.
    pub fn step(&mut self) {
        self.evaluate_edge_hats();
        let mut i = 0;
        while i < self.threads.len() {
            if !self.threads[i].is_finished() {
                self.threads[i].run(&mut self.rt);
            }
            self.process_requests();
            i += 1;
        }
        self.resolve_broadcast_waits();
        self.threads.retain(|t| !t.is_finished());
    }

    pub fn run_frames(&mut self, frames: usize) {
        for _ in 0..frames {
            self.step();
        }
    }

    /// Steps until no thread is left, or `max_frames` have run. Returns whether
    /// the engine went idle.
    pub fn run_until_idle(&mut self, max_frames: usize) -> bool {
        for _ in 0..max_frames {
            if !self.is_running() {
                return true;
            }
            self.step();
        }
        !self.is_running()
    }

    // Targets a script runs on: its original target and that target's clones.
    fn script_targets(&self, index: usize, only: Option<TargetId>) -> Vec<TargetId> {
        let root = self.scripts[index].target;
        self.rt
            .targets
            .iter()
            .filter(|(id, t)| *id == root || t.clone_of == Some(root))
            .map(|(id, _)| id)
            .filter(|id| only.map_or(true, |only| only == *id))
            .collect()
    }

    fn start_hats(
        &mut self,
        matches: impl Fn(&HatKind) -> bool,
        only: Option<TargetId>,
        restart: bool,
    ) -> Vec<ThreadId> {
        let mut started = Vec::new();
        for index in 0..self.scripts.len() {
            if !matches(&self.scripts[index].hat) {
                continue;
            }
            for target in self.script_targets(index, only) {
                if let Some(id) = self.start_script(index, target, restart) {
                    started.push(id);
                }
            }
        }
        started
    }

    // Restarts a live thread of the same script and target, or starts a new one.
    fn start_script(&mut self, index: usize, target: TargetId, restart: bool) -> Option<ThreadId> {
        let script = Rc::clone(&self.scripts[index].script);
        if let Some(thread) = self
            .threads
            .iter_mut()
            .find(|t| !t.is_finished() && t.target() == target && Rc::ptr_eq(t.script(), &script))
        {
            if !restart {
                return None;
            }
            thread.restart(&mut self.rt);
            return Some(thread.id());
        }
        let id = ThreadId(self.next_thread);
        self.next_thread += 1;
        debug!("starting thread {id:?} on {target:?}");
        let thread = Thread::new(id, script, target, &mut self.rt);
        self.threads.push(thread);
        Some(id)
    }

    fn evaluate_edge_hats(&mut self) {
        for index in 0..self.scripts.len() {
            if self.scripts[index].hat != HatKind::Edge {
                continue;
            }
            for target in self.script_targets(index, None) {
                let key = (index, target);
                if !self.edge_hats.contains_key(&key) {
                    let id = ThreadId(self.next_thread);
                    self.next_thread += 1;
                    let script = Rc::clone(&self.scripts[index].script);
                    let thread = Thread::new(id, script, target, &mut self.rt);
                    self.edge_hats.insert(key, EdgeHat { value: false, thread });
                }
                let Some(hat) = self.edge_hats.get_mut(&key) else {
                    continue;
                };
                let value = hat.thread.run_predicate(&mut self.rt);
                let previous = std::mem::replace(&mut hat.value, value);
                if value && !previous {
                    self.start_script(index, target, false);
                }
            }
        }
    }

    fn process_requests(&mut self) {
        loop {
            let requests = self.rt.take_requests();
            if requests.is_empty() {
                break;
            }
            for request in requests {
                match request {
                    Request::Broadcast { name, promise } => {
                        debug!("broadcast {name:?}");
                        let name = name.to_lowercase();
                        let receivers = self.start_hats(
                            |hat| matches!(hat, HatKind::Broadcast(n) if *n == name),
                            None,
                            true,
                        );
                        if let Some(promise) = promise {
                            self.broadcast_waits.push(BroadcastWait { promise, receivers });
                        }
                    }
                    Request::StartCloneHats(clone) => {
                        self.start_hats(|hat| *hat == HatKind::CloneStart, Some(clone), false);
                    }
                    Request::KillThreadsOf(target) => {
                        for thread in self.threads.iter_mut().filter(|t| t.target() == target) {
                            thread.kill(&mut self.rt);
                        }
                        self.edge_hats.retain(|(_, t), _| *t != target);
                    }
                    Request::StopAll => self.stop(),
                    Request::StopOtherScripts { target, except } => {
                        for thread in self
                            .threads
                            .iter_mut()
                            .filter(|t| t.target() == target && t.id() != except)
                        {
                            thread.kill(&mut self.rt);
                        }
                    }
                }
            }
        }
    }

    fn resolve_broadcast_waits(&mut self) {
        let threads = &self.threads;
        self.broadcast_waits.retain(|wait| {
            let done = wait.receivers.iter().all(|id| {
                threads
                    .iter()
                    .find(|t| t.id() == *id)
                    .map_or(true, Thread::is_finished)
            });
            if done {
                wait.promise.resolve();
            }
            !done && wait.promise.is_pending()
        });
    }
}
