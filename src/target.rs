use std::rc::Rc;

use log::debug;

use crate::block::BlockMap;
use crate::list::List;
use crate::value::Value;

/// Index into [`Targets`] plus the generation of the slot it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId {
    index: usize,
    generation: u32,
}

impl TargetId {
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub value: Value,
    pub is_cloud: bool,
}

impl Variable {
    pub fn new(id: &str, name: &str, value: impl Into<Value>) -> Variable {
        Variable {
            id: id.to_string(),
            name: name.to_string(),
            value: value.into(),
            is_cloud: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleKind {
    Say,
    Think,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bubble {
    pub kind: BubbleKind,
    pub text: String,
}

/// The stage, a sprite, or a clone of a sprite.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub is_stage: bool,
    pub blocks: Rc<BlockMap>,
    pub variables: Vec<Variable>,
    pub lists: Vec<List>,
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub direction: f64,
    pub bubble: Option<Bubble>,
    /// For clones, the original sprite whose scripts they run.
    pub clone_of: Option<TargetId>,
}

impl Target {
    pub fn new(name: &str, is_stage: bool) -> Target {
        Target {
            name: name.to_string(),
            is_stage,
            blocks: Rc::new(BlockMap::new()),
            variables: Vec::new(),
            lists: Vec::new(),
            visible: !is_stage,
            x: 0.,
            y: 0.,
            size: 100.,
            direction: 90.,
            bubble: None,
            clone_of: None,
        }
    }

    pub fn is_clone(&self) -> bool {
        self.clone_of.is_some()
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn list_by_name(&self, name: &str) -> Option<&List> {
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn say(&mut self, kind: BubbleKind, text: String) {
        self.bubble = if text.is_empty() {
            None
        } else {
            Some(Bubble { kind, text })
        };
    }

    pub fn bubble_text(&self) -> &str {
        self.bubble.as_ref().map(|b| b.text.as_str()).unwrap_or("")
    }

    pub fn set_direction(&mut self, direction: f64) {
        if direction.is_finite() {
            self.direction = (direction + 179.).rem_euclid(360.) - 179.;
        }
    }

    /// Copies variables, lists and sprite state for a new clone.
    pub fn make_clone(&self, root: TargetId) -> Target {
        Target {
            bubble: None,
            clone_of: Some(root),
            ..self.clone()
        }
    }
}

/// Resolved location of a variable or list: owning target and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub target: TargetId,
    pub index: usize,
}

#[derive(Debug, Default)]
struct Entry {
    generation: u32,
    target: Option<Target>,
}

/// Arena of targets. Freed slots are reused, and each reuse bumps the slot's
/// generation so ids of deleted clones resolve to nothing.
#[derive(Debug, Default)]
pub struct Targets {
    entries: Vec<Entry>,
    free: Vec<usize>,
}

impl Targets {
    pub fn insert(&mut self, target: Target) -> TargetId {
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index];
            entry.target = Some(target);
            return TargetId {
                index,
                generation: entry.generation,
            };
        }
        self.entries.push(Entry {
            generation: 0,
            target: Some(target),
        });
        TargetId {
            index: self.entries.len() - 1,
            generation: 0,
        }
    }

    pub fn remove(&mut self, id: TargetId) -> Option<Target> {
        let entry = self
            .entries
            .get_mut(id.index)
            .filter(|e| e.generation == id.generation)?;
        let target = entry.target.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(target)
    }

    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.entries
            .get(id.index)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.target.as_ref())
    }

    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut Target> {
        self.entries
            .get_mut(id.index)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.target.as_mut())
    }

    /// Number of slots, live or free.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetId, &Target)> {
        self.entries.iter().enumerate().filter_map(|(index, e)| {
            let id = TargetId {
                index,
                generation: e.generation,
            };
            e.target.as_ref().map(|t| (id, t))
        })
    }

    pub fn ids(&self) -> Vec<TargetId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stage_id(&self) -> Option<TargetId> {
        self.iter().find(|(_, t)| t.is_stage).map(|(id, _)| id)
    }

    /// Finds an original (non-clone) target by name. `_stage_` names the stage.
    pub fn find(&self, name: &str) -> Option<TargetId> {
        if name == "_stage_" {
            return self.stage_id();
        }
        self.iter()
            .find(|(_, t)| !t.is_clone() && t.name == name)
            .map(|(id, _)| id)
    }

    /// The n-th live target, stage first.
    pub fn at(&self, index: usize) -> Option<TargetId> {
        self.iter().nth(index).map(|(id, _)| id)
    }

    pub fn clone_count(&self) -> usize {
        self.iter().filter(|(_, t)| t.is_clone()).count()
    }

    pub fn variable(&self, slot: Slot) -> Option<&Variable> {
        self.get(slot.target)?.variables.get(slot.index)
    }

    pub fn variable_mut(&mut self, slot: Slot) -> Option<&mut Variable> {
        self.get_mut(slot.target)?.variables.get_mut(slot.index)
    }

    pub fn list(&self, slot: Slot) -> Option<&List> {
        self.get(slot.target)?.lists.get(slot.index)
    }

    pub fn list_mut(&mut self, slot: Slot) -> Option<&mut List> {
        self.get_mut(slot.target)?.lists.get_mut(slot.index)
    }

    /// Finds a variable for `target`: its own first, then the stage's. A
    /// variable that exists nowhere is created on the target.
    pub fn resolve_variable(&mut self, target: TargetId, id: &str, name: &str) -> Slot {
        let stage = self.stage_id();
        for owner in [Some(target), stage].into_iter().flatten() {
            if let Some(t) = self.get(owner) {
                if let Some(index) = t.variables.iter().position(|v| v.id == id) {
                    return Slot { target: owner, index };
                }
            }
        }
        let owner = if self.get(target).is_some() {
            target
        } else {
            stage.unwrap_or(target)
        };
        let index = match self.get_mut(owner) {
            Some(t) => {
                debug!("creating missing variable {name:?} on {:?}", t.name);
                t.variables.push(Variable::new(id, name, 0));
                t.variables.len() - 1
            }
            None => 0,
        };
        Slot { target: owner, index }
    }

    pub fn resolve_list(&mut self, target: TargetId, id: &str, name: &str) -> Slot {
        let stage = self.stage_id();
        for owner in [Some(target), stage].into_iter().flatten() {
            if let Some(t) = self.get(owner) {
                if let Some(index) = t.lists.iter().position(|l| l.id == id) {
                    return Slot { target: owner, index };
                }
            }
        }
        let owner = if self.get(target).is_some() {
            target
        } else {
            stage.unwrap_or(target)
        };
        let index = match self.get_mut(owner) {
            Some(t) => {
                debug!("creating missing list {name:?} on {:?}", t.name);
                t.lists.push(List::new(id, name));
                t.lists.len() - 1
            }
            None => 0,
        };
        Slot { target: owner, index }
    }
}
