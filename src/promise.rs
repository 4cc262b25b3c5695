use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Resolved,
    Cancelled,
}

/// Handle to an external event a thread is suspended on. Clones share state,
/// so the engine keeps one copy and the suspended VM another.
#[derive(Debug, Clone)]
pub struct Promise {
    state: Rc<Cell<PromiseState>>,
}

impl Default for Promise {
    fn default() -> Self {
        Promise::new()
    }
}

impl Promise {
    pub fn new() -> Promise {
        Promise {
            state: Rc::new(Cell::new(PromiseState::Pending)),
        }
    }

    pub fn state(&self) -> PromiseState {
        self.state.get()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    pub fn is_resolved(&self) -> bool {
        self.state() == PromiseState::Resolved
    }

    /// Resolving a cancelled promise has no effect.
    pub fn resolve(&self) {
        if self.is_pending() {
            self.state.set(PromiseState::Resolved);
        }
    }

    pub fn cancel(&self) {
        if self.is_pending() {
            self.state.set(PromiseState::Cancelled);
        }
    }

    pub fn same(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}
