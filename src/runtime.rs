use std::collections::VecDeque;

use derivative::Derivative;
use log::debug;

use crate::host::Host;
use crate::project::Config;
use crate::promise::Promise;
use crate::target::{BubbleKind, TargetId, Targets};
use crate::thread::ThreadId;

/// Work a thread asks the engine to do once it has yielded.
#[derive(Debug, Clone)]
pub enum Request {
    Broadcast { name: String, promise: Option<Promise> },
    StartCloneHats(TargetId),
    KillThreadsOf(TargetId),
    StopAll,
    StopOtherScripts { target: TargetId, except: ThreadId },
}

#[derive(Debug, Clone)]
struct Question {
    text: String,
    target: TargetId,
    promise: Promise,
    was_visible: bool,
}

/// Pending ask-and-wait questions. Only the front question is shown.
#[derive(Debug, Default)]
pub struct QuestionQueue {
    questions: VecDeque<Question>,
    answer: String,
}

impl QuestionQueue {
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current(&self) -> Option<&str> {
        self.questions.front().map(|q| q.text.as_str())
    }
}

/// Everything a running thread can touch: targets, host services, the timer,
/// the question queue and the request queue drained by the engine.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Runtime {
    pub config: Config,
    pub targets: Targets,
    #[derivative(Debug = "ignore")]
    pub host: Box<dyn Host>,
    pub questions: QuestionQueue,
    timer_start: f64,
    requests: Vec<Request>,
    current_thread: ThreadId,
}

impl Runtime {
    pub fn new(config: Config, host: Box<dyn Host>) -> Runtime {
        let timer_start = host.now();
        Runtime {
            config,
            targets: Targets::default(),
            host,
            questions: QuestionQueue::default(),
            timer_start,
            requests: Vec::new(),
            current_thread: ThreadId(0),
        }
    }

    pub fn stage_width(&self) -> u32 {
        self.config.stage_width
    }

    pub fn stage_height(&self) -> u32 {
        self.config.stage_height
    }

    pub fn clone_limit(&self) -> usize {
        self.config.clone_limit
    }

    pub fn clone_count(&self) -> usize {
        self.targets.clone_count()
    }

    pub fn mouse_x(&self) -> f64 {
        self.host.mouse_x()
    }

    pub fn mouse_y(&self) -> f64 {
        self.host.mouse_y()
    }

    pub fn find_target(&self, name: &str) -> Option<TargetId> {
        self.targets.find(name)
    }

    pub fn target_at(&self, index: usize) -> Option<TargetId> {
        self.targets.at(index)
    }

    pub fn timer(&self) -> f64 {
        self.host.now() - self.timer_start
    }

    pub fn reset_timer(&mut self) {
        self.timer_start = self.host.now();
    }

    pub fn current_thread(&self) -> ThreadId {
        self.current_thread
    }

    pub(crate) fn set_current_thread(&mut self, id: ThreadId) {
        self.current_thread = id;
    }

    pub fn request(&mut self, request: Request) {
        self.requests.push(request);
    }

    pub(crate) fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    /// Queues a broadcast. With a promise, the promise resolves once every
    /// receiving thread has finished.
    pub fn broadcast(&mut self, name: &str, promise: Option<Promise>) {
        self.request(Request::Broadcast {
            name: name.to_string(),
            promise,
        });
    }

    /// Clones `source`, unless it is the stage or the clone limit is reached.
    pub fn init_clone(&mut self, source: TargetId) -> Option<TargetId> {
        if self.clone_count() >= self.clone_limit() {
            debug!("clone limit reached");
            return None;
        }
        let original = self.targets.get(source)?;
        if original.is_stage {
            return None;
        }
        let root = original.clone_of.unwrap_or(source);
        let clone = original.make_clone(root);
        let id = self.targets.insert(clone);
        debug!("created clone {id:?} of {source:?}");
        self.request(Request::StartCloneHats(id));
        Some(id)
    }

    /// Deletes a clone and asks the engine to kill its threads. Originals are
    /// left alone.
    pub fn deinit_clone(&mut self, id: TargetId) {
        if !self.targets.get(id).is_some_and(|t| t.is_clone()) {
            return;
        }
        if let Some(clone) = self.targets.remove(id) {
            if clone.bubble.is_some() {
                self.host.bubble_changed(&clone.name, None);
            }
        }
        debug!("deleted clone {id:?}");
        self.request(Request::KillThreadsOf(id));
    }

    pub fn set_bubble(&mut self, target: TargetId, kind: BubbleKind, text: String) {
        if let Some(t) = self.targets.get_mut(target) {
            t.say(kind, text);
            self.host.bubble_changed(&t.name, t.bubble.as_ref());
        }
    }

    /// Queues a question for `target`; the promise resolves when answered.
    pub fn ask(&mut self, target: TargetId, text: String, promise: Promise) {
        let was_visible = self
            .targets
            .get(target)
            .is_some_and(|t| t.visible && !t.is_stage);
        self.questions.questions.push_back(Question {
            text,
            target,
            promise,
            was_visible,
        });
        if self.questions.len() == 1 {
            self.ask_next_question();
        }
    }

    fn ask_next_question(&mut self) {
        let Some(question) = self.questions.questions.front().cloned() else {
            return;
        };
        debug!("asking {:?}", question.text);
        if question.was_visible {
            self.set_bubble(question.target, BubbleKind::Say, question.text);
            self.host.question_asked("");
        } else {
            self.host.question_asked(&question.text);
        }
    }

    /// Answers the front question and shows the next one.
    pub fn answer_question(&mut self, answer: &str) {
        self.questions.answer = answer.to_string();
        let Some(question) = self.questions.questions.pop_front() else {
            return;
        };
        debug!("answered {:?} with {answer:?}", question.text);
        if question.was_visible {
            self.set_bubble(question.target, BubbleKind::Say, String::new());
        }
        question.promise.resolve();
        self.ask_next_question();
    }

    /// Releases whatever a killed thread was waiting on. An active question is
    /// aborted; the bubble is cleared only if the sprite was visible when asked.
    pub fn abort_promise(&mut self, promise: &Promise) {
        let Some(position) = self
            .questions
            .questions
            .iter()
            .position(|q| q.promise.same(promise))
        else {
            return;
        };
        let Some(question) = self.questions.questions.remove(position) else {
            return;
        };
        if position == 0 {
            debug!("question {:?} aborted", question.text);
            if question.was_visible {
                self.set_bubble(question.target, BubbleKind::Say, String::new());
            }
            self.host.question_aborted();
            self.ask_next_question();
        }
    }
}
