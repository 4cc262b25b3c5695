use std::time::Instant;

use log::info;

use crate::target::Bubble;

/// Services the runtime needs from its embedder: output, time, randomness
/// and input devices. One host is owned by each engine.
pub trait Host {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    /// Monotonic time in seconds.
    fn now(&self) -> f64;

    /// Uniform random number in `[0, 1)`.
    fn random(&mut self) -> f64;

    fn mouse_x(&self) -> f64 {
        0.
    }

    fn mouse_y(&self) -> f64 {
        0.
    }

    fn mouse_down(&self) -> bool {
        false
    }

    fn key_pressed(&self, _key: &str) -> bool {
        false
    }

    /// Microphone loudness, or -1 when unavailable.
    fn loudness(&self) -> f64 {
        -1.
    }

    fn question_asked(&mut self, _question: &str) {}

    fn question_aborted(&mut self) {}

    fn bubble_changed(&mut self, _target: &str, _bubble: Option<&Bubble>) {}
}

#[derive(Debug)]
pub struct StdHost {
    start: Instant,
}

impl Default for StdHost {
    fn default() -> Self {
        StdHost {
            start: Instant::now(),
        }
    }
}

impl Host for StdHost {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    fn random(&mut self) -> f64 {
        fastrand::f64()
    }

    fn question_asked(&mut self, question: &str) {
        if !question.is_empty() {
            println!("? {question}");
        }
    }

    fn bubble_changed(&mut self, target: &str, bubble: Option<&Bubble>) {
        match bubble {
            Some(bubble) => println!("{target}: {}", bubble.text),
            None => info!("{target}: bubble cleared"),
        }
    }
}
