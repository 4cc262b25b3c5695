mod common;

use common::{flag_script, print_block, print_next, print_reporter, project, project_with};
use serde_json::{json, Value as Json};

fn ask_then_print_answer() -> Json {
    flag_script(json!({
        "body": {
            "opcode": "sensing_askandwait", "next": "print",
            "inputs": {"QUESTION": [1, [10, "test"]]}
        },
        "print": print_reporter("answer"),
        "answer": {"opcode": "sensing_answer"}
    }))
}

fn bubble(target: &str, text: Option<&str>) -> (String, Option<String>) {
    (target.to_string(), text.map(str::to_string))
}

#[test]
fn visible_sprite_asks_through_its_bubble() {
    let mut p = project(json!({}), ask_then_print_answer());
    p.engine.start();
    p.engine.run_frames(3);
    assert_eq!(p.engine.pending_question(), Some("test"));
    assert!(p.prints().is_empty());
    p.engine.answer_question("hello");
    assert_eq!(p.engine.pending_question(), None);
    p.engine.step();
    assert_eq!(p.prints(), vec!["hello"]);
    let log = p.log.borrow();
    assert_eq!(log.questions, vec![""]);
    assert_eq!(
        log.bubbles,
        vec![bubble("Sprite1", Some("test")), bubble("Sprite1", None)]
    );
}

#[test]
fn hidden_sprite_shows_the_question_text() {
    let mut p = project_with(json!({}), ask_then_print_answer(), false);
    p.engine.start();
    p.engine.step();
    p.engine.answer_question("42");
    p.engine.step();
    assert_eq!(p.prints(), vec!["42"]);
    let log = p.log.borrow();
    assert_eq!(log.questions, vec!["test"]);
    assert!(log.bubbles.is_empty());
}

#[test]
fn stopping_aborts_the_question_and_clears_the_bubble() {
    let mut p = project(json!({}), ask_then_print_answer());
    p.engine.start();
    p.engine.step();
    let sprite = p.sprite;
    if let Some(target) = p.engine.runtime_mut().targets.get_mut(sprite) {
        target.visible = false;
    }
    p.engine.stop();
    assert_eq!(p.engine.pending_question(), None);
    let log = p.log.borrow();
    assert_eq!(log.aborted, 1);
    assert_eq!(
        log.bubbles,
        vec![bubble("Sprite1", Some("test")), bubble("Sprite1", None)]
    );
}

#[test]
fn stopping_a_question_asked_while_hidden_leaves_bubbles_alone() {
    let mut p = project_with(json!({}), ask_then_print_answer(), false);
    p.engine.start();
    p.engine.step();
    let sprite = p.sprite;
    if let Some(target) = p.engine.runtime_mut().targets.get_mut(sprite) {
        target.visible = true;
    }
    p.engine.stop();
    let log = p.log.borrow();
    assert_eq!(log.aborted, 1);
    assert!(log.bubbles.is_empty());
}

#[test]
fn questions_are_answered_in_order() {
    let mut p = project(
        json!({
            "flag": {"opcode": "event_whenflagclicked", "next": "ask", "topLevel": true},
            "ask": {
                "opcode": "sensing_askandwait", "next": "print",
                "inputs": {"QUESTION": [1, [10, "first"]]}
            },
            "print": print_reporter("answer"),
            "answer": {"opcode": "sensing_answer"}
        }),
        flag_script(json!({
            "body": {
                "opcode": "sensing_askandwait", "next": "print",
                "inputs": {"QUESTION": [1, [10, "second"]]}
            },
            "print": print_reporter("answer"),
            "answer": {"opcode": "sensing_answer"}
        })),
    );
    p.engine.start();
    p.engine.step();
    assert_eq!(p.engine.pending_question(), Some("first"));
    p.engine.answer_question("a");
    assert_eq!(p.engine.pending_question(), Some("second"));
    p.engine.step();
    p.engine.answer_question("b");
    p.engine.step();
    assert_eq!(p.prints(), vec!["a", "b"]);
    assert_eq!(p.log.borrow().questions, vec!["first", ""]);
}

#[test]
fn timer_counts_from_the_green_flag() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "control_wait",
                "next": "print", "inputs": {"DURATION": [1, [5, "1"]]}
            },
            "print": print_next("waited", "timer"),
            "timer": print_reporter("t"),
            "t": {"opcode": "sensing_timer"}
        })),
    );
    p.set_time(10.);
    p.engine.start();
    p.engine.step();
    p.set_time(11.5);
    p.engine.step();
    assert_eq!(p.prints(), vec!["waited", "1.5"]);
}

#[test]
fn of_reads_sprite_attributes_and_variables() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": print_next("start", "p2"),
            "p2": {"opcode": "test_print", "next": "p3", "inputs": {"STRING": [3, "x", [10, ""]]}},
            "x": {
                "opcode": "sensing_of",
                "inputs": {"OBJECT": [1, "spritemenu"]},
                "fields": {"PROPERTY": ["x position", null]}
            },
            "spritemenu": {
                "opcode": "sensing_of_object_menu", "shadow": true,
                "fields": {"OBJECT": ["Sprite1", null]}
            },
            "p3": print_reporter("global"),
            "global": {
                "opcode": "sensing_of",
                "inputs": {"OBJECT": [1, "stagemenu"]},
                "fields": {"PROPERTY": ["global", null]}
            },
            "stagemenu": {
                "opcode": "sensing_of_object_menu", "shadow": true,
                "fields": {"OBJECT": ["_stage_", null]}
            }
        })),
    );
    let sprite = p.sprite;
    if let Some(target) = p.engine.runtime_mut().targets.get_mut(sprite) {
        target.x = 12.5;
    }
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["start", "12.5", "0"]);
}

#[test]
fn say_sets_and_clears_the_bubble() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "looks_sayforsecs", "next": "done",
                "inputs": {"MESSAGE": [1, [10, "hi"]], "SECS": [1, [4, "2"]]}
            },
            "done": print_block("done")
        })),
    );
    p.engine.start();
    p.engine.step();
    assert_eq!(p.engine.target(p.sprite).map(|t| t.bubble_text()), Some("hi"));
    p.set_time(2.);
    p.engine.step();
    assert_eq!(p.prints(), vec!["done"]);
    assert_eq!(
        p.log.borrow().bubbles,
        vec![bubble("Sprite1", Some("hi")), bubble("Sprite1", None)]
    );
}
