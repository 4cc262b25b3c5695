mod common;

use common::{flag_script, print_block, project, variable_field};
use serde_json::json;

fn repeat_printing(times: serde_json::Value) -> common::Project {
    project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "control_repeat",
                "inputs": {"TIMES": [1, times], "SUBSTACK": [2, "print"]}
            },
            "print": print_block("x")
        })),
    )
}

#[test]
fn forever_prints_once_per_frame() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {"opcode": "control_forever", "inputs": {"SUBSTACK": [2, "print"]}},
            "print": print_block("hello")
        })),
    );
    p.engine.start();
    p.engine.step();
    p.engine.step();
    assert_eq!(p.prints(), vec!["hello", "hello"]);
    assert!(p.engine.is_running());
}

#[test]
fn repeat_changes_variable_ten_times() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "data_setvariableto", "next": "rep",
                "inputs": {"VALUE": [1, [10, "0"]]}, "fields": variable_field()
            },
            "rep": {
                "opcode": "control_repeat",
                "inputs": {"TIMES": [1, [6, "10"]], "SUBSTACK": [2, "chg"]}
            },
            "chg": {
                "opcode": "data_changevariableby",
                "inputs": {"VALUE": [1, [4, "1"]]}, "fields": variable_field()
            }
        })),
    );
    p.engine.start();
    p.engine.run_frames(3);
    assert_eq!(p.variable("var"), 3.);
    assert!(p.engine.run_until_idle(100));
    assert_eq!(p.variable("var"), 10.);
}

#[test]
fn repeat_counts_are_rounded() {
    for (times, expected) in [
        (json!([6, "0"]), 0),
        (json!([6, "-2"]), 0),
        (json!([6, "2.5"]), 3),
        (json!([6, "2.4"]), 2),
        (json!([10, "abc"]), 0),
        (json!([6, "4"]), 4),
    ] {
        let mut p = repeat_printing(times.clone());
        p.engine.start();
        assert!(p.engine.run_until_idle(100));
        assert_eq!(p.prints().len(), expected, "repeat {times}");
    }
}

#[test]
fn until_and_while_check_before_first_iteration() {
    for (opcode, condition) in [("control_repeat_until", "true"), ("control_while", "false")] {
        let mut p = project(
            json!({}),
            flag_script(json!({
                "body": {
                    "opcode": opcode,
                    "inputs": {"CONDITION": [1, [10, condition]], "SUBSTACK": [2, "print"]}
                },
                "print": print_block("x")
            })),
        );
        p.engine.start();
        assert!(p.engine.run_until_idle(10));
        assert!(p.prints().is_empty(), "{opcode}");
    }
}

#[test]
fn repeat_until_counts_up() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "control_repeat_until",
                "inputs": {"CONDITION": [2, "gt"], "SUBSTACK": [2, "chg"]}
            },
            "gt": {
                "opcode": "operator_gt",
                "inputs": {
                    "OPERAND1": [3, [12, "var", "vid"], [10, ""]],
                    "OPERAND2": [1, [10, "2"]]
                }
            },
            "chg": {
                "opcode": "data_changevariableby",
                "inputs": {"VALUE": [1, [4, "1"]]}, "fields": variable_field()
            }
        })),
    );
    p.engine.start();
    assert!(p.engine.run_until_idle(10));
    assert_eq!(p.variable("var"), 3.);
}

#[test]
fn for_each_counts_from_one() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "control_for_each",
                "inputs": {"VALUE": [1, [6, "2.2"]], "SUBSTACK": [2, "print"]},
                "fields": variable_field()
            },
            "print": {
                "opcode": "test_print",
                "inputs": {"STRING": [3, [12, "var", "vid"], [10, ""]]}
            }
        })),
    );
    p.engine.start();
    assert!(p.engine.run_until_idle(10));
    assert_eq!(p.prints(), vec!["1", "2", "3"]);
}

#[test]
fn if_else_takes_one_branch() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "control_if_else",
                "inputs": {"CONDITION": [2, "gt"], "SUBSTACK": [2, "a"], "SUBSTACK2": [2, "b"]}
            },
            "gt": {
                "opcode": "operator_gt",
                "inputs": {"OPERAND1": [1, [4, "1"]], "OPERAND2": [1, [4, "2"]]}
            },
            "a": print_block("a"),
            "b": print_block("b")
        })),
    );
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["b"]);
    assert!(!p.engine.is_running());
}

#[test]
fn wait_uses_the_host_clock() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "control_wait",
                "next": "print", "inputs": {"DURATION": [1, [5, "1.5"]]}
            },
            "print": print_block("done")
        })),
    );
    p.engine.start();
    p.engine.run_frames(3);
    assert!(p.prints().is_empty());
    p.set_time(1.);
    p.engine.step();
    assert!(p.prints().is_empty());
    p.set_time(1.5);
    p.engine.step();
    assert_eq!(p.prints(), vec!["done"]);
}

#[test]
fn wait_until_polls_each_frame() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "control_wait_until",
                "next": "print", "inputs": {"CONDITION": [2, "gt"]}
            },
            "gt": {
                "opcode": "operator_gt",
                "inputs": {
                    "OPERAND1": [3, [12, "var", "vid"], [10, ""]],
                    "OPERAND2": [1, [10, "0"]]
                }
            },
            "print": print_block("done")
        })),
    );
    p.engine.start();
    p.engine.run_frames(2);
    assert!(p.prints().is_empty());
    let sprite = p.sprite;
    let target = p.engine.runtime_mut().targets.get_mut(sprite).unwrap();
    target.variables[0].value = 1.into();
    p.engine.step();
    assert_eq!(p.prints(), vec!["done"]);
}

#[test]
fn stop_all_ends_every_thread() {
    let mut p = project(
        json!({
            "flag": {"opcode": "event_whenflagclicked", "next": "loop", "topLevel": true},
            "loop": {"opcode": "control_forever", "inputs": {"SUBSTACK": [2, "print"]}},
            "print": print_block("stage")
        }),
        flag_script(json!({
            "body": {"opcode": "control_stop", "fields": {"STOP_OPTION": ["all", null]}}
        })),
    );
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["stage"]);
    assert!(!p.engine.is_running());
}

#[test]
fn stop_other_scripts_keeps_the_caller() {
    let mut p = project(
        json!({}),
        json!({
            "flag1": {"opcode": "event_whenflagclicked", "next": "loop1", "topLevel": true},
            "loop1": {"opcode": "control_forever", "inputs": {"SUBSTACK": [2, "p1"]}},
            "p1": print_block("other"),
            "flag2": {"opcode": "event_whenflagclicked", "next": "stop", "topLevel": true},
            "stop": {
                "opcode": "control_stop", "next": "loop2",
                "fields": {"STOP_OPTION": ["other scripts in sprite", null]}
            },
            "loop2": {"opcode": "control_forever", "inputs": {"SUBSTACK": [2, "p2"]}},
            "p2": print_block("me")
        }),
    );
    p.engine.start();
    p.engine.run_frames(3);
    assert_eq!(p.prints(), vec!["other", "me", "me", "me"]);
    assert_eq!(p.engine.threads().len(), 1);
}
