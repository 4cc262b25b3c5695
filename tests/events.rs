mod common;

use common::{flag_script, print_block, print_next, print_reporter, project, variable_field};
use serde_json::json;

#[test]
fn broadcast_and_wait_resumes_after_receivers_finish() {
    let mut p = project(
        json!({
            "recv": {
                "opcode": "event_whenbroadcastreceived", "next": "print", "topLevel": true,
                "fields": {"BROADCAST_OPTION": ["Message1", "m1"]}
            },
            "print": print_block("recv")
        }),
        flag_script(json!({
            "body": {
                "opcode": "event_broadcastandwait", "next": "after",
                "inputs": {"BROADCAST_INPUT": [1, [11, "MESSAGE1", "m1"]]}
            },
            "after": print_block("after")
        })),
    );
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["recv"]);
    p.engine.step();
    assert_eq!(p.prints(), vec!["recv", "after"]);
    assert!(!p.engine.is_running());
}

#[test]
fn broadcast_and_wait_without_receivers_resumes_next_frame() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {
                "opcode": "event_broadcastandwait", "next": "after",
                "inputs": {"BROADCAST_INPUT": [1, [11, "nobody", "n"]]}
            },
            "after": print_block("after")
        })),
    );
    p.engine.start();
    p.engine.step();
    assert!(p.prints().is_empty());
    p.engine.step();
    assert_eq!(p.prints(), vec!["after"]);
}

#[test]
fn broadcast_restarts_a_running_receiver() {
    let mut p = project(
        json!({
            "recv": {
                "opcode": "event_whenbroadcastreceived", "next": "print", "topLevel": true,
                "fields": {"BROADCAST_OPTION": ["go", "g"]}
            },
            "print": print_next("start", "loop"),
            "loop": {"opcode": "control_forever", "inputs": {"SUBSTACK": [2, "tick"]}},
            "tick": print_block("tick")
        }),
        json!({}),
    );
    p.engine.broadcast("go");
    p.engine.step();
    p.engine.broadcast("GO");
    p.engine.step();
    assert_eq!(p.prints(), vec!["start", "tick", "start", "tick"]);
    assert_eq!(p.engine.threads().len(), 1);
}

#[test]
fn timer_edge_hat_fires_once_per_rising_edge() {
    let mut p = project(
        json!({}),
        json!({
            "hat": {
                "opcode": "event_whengreaterthan", "next": "print", "topLevel": true,
                "inputs": {"VALUE": [1, [4, "1"]]},
                "fields": {"WHENGREATERTHANMENU": ["TIMER", null]}
            },
            "print": print_block("fired")
        }),
    );
    p.engine.start();
    p.engine.step();
    assert!(p.prints().is_empty());
    p.set_time(2.);
    p.engine.step();
    p.engine.step();
    assert_eq!(p.prints(), vec!["fired"]);
    p.engine.runtime_mut().reset_timer();
    p.engine.step();
    p.set_time(4.);
    p.engine.step();
    assert_eq!(p.prints(), vec!["fired", "fired"]);
}

fn clone_project(clone_body: serde_json::Value) -> common::Project {
    let mut blocks = flag_script(json!({
        "body": {
            "opcode": "data_setvariableto", "next": "clone",
            "inputs": {"VALUE": [1, [10, "7"]]}, "fields": variable_field()
        },
        "clone": {"opcode": "control_create_clone_of", "inputs": {"CLONE_OPTION": [1, "menu"]}},
        "menu": {
            "opcode": "control_create_clone_of_menu", "shadow": true,
            "fields": {"CLONE_OPTION": ["_myself_", null]}
        },
        "cloned": {"opcode": "control_start_as_clone", "next": "cbody", "topLevel": true}
    }));
    for (id, block) in clone_body.as_object().into_iter().flatten() {
        blocks[id.as_str()] = block.clone();
    }
    project(json!({}), blocks)
}

#[test]
fn clone_hats_run_in_the_same_frame_with_copied_variables() {
    let mut p = clone_project(json!({
        "cbody": print_reporter("read"),
        "read": {"opcode": "data_variable", "fields": variable_field()}
    }));
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["7"]);
    assert_eq!(p.engine.clone_count(), 1);
    p.engine.stop();
    assert_eq!(p.engine.clone_count(), 0);
}

#[test]
fn stopping_clears_the_bubbles_of_deleted_clones() {
    let mut p = clone_project(json!({
        "cbody": {"opcode": "looks_say", "inputs": {"MESSAGE": [1, [10, "hi"]]}}
    }));
    p.engine.start();
    p.engine.step();
    p.engine.stop();
    assert_eq!(p.engine.clone_count(), 0);
    let bubbles = p.log.borrow().bubbles.clone();
    assert_eq!(
        bubbles,
        vec![
            ("Sprite1".to_string(), Some("hi".to_string())),
            ("Sprite1".to_string(), None)
        ]
    );
}

#[test]
fn clone_churn_reuses_target_slots() {
    let mut p = project(
        json!({}),
        flag_script(json!({
            "body": {"opcode": "control_forever", "inputs": {"SUBSTACK": [2, "clone"]}},
            "clone": {"opcode": "control_create_clone_of", "inputs": {"CLONE_OPTION": [1, "menu"]}},
            "menu": {
                "opcode": "control_create_clone_of_menu", "shadow": true,
                "fields": {"CLONE_OPTION": ["_myself_", null]}
            },
            "cloned": {"opcode": "control_start_as_clone", "next": "delete", "topLevel": true},
            "delete": {"opcode": "control_delete_this_clone"}
        })),
    );
    p.engine.start();
    p.engine.run_frames(500);
    assert_eq!(p.engine.clone_count(), 0);
    assert!(p.engine.runtime().targets.capacity() <= 4);
    assert_eq!(p.engine.threads().len(), 1);
}

#[test]
fn delete_this_clone_ends_the_clone_script() {
    let mut p = clone_project(json!({
        "cbody": print_next("clone", "delete"),
        "delete": {"opcode": "control_delete_this_clone", "next": "never"},
        "never": print_block("never")
    }));
    p.engine.start();
    p.engine.step();
    p.engine.step();
    assert_eq!(p.prints(), vec!["clone"]);
    assert_eq!(p.engine.clone_count(), 0);
    assert!(!p.engine.is_running());
}

#[test]
fn key_hats_match_the_key_or_any() {
    let mut p = project(
        json!({}),
        json!({
            "space": {
                "opcode": "event_whenkeypressed", "next": "p1", "topLevel": true,
                "fields": {"KEY_OPTION": ["space", null]}
            },
            "p1": print_block("space"),
            "any": {
                "opcode": "event_whenkeypressed", "next": "p2", "topLevel": true,
                "fields": {"KEY_OPTION": ["any", null]}
            },
            "p2": print_block("any")
        }),
    );
    p.engine.key_pressed("a");
    p.engine.step();
    assert_eq!(p.prints(), vec!["any"]);
    p.engine.key_pressed("space");
    p.engine.step();
    assert_eq!(p.prints(), vec!["any", "any", "space"]);
}

#[test]
fn clicks_start_sprite_and_stage_hats() {
    let mut p = project(
        json!({
            "click": {"opcode": "event_whenstageclicked", "next": "p", "topLevel": true},
            "p": print_block("stage")
        }),
        json!({
            "click": {"opcode": "event_whenthisspriteclicked", "next": "p", "topLevel": true},
            "p": print_block("sprite")
        }),
    );
    p.engine.click_target(p.sprite);
    p.engine.step();
    assert_eq!(p.prints(), vec!["sprite"]);
    p.engine.click_target(p.stage);
    p.engine.step();
    assert_eq!(p.prints(), vec!["sprite", "stage"]);
}
