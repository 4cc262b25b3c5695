mod common;

use common::{flag_script, print_block, print_reporter, project, variable_field};
use serde_json::{json, Value as Json};

/// Links `blocks` into one stack under a green flag; the first block is
/// `body` and the rest are named `b1`, `b2` and so on.
fn stack(blocks: Vec<Json>) -> Json {
    let ids: Vec<String> = (0..blocks.len())
        .map(|i| if i == 0 { "body".to_string() } else { format!("b{i}") })
        .collect();
    let mut map = json!({});
    for (i, mut block) in blocks.into_iter().enumerate() {
        if let Some(next) = ids.get(i + 1) {
            block["next"] = json!(next);
        }
        map[ids[i].as_str()] = block;
    }
    flag_script(map)
}

fn list_field() -> Json {
    json!({"LIST": ["list", "lid"]})
}

fn add(item: &str) -> Json {
    json!({"opcode": "data_addtolist", "inputs": {"ITEM": [1, [10, item]]}, "fields": list_field()})
}

#[test]
fn list_blocks_edit_the_sprite_list() {
    let mut blocks = stack(vec![
        add("Lorem"),
        add("ipsum"),
        add("dolor"),
        add("123"),
        add("true"),
        json!({
            "opcode": "data_deleteoflist",
            "inputs": {"INDEX": [1, [7, "2"]]}, "fields": list_field()
        }),
        print_reporter("contents"),
        print_reporter("last"),
        print_reporter("length"),
        print_reporter("contains"),
    ]);
    blocks["contents"] = json!({"opcode": "data_listcontents", "fields": list_field()});
    blocks["last"] = json!({
        "opcode": "data_itemoflist", "inputs": {"INDEX": [1, [7, "last"]]}, "fields": list_field()
    });
    blocks["length"] = json!({"opcode": "data_lengthoflist", "fields": list_field()});
    blocks["contains"] = json!({
        "opcode": "data_listcontainsitem",
        "inputs": {"ITEM": [1, [10, "DOLOR"]]},
        "fields": list_field()
    });
    let mut p = project(json!({}), blocks);
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["Lorem dolor 123 true", "true", "4", "true"]);
}

#[test]
fn insert_and_replace_use_scratch_indices() {
    let mut blocks = stack(vec![
        add("a"),
        add("c"),
        json!({
            "opcode": "data_insertatlist",
            "inputs": {"ITEM": [1, [10, "b"]], "INDEX": [1, [7, "2"]]}, "fields": list_field()
        }),
        json!({
            "opcode": "data_replaceitemoflist",
            "inputs": {"INDEX": [1, [7, "last"]], "ITEM": [1, [10, "d"]]}, "fields": list_field()
        }),
        json!({
            "opcode": "data_insertatlist",
            "inputs": {"ITEM": [1, [10, "z"]], "INDEX": [1, [7, "9"]]}, "fields": list_field()
        }),
        print_reporter("contents"),
        print_reporter("find"),
    ]);
    blocks["contents"] = json!({"opcode": "data_listcontents", "fields": list_field()});
    blocks["find"] = json!({
        "opcode": "data_itemnumoflist", "inputs": {"ITEM": [1, [10, "d"]]}, "fields": list_field()
    });
    let mut p = project(json!({}), blocks);
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["abd", "3"]);
}

#[test]
fn out_of_range_items_are_empty() {
    let mut blocks = stack(vec![
        add("x"),
        print_reporter("r1"),
        print_reporter("r2"),
        json!({"opcode": "data_deletealloflist", "fields": list_field()}),
        print_reporter("r3"),
    ]);
    blocks["r1"] = json!({
        "opcode": "data_itemoflist", "inputs": {"INDEX": [1, [7, "5"]]}, "fields": list_field()
    });
    blocks["r2"] = json!({
        "opcode": "data_itemoflist", "inputs": {"INDEX": [1, [7, "0"]]}, "fields": list_field()
    });
    blocks["r3"] = json!({"opcode": "data_lengthoflist", "fields": list_field()});
    let mut p = project(json!({}), blocks);
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["", "", "0"]);
}

#[test]
fn change_variable_adds_numbers() {
    let mut p = project(
        json!({}),
        stack(vec![
            json!({
                "opcode": "data_setvariableto",
                "inputs": {"VALUE": [1, [10, "1.5"]]}, "fields": variable_field()
            }),
            json!({
                "opcode": "data_changevariableby",
                "inputs": {"VALUE": [1, [4, "abc"]]}, "fields": variable_field()
            }),
            json!({
                "opcode": "data_changevariableby",
                "inputs": {"VALUE": [1, [4, "2"]]}, "fields": variable_field()
            }),
        ]),
    );
    p.engine.start();
    p.engine.step();
    assert_eq!(p.variable("var"), 3.5);
}

#[test]
fn global_variables_live_on_the_stage() {
    let mut p = project(
        json!({}),
        stack(vec![json!({
            "opcode": "data_setvariableto",
            "inputs": {"VALUE": [1, [10, "hi"]]},
            "fields": {"VARIABLE": ["global", "gid"]}
        })]),
    );
    p.engine.start();
    p.engine.step();
    let value = p.engine.variable(p.stage, "global").map(|v| v.to_string());
    assert_eq!(value.as_deref(), Some("hi"));
}

#[test]
fn unsupported_blocks_are_reported_and_skipped() {
    let mut blocks = stack(vec![
        json!({"opcode": "pen_clear"}),
        print_reporter("tempo"),
        print_block("still running"),
    ]);
    blocks["tempo"] = json!({"opcode": "music_getTempo"});
    let mut p = project(json!({}), blocks);
    p.engine.start();
    p.engine.step();
    assert_eq!(p.prints(), vec!["", "still running"]);
    let unsupported: Vec<&str> = p.engine.unsupported_blocks().iter().map(String::as_str).collect();
    assert_eq!(unsupported, vec!["music_getTempo", "pen_clear"]);
}
