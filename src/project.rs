use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;

use crate::block::parse_blocks;
use crate::engine::Engine;
use crate::error::LoadError;
use crate::host::Host;
use crate::list::List;
use crate::target::{Target, Variable};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Config {
    pub stage_width: u32,
    pub stage_height: u32,
    pub frame_rate: u32,
    pub clone_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stage_width: 480,
            stage_height: 360,
            frame_rate: 30,
            clone_limit: 300,
        }
    }
}

/// Loads an unpacked `project.json` into a new engine.
pub fn load(
    path: impl AsRef<Path>,
    config: Config,
    host: Box<dyn Host>,
) -> Result<Engine, LoadError> {
    let json = fs::read_to_string(path)?;
    let mut engine = Engine::new(config, host);
    engine.load_json(&json)?;
    Ok(engine)
}

#[derive(Deserialize)]
struct Project {
    targets: Vec<JsonTarget>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonTarget {
    is_stage: bool,
    name: String,
    #[serde(default)]
    variables: BTreeMap<String, Vec<serde_json::Value>>,
    #[serde(default)]
    lists: BTreeMap<String, (String, Vec<serde_json::Value>)>,
    #[serde(default)]
    blocks: serde_json::Map<String, serde_json::Value>,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default = "default_size")]
    size: f64,
    #[serde(default = "default_direction")]
    direction: f64,
}

fn default_true() -> bool {
    true
}

fn default_size() -> f64 {
    100.
}

fn default_direction() -> f64 {
    90.
}

/// Parses the `targets` array of a project. The stage must come first.
pub fn parse_targets(json: &str) -> Result<Vec<Target>, LoadError> {
    let project: Project = serde_json::from_str(json)?;
    if !project.targets.first().is_some_and(|t| t.is_stage) {
        return Err(LoadError::MissingStage);
    }
    project.targets.into_iter().map(convert_target).collect()
}

fn convert_target(json: JsonTarget) -> Result<Target, LoadError> {
    let mut target = Target::new(&json.name, json.is_stage);
    target.blocks = Rc::new(parse_blocks(&json.blocks)?);
    target.variables = json
        .variables
        .iter()
        .map(|(id, fields)| Variable {
            id: id.clone(),
            name: fields.first().map(|v| Value::from(v).to_string()).unwrap_or_default(),
            value: fields.get(1).map(Value::from).unwrap_or_default(),
            is_cloud: fields.get(2).and_then(serde_json::Value::as_bool).unwrap_or(false),
        })
        .collect();
    target.lists = json
        .lists
        .iter()
        .map(|(id, (name, items))| List {
            id: id.clone(),
            name: name.clone(),
            items: items.iter().map(Value::from).collect(),
        })
        .collect();
    if !json.is_stage {
        target.visible = json.visible;
        target.x = json.x;
        target.y = json.y;
        target.size = json.size;
        target.set_direction(json.direction);
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stage_and_sprite() {
        let json = r#"{
            "targets": [
                {"isStage": true, "name": "Stage",
                  "variables": {"v1": ["score", 0], "v2": ["☁ hi", 5, true]},
                  "lists": {"l1": ["items", ["a", 1]]},
                  "blocks": {}},
                {"isStage": false, "name": "Cat", "visible": false, "x": 10, "y": -5,
                  "variables": {}, "lists": {}, "blocks": {}}
            ]
        }"#;
        let targets = parse_targets(json).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].variables[0].name, "score");
        assert!(targets[0].variables[1].is_cloud);
        assert_eq!(targets[0].lists[0].to_string(), "a 1");
        assert!(!targets[1].visible);
        assert_eq!(targets[1].x, 10.);
    }

    #[test]
    fn missing_stage_is_an_error() {
        let json = r#"{"targets": [{"isStage": false, "name": "Cat"}]}"#;
        assert!(matches!(parse_targets(json), Err(LoadError::MissingStage)));
        assert!(matches!(parse_targets("{"), Err(LoadError::Json(_))));
    }
}
