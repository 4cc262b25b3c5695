use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fmt::Formatter;

use serde::de::{SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::value::Value;

pub type BlockMap = BTreeMap<String, Block>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(skip)]
    pub id: String,
    pub opcode: String,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub inputs: HashMap<String, Input>,
    #[serde(default)]
    pub fields: HashMap<String, Field>,
    #[serde(default)]
    pub shadow: bool,
    #[serde(default)]
    pub top_level: bool,
    #[serde(default)]
    pub mutation: Option<Mutation>,
}

impl Block {
    pub fn new(id: &str, opcode: &str) -> Block {
        Block {
            id: id.to_string(),
            opcode: opcode.to_string(),
            ..Default::default()
        }
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.get(name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowType {
    #[default]
    Shadow,
    NoShadow,
    ObscuredShadow,
}

/// A block input: the plugged-in value plus, for obscured shadows, the
/// shadow hidden underneath it.
#[derive(Debug, Clone, Default)]
pub struct Input {
    pub shadow_type: ShadowType,
    pub value: Option<InputValue>,
    pub shadow: Option<InputValue>,
}

impl Input {
    pub fn value(value: InputValue) -> Input {
        Input {
            shadow_type: ShadowType::Shadow,
            value: Some(value),
            shadow: None,
        }
    }

    pub fn block(id: &str) -> Input {
        Input {
            shadow_type: ShadowType::NoShadow,
            value: Some(InputValue::Block(id.to_string())),
            shadow: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum InputValue {
    Block(String),
    Value(Value),
    Broadcast(Reference),
    Variable(Reference),
    List(Reference),
}

/// A `(name, id)` pair naming a variable, list or broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reference {
    pub name: String,
    pub id: String,
}

impl InputValue {
    fn from_json(json: serde_json::Value) -> Option<InputValue> {
        match json {
            serde_json::Value::String(id) => Some(InputValue::Block(id)),
            serde_json::Value::Array(values) => {
                let kind = values.first().and_then(serde_json::Value::as_u64)?;
                let text = |index: usize| {
                    values
                        .get(index)
                        .map(|value| Value::from(value).to_string())
                        .unwrap_or_default()
                };
                let reference = || Reference {
                    name: text(1),
                    id: text(2),
                };
                match kind {
                    4..=10 => Some(InputValue::Value(
                        values.get(1).map(Value::from).unwrap_or_default(),
                    )),
                    11 => Some(InputValue::Broadcast(reference())),
                    12 => Some(InputValue::Variable(reference())),
                    13 => Some(InputValue::List(reference())),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Input {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        struct SeqVisitor;
        impl<'de> Visitor<'de> for SeqVisitor {
            type Value = Input;
            fn expecting(&self, f: &mut Formatter) -> fmt::Result {
                write!(f, "Input")
            }
            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let shadow_type = match seq.next_element::<u8>()? {
                    Some(2) => ShadowType::NoShadow,
                    Some(3) => ShadowType::ObscuredShadow,
                    _ => ShadowType::Shadow,
                };
                let value = seq
                    .next_element::<serde_json::Value>()?
                    .and_then(InputValue::from_json);
                let shadow = seq
                    .next_element::<serde_json::Value>()?
                    .and_then(InputValue::from_json);
                while seq.next_element::<serde_json::Value>()?.is_some() {}
                Ok(Input {
                    shadow_type,
                    value,
                    shadow,
                })
            }
        }
        de.deserialize_seq(SeqVisitor)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Field {
    pub value: Value,
    pub id: Option<String>,
}

impl Field {
    pub fn new(value: impl Into<Value>, id: Option<&str>) -> Field {
        Field {
            value: value.into(),
            id: id.map(str::to_string),
        }
    }

    pub fn reference(&self) -> Reference {
        Reference {
            name: self.value.to_string(),
            id: self.id.clone().unwrap_or_else(|| self.value.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let values: Vec<serde_json::Value> = Deserialize::deserialize(de)?;
        Ok(Field {
            value: values.first().map(Value::from).unwrap_or_default(),
            id: values
                .get(1)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Raw custom block mutation as serialized in `project.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub struct Mutation {
    #[serde(default)]
    pub proccode: Option<String>,
    #[serde(default)]
    pub argumentids: Option<String>,
    #[serde(default)]
    pub argumentnames: Option<String>,
    #[serde(default)]
    pub argumentdefaults: Option<String>,
    #[serde(default)]
    pub warp: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    StringNumber,
    Number,
    Boolean,
}

/// Parsed custom block signature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prototype {
    pub proc_code: String,
    pub argument_ids: Vec<String>,
    pub argument_names: Vec<String>,
    pub argument_defaults: Vec<Value>,
    pub argument_types: Vec<ArgumentType>,
    pub warp: bool,
}

impl Prototype {
    pub fn new(
        proc_code: &str,
        argument_ids: &[&str],
        argument_names: &[&str],
        warp: bool,
    ) -> Prototype {
        let mut prototype = Prototype {
            proc_code: proc_code.to_string(),
            argument_ids: argument_ids.iter().map(|s| s.to_string()).collect(),
            argument_names: argument_names.iter().map(|s| s.to_string()).collect(),
            argument_defaults: Vec::new(),
            argument_types: parse_argument_types(proc_code),
            warp,
        };
        prototype.normalize();
        prototype
    }

    pub fn from_mutation(mutation: &Mutation) -> Prototype {
        let proc_code = mutation.proccode.clone().unwrap_or_default();
        let mut prototype = Prototype {
            argument_types: parse_argument_types(&proc_code),
            proc_code,
            argument_ids: parse_string_list(mutation.argumentids.as_deref()),
            argument_names: parse_string_list(mutation.argumentnames.as_deref()),
            argument_defaults: parse_string_list(mutation.argumentdefaults.as_deref())
                .into_iter()
                .map(Value::from)
                .collect(),
            warp: match &mutation.warp {
                Some(serde_json::Value::Bool(warp)) => *warp,
                Some(serde_json::Value::String(warp)) => warp == "true",
                _ => false,
            },
        };
        prototype.normalize();
        prototype
    }

    pub fn argument_index(&self, name: &str) -> Option<usize> {
        self.argument_names.iter().position(|n| n == name)
    }

    pub fn argument_type(&self, index: usize) -> ArgumentType {
        self.argument_types
            .get(index)
            .copied()
            .unwrap_or(ArgumentType::StringNumber)
    }

    /// Default bound to an argument slot that has no input: the declared
    /// default, or an empty value of the argument's type.
    pub fn default_argument(&self, index: usize) -> Value {
        if let Some(value) = self.argument_defaults.get(index) {
            return value.clone();
        }
        match self.argument_type(index) {
            ArgumentType::Boolean => Value::Bool(false),
            _ => Value::default(),
        }
    }

    // A signature whose placeholders disagree with its id list keeps the ids
    // and pads the types.
    fn normalize(&mut self) {
        let count = self.argument_ids.len();
        self.argument_types
            .resize(count.max(self.argument_types.len()), ArgumentType::StringNumber);
        self.argument_types.truncate(count);
    }
}

fn parse_argument_types(proc_code: &str) -> Vec<ArgumentType> {
    let mut types = Vec::new();
    let mut chars = proc_code.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        match chars.peek() {
            Some('s') => types.push(ArgumentType::StringNumber),
            Some('n') => types.push(ArgumentType::Number),
            Some('b') => types.push(ArgumentType::Boolean),
            _ => continue,
        }
        chars.next();
    }
    types
}

fn parse_string_list(json: Option<&str>) -> Vec<String> {
    json.and_then(|json| serde_json::from_str::<Vec<serde_json::Value>>(json).ok())
        .map(|values| values.iter().map(|v| Value::from(v).to_string()).collect())
        .unwrap_or_default()
}

/// Parses the `blocks` object of a target. Top-level variable and list
/// reporters stored as bare arrays become `data_variable` /
/// `data_listcontents` blocks.
pub fn parse_blocks(
    json: &serde_json::Map<String, serde_json::Value>,
) -> Result<BlockMap, serde_json::Error> {
    let mut blocks = BlockMap::new();
    for (id, value) in json {
        let block = match value {
            serde_json::Value::Array(values) => match primitive_block(values) {
                Some(block) => block,
                None => continue,
            },
            other => Block::deserialize(other)?,
        };
        blocks.insert(id.clone(), Block { id: id.clone(), ..block });
    }
    Ok(blocks)
}

fn primitive_block(values: &[serde_json::Value]) -> Option<Block> {
    let (opcode, field) = match values.first().and_then(serde_json::Value::as_u64)? {
        12 => ("data_variable", "VARIABLE"),
        13 => ("data_listcontents", "LIST"),
        _ => return None,
    };
    let mut block = Block::new("", opcode);
    block.top_level = true;
    block.fields.insert(
        field.to_string(),
        Field {
            value: values.get(1).map(Value::from).unwrap_or_default(),
            id: values.get(2).and_then(serde_json::Value::as_str).map(str::to_string),
        },
    );
    Some(block)
}
