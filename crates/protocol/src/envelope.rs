use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::{Cid, Oid};
use crate::value::Value;

/// Name of the parameter entry identifying the target (or resulting)
/// object of every envelope.
pub const TARGET_PARAM: &str = "id";

/// The target of an envelope: a type, plus the operation to invoke on
/// an existing instance of it. No operation means "construct a new
/// instance".
///
/// Wire form is the single string `"TypeName"` or
/// `"TypeName/operation"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub type_name: String,
    pub operation: Option<String>,
}

impl Method {
    pub fn construct(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            operation: None,
        }
    }

    pub fn operation(type_name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            operation: Some(operation.into()),
        }
    }

    pub fn is_construction(&self) -> bool {
        self.operation.is_none()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operation {
            Some(op) => write!(f, "{}/{}", self.type_name, op),
            None => f.write_str(&self.type_name),
        }
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let text = String::deserialize(deserializer)?;
        let (type_name, operation) = match text.split_once('/') {
            Some((type_name, op)) => (type_name, Some(op)),
            None => (text.as_str(), None),
        };
        if type_name.is_empty() {
            return Err(de::Error::custom("empty type name in method"));
        }
        if operation.is_some_and(str::is_empty) {
            return Err(de::Error::custom("empty operation name in method"));
        }
        Ok(Method {
            type_name: type_name.to_string(),
            operation: operation.map(String::from),
        })
    }
}

/// Ordered parameter set of an envelope.
///
/// Keys are unique; entry order is the declaration order of the
/// recorded operation (with `"id"` first) and survives serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, Value)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add or replace an entry. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The target object identity, read from the `"id"` entry.
    pub fn target_oid(&self) -> Option<Oid> {
        self.get(TARGET_PARAM).and_then(Value::as_oid)
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct ParamsVisitor;

impl<'de> Visitor<'de> for ParamsVisitor {
    type Value = Params;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a parameter map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Params, A::Error> {
        let mut entries: Vec<(String, Value)> = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(de::Error::custom(format!("duplicate parameter `{key}`")));
            }
            entries.push((key, value));
        }
        Ok(Params(entries))
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Params, D::Error> {
        deserializer.deserialize_map(ParamsVisitor)
    }
}

/// One serializable record of a constructor or mutator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub method: Method,
    /// Command identifier; reflects write order.
    #[serde(rename = "id")]
    pub cid: Cid,
    /// Seconds since the Unix epoch at write time. Informational only,
    /// never used for ordering or correctness.
    pub timestamp: f64,
    pub parameters: Params,
}

impl Envelope {
    /// Build an envelope stamped with the current wall-clock time.
    pub fn new(method: Method, cid: Cid, parameters: Params) -> Self {
        Self {
            method,
            cid,
            timestamp: unix_timestamp(),
            parameters,
        }
    }

    pub fn target_oid(&self) -> Option<Oid> {
        self.parameters.target_oid()
    }
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
pub fn unix_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
