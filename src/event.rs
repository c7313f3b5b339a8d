//! Event schema: names, parameter maps, and parameter values.
//!
//! Events are values. Nothing in the pipeline mutates an event in place;
//! interceptors consume an event and hand back a new one.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

/// A single parameter value.
///
/// The variant set is closed so every value is `Send + Sync` and can cross
/// thread boundaries with the event that carries it.
///
/// Values serialize as bare scalars. Deserialization never guesses a type
/// from string contents: every string becomes `Value::String`, so `Date` and
/// `Url` values come back in their string form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(DateTime<Utc>),
    Url(Url),
    String(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Wire shapes accepted for a `Value`. Strings are never parsed further.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarInput {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<ScalarInput> for Value {
    fn from(input: ScalarInput) -> Self {
        match input {
            ScalarInput::Bool(b) => Value::Bool(b),
            ScalarInput::Int(i) => Value::Int(i),
            ScalarInput::Float(f) => Value::Float(f),
            ScalarInput::String(s) => Value::String(s),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        ScalarInput::deserialize(deserializer).map(Value::from)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Url(u) => f.write_str(u.as_str()),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<Url> for Value {
    fn from(v: Url) -> Self {
        Value::Url(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// Parameter map type carried by present parameters.
pub type ParameterMap = BTreeMap<String, Value>;

/// Event parameters. `Absent` and an empty `Present` map are different events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<ParameterMap>", into = "Option<ParameterMap>")]
pub enum Parameters {
    #[default]
    Absent,
    Present(ParameterMap),
}

impl Parameters {
    pub fn empty() -> Self {
        Parameters::Present(ParameterMap::new())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Parameters::Absent)
    }

    pub fn as_map(&self) -> Option<&ParameterMap> {
        match self {
            Parameters::Absent => None,
            Parameters::Present(map) => Some(map),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.as_map().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.as_map().into_iter().flat_map(|map| map.iter())
    }

    /// Return these parameters with `key` set, creating the map if absent.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = self.into_map();
        map.insert(key.into(), value.into());
        Parameters::Present(map)
    }

    /// Return these parameters with `key` removed. Absent stays absent.
    pub fn without(self, key: &str) -> Self {
        match self {
            Parameters::Absent => Parameters::Absent,
            Parameters::Present(mut map) => {
                map.remove(key);
                Parameters::Present(map)
            }
        }
    }

    /// Fill in `defaults` for keys that are not already present.
    ///
    /// Absent parameters are treated as an empty map for the merge, but stay
    /// `Absent` when no default key was actually added.
    pub fn merged_with_defaults(self, defaults: &ParameterMap) -> Self {
        let missing: Vec<(&String, &Value)> = defaults
            .iter()
            .filter(|(key, _)| !self.contains_key(key))
            .collect();
        if missing.is_empty() {
            return self;
        }
        let mut map = self.into_map();
        for (key, value) in missing {
            map.insert(key.clone(), value.clone());
        }
        Parameters::Present(map)
    }

    /// Consume into a map, treating absent as empty.
    pub fn into_map(self) -> ParameterMap {
        match self {
            Parameters::Absent => ParameterMap::new(),
            Parameters::Present(map) => map,
        }
    }
}

impl From<ParameterMap> for Parameters {
    fn from(map: ParameterMap) -> Self {
        Parameters::Present(map)
    }
}

impl From<Option<ParameterMap>> for Parameters {
    fn from(map: Option<ParameterMap>) -> Self {
        match map {
            Some(map) => Parameters::Present(map),
            None => Parameters::Absent,
        }
    }
}

impl From<Parameters> for Option<ParameterMap> {
    fn from(params: Parameters) -> Self {
        match params {
            Parameters::Absent => None,
            Parameters::Present(map) => Some(map),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Parameters::Present(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// An analytics event: a name plus optional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    #[serde(default)]
    parameters: Parameters,
}

impl Event {
    /// Event with absent parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Parameters::Absent,
        }
    }

    pub fn with_parameters(name: impl Into<String>, parameters: impl Into<Parameters>) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// New event with `key` set to `value`.
    pub fn with_parameter(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: self.name,
            parameters: self.parameters.with(key, value),
        }
    }

    /// New event with its parameters replaced.
    pub fn replace_parameters(self, parameters: impl Into<Parameters>) -> Self {
        Self {
            name: self.name,
            parameters: parameters.into(),
        }
    }

    /// New event with the same parameters under a different name.
    pub fn renamed(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: self.parameters,
        }
    }

    pub fn into_parts(self) -> (String, Parameters) {
        (self.name, self.parameters)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Parameters::Present(map) = &self.parameters {
            f.write_str(" {")?;
            for (i, (key, value)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}
