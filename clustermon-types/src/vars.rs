//! The one dynamic attribute bag the data model keeps, reserved for
//! user-supplied custom variables used by macro resolution (spec §4.10,
//! §9 redesign note: everything else is a typed struct field).

use std::collections::BTreeMap;

/// A scalar or array value a custom variable can hold.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MacroValue {
    String(String),
    Number(f64),
    Bool(bool),
    Array(Vec<MacroValue>),
}

impl MacroValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MacroValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render as the string a macro token expands to.
    pub fn render(&self) -> String {
        match self {
            MacroValue::String(s) => s.clone(),
            MacroValue::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            MacroValue::Bool(b) => b.to_string(),
            MacroValue::Array(items) => items
                .iter()
                .map(MacroValue::render)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Custom-variable scope bound to a single object. Marked recursive per
/// spec §4.10: a value that itself contains `$name$` tokens is expanded
/// once more by the resolver.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct VarsBag(BTreeMap<String, MacroValue>);

impl VarsBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&MacroValue> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: MacroValue) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MacroValue)> {
        self.0.iter()
    }
}
