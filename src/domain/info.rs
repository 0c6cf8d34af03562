//! Auxiliary info: editable key/value groups passed alongside arguments

use serde_json::{Map, Value};

use crate::domain::coerce::CoercionError;

/// How an entry's text is presented to the call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoFormat {
    #[default]
    Text,
    /// `true` (any case) or anything else as false
    Bool,
    /// JSON list; empty text is an empty list
    JsonList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoEntry {
    pub value: String,
    pub comment: Option<String>,
    pub format: InfoFormat,
}

impl InfoEntry {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            comment: None,
            format: InfoFormat::Text,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_format(mut self, format: InfoFormat) -> Self {
        self.format = format;
        self
    }

    fn formatted(&self, key: &str) -> Result<Value, CoercionError> {
        match self.format {
            InfoFormat::Text => Ok(Value::String(self.value.clone())),
            InfoFormat::Bool => Ok(Value::Bool(self.value.trim().eq_ignore_ascii_case("true"))),
            InfoFormat::JsonList => {
                if self.value.trim().is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                serde_json::from_str(&self.value)
                    .map_err(|e| CoercionError::invalid(key, &self.value, e.to_string()))
            }
        }
    }
}

/// Which auxiliary group an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoFamily {
    /// Contract / module identifiers for contract calls
    Contract,
    /// Script payload fields (e.g. bytecode)
    Script,
    /// Optional ABI describing a script payload
    ScriptAbi,
}

impl InfoFamily {
    pub fn name(&self) -> &'static str {
        match self {
            InfoFamily::Contract => "contract",
            InfoFamily::Script => "script",
            InfoFamily::ScriptAbi => "script_abi",
        }
    }
}

/// Ordered entries of one group
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoGroup {
    entries: Vec<(String, InfoEntry)>,
}

impl InfoGroup {
    pub fn with(mut self, key: impl Into<String>, entry: InfoEntry) -> Self {
        self.insert(key, entry);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: InfoEntry) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((key, entry)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&InfoEntry> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InfoEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }
}

/// All auxiliary groups of a template or live editor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuxiliaryInfo {
    pub contract: InfoGroup,
    pub script: InfoGroup,
    pub script_abi: InfoGroup,
}

impl AuxiliaryInfo {
    pub fn contract(group: InfoGroup) -> Self {
        Self {
            contract: group,
            ..Self::default()
        }
    }

    pub fn script(script: InfoGroup, script_abi: InfoGroup) -> Self {
        Self {
            script,
            script_abi,
            ..Self::default()
        }
    }

    pub fn group(&self, family: InfoFamily) -> &InfoGroup {
        match family {
            InfoFamily::Contract => &self.contract,
            InfoFamily::Script => &self.script,
            InfoFamily::ScriptAbi => &self.script_abi,
        }
    }

    fn group_mut(&mut self, family: InfoFamily) -> &mut InfoGroup {
        match family {
            InfoFamily::Contract => &mut self.contract,
            InfoFamily::Script => &mut self.script,
            InfoFamily::ScriptAbi => &mut self.script_abi,
        }
    }

    pub fn get(&self, family: InfoFamily, key: &str) -> Option<&str> {
        self.group(family).get(key).map(|e| e.value.as_str())
    }

    /// Edit the value of an existing entry. Unknown keys are rejected.
    pub fn set(&mut self, family: InfoFamily, key: &str, value: impl Into<String>) -> bool {
        let group = self.group_mut(family);
        match group.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, entry)) => {
                entry.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Set `key` in whichever group already holds it
    pub fn set_any(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        [InfoFamily::Contract, InfoFamily::Script, InfoFamily::ScriptAbi]
            .into_iter()
            .any(|family| self.set(family, key, value.clone()))
    }

    /// Group entries with their formatters applied
    pub fn formatted(&self, family: InfoFamily) -> Result<Map<String, Value>, CoercionError> {
        self.group(family)
            .iter()
            .map(|(key, entry)| Ok((key.to_string(), entry.formatted(key)?)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.contract.is_empty() && self.script.is_empty() && self.script_abi.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn script_info() -> AuxiliaryInfo {
        AuxiliaryInfo::script(
            InfoGroup::default().with("bytecode", InfoEntry::new("0xa11ceb0b")),
            InfoGroup::default()
                .with("name", InfoEntry::new("main"))
                .with("is_entry", InfoEntry::new("TRUE").with_format(InfoFormat::Bool))
                .with("params", InfoEntry::new(r#"["&signer", "u64"]"#).with_format(InfoFormat::JsonList))
                .with("return", InfoEntry::new("").with_format(InfoFormat::JsonList)),
        )
    }

    #[test]
    fn test_formatters_applied() {
        let abi = script_info().formatted(InfoFamily::ScriptAbi).unwrap();
        assert_eq!(abi["name"], json!("main"));
        assert_eq!(abi["is_entry"], json!(true));
        assert_eq!(abi["params"], json!(["&signer", "u64"]));
        assert_eq!(abi["return"], json!([]));
    }

    #[test]
    fn test_bad_json_list_is_error() {
        let mut info = script_info();
        assert!(info.set(InfoFamily::ScriptAbi, "params", "[oops"));
        assert!(info.formatted(InfoFamily::ScriptAbi).is_err());
    }

    #[test]
    fn test_set_only_existing_keys() {
        let mut info = script_info();
        assert!(!info.set(InfoFamily::Script, "missing", "x"));
        assert!(info.set_any("bytecode", "0x00"));
        assert_eq!(info.get(InfoFamily::Script, "bytecode"), Some("0x00"));
    }

    #[test]
    fn test_insertion_order_kept() {
        let info = script_info();
        let keys: Vec<&str> = info.script_abi.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "is_entry", "params", "return"]);
    }
}
