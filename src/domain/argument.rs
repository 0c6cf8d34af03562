//! Argument Model - the ordered, editable argument list of an editor session

use thiserror::Error;

use crate::domain::coerce::NativeValue;

/// Value of an argument before dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// User-entered source text
    Text(String),
    /// Pre-filled native value (template presets)
    Native(NativeValue),
}

impl ArgValue {
    /// Empty text or an explicit null
    pub fn is_empty(&self) -> bool {
        match self {
            ArgValue::Text(s) => s.trim().is_empty(),
            ArgValue::Native(v) => v.is_null(),
        }
    }
}

impl Default for ArgValue {
    fn default() -> Self {
        ArgValue::Text(String::new())
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::Text(s.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::Text(s)
    }
}

impl From<NativeValue> for ArgValue {
    fn from(v: NativeValue) -> Self {
        ArgValue::Native(v)
    }
}

/// A single typed argument
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub kind: String,
    pub value: ArgValue,
    pub name: Option<String>,
    pub required: bool,
    /// Label only
    pub comment: Option<String>,
}

impl Argument {
    /// Empty argument of `kind`, required by default
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: ArgValue::default(),
            name: None,
            required: true,
            comment: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<ArgValue>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Label shown next to the input: the comment, else the name, else the kind
    pub fn label(&self) -> &str {
        self.comment
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentModelError {
    #[error("argument index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("this template's argument list cannot be reshaped")]
    FixedShape,
}

/// Ordered argument list. Iteration order is the order arguments are passed
/// to the call site; nothing here reorders.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentModel {
    args: Vec<Argument>,
    adjustable: bool,
}

impl Default for ArgumentModel {
    fn default() -> Self {
        Self::new(Vec::new(), true)
    }
}

impl ArgumentModel {
    pub fn new(args: Vec<Argument>, adjustable: bool) -> Self {
        Self { args, adjustable }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.args.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.args.iter()
    }

    pub fn as_slice(&self) -> &[Argument] {
        &self.args
    }

    pub fn push(&mut self, arg: Argument) -> Result<(), ArgumentModelError> {
        if !self.adjustable {
            return Err(ArgumentModelError::FixedShape);
        }
        self.args.push(arg);
        Ok(())
    }

    /// Append an argument with empty kind and value
    pub fn push_empty(&mut self) -> Result<(), ArgumentModelError> {
        self.push(Argument::new(""))
    }

    pub fn remove(&mut self, index: usize) -> Result<Argument, ArgumentModelError> {
        if !self.adjustable {
            return Err(ArgumentModelError::FixedShape);
        }
        self.check_index(index)?;
        Ok(self.args.remove(index))
    }

    pub fn replace(&mut self, index: usize, arg: Argument) -> Result<Argument, ArgumentModelError> {
        self.check_index(index)?;
        Ok(std::mem::replace(&mut self.args[index], arg))
    }

    pub fn set_value(
        &mut self,
        index: usize,
        value: impl Into<ArgValue>,
    ) -> Result<(), ArgumentModelError> {
        self.check_index(index)?;
        self.args[index].value = value.into();
        Ok(())
    }

    pub fn set_kind(&mut self, index: usize, kind: impl Into<String>) -> Result<(), ArgumentModelError> {
        self.check_index(index)?;
        self.args[index].kind = kind.into();
        Ok(())
    }

    /// Set the value of the argument named `name`, returning false when absent
    pub fn set_named(&mut self, name: &str, value: impl Into<ArgValue>) -> bool {
        match self.args.iter_mut().find(|a| a.name.as_deref() == Some(name)) {
            Some(arg) => {
                arg.value = value.into();
                true
            }
            None => false,
        }
    }

    /// At least one argument exists and none carries a value
    pub fn all_values_empty(&self) -> bool {
        !self.args.is_empty() && self.args.iter().all(|a| a.value.is_empty())
    }

    fn check_index(&self, index: usize) -> Result<(), ArgumentModelError> {
        if index < self.args.len() {
            Ok(())
        } else {
            Err(ArgumentModelError::IndexOutOfRange {
                index,
                len: self.args.len(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a ArgumentModel {
    type Item = &'a Argument;
    type IntoIter = std::slice::Iter<'a, Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.iter()
    }
}
