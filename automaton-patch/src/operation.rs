//! Patch operations (RFC 6902).
//!
//! Operations serialize the way JSON Patch documents spell them:
//!
//! ```json
//! {"op": "replace", "path": "/state", "value": "COMPLETED"}
//! {"op": "move", "from": "/draft", "path": "/final"}
//! ```
//!
//! Equality is structural: two operations are equal when kind, paths and
//! values are equal. Guard matching relies on nothing else.

use crate::error::PatchError;
use json_patch::PatchOperation as Op;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Kind of a patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Replace => "replace",
            OpKind::Move => "move",
            OpKind::Copy => "copy",
            OpKind::Test => "test",
        };
        f.write_str(s)
    }
}

/// A single JSON Patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchOperation(Op);

impl PatchOperation {
    /// Builds an operation from its JSON Patch form, validating paths.
    pub fn from_value(value: Value) -> Result<Self, PatchError> {
        serde_json::from_value(value).map_err(|e| PatchError::InvalidOperation {
            reason: e.to_string(),
        })
    }

    pub fn add(path: &str, value: impl Into<Value>) -> Result<Self, PatchError> {
        Self::from_value(json!({"op": "add", "path": path, "value": value.into()}))
    }

    pub fn remove(path: &str) -> Result<Self, PatchError> {
        Self::from_value(json!({"op": "remove", "path": path}))
    }

    pub fn replace(path: &str, value: impl Into<Value>) -> Result<Self, PatchError> {
        Self::from_value(json!({"op": "replace", "path": path, "value": value.into()}))
    }

    pub fn move_value(from: &str, path: &str) -> Result<Self, PatchError> {
        Self::from_value(json!({"op": "move", "from": from, "path": path}))
    }

    pub fn copy_value(from: &str, path: &str) -> Result<Self, PatchError> {
        Self::from_value(json!({"op": "copy", "from": from, "path": path}))
    }

    pub fn test(path: &str, value: impl Into<Value>) -> Result<Self, PatchError> {
        Self::from_value(json!({"op": "test", "path": path, "value": value.into()}))
    }

    /// Returns the operation kind.
    pub fn kind(&self) -> OpKind {
        match &self.0 {
            Op::Add(_) => OpKind::Add,
            Op::Remove(_) => OpKind::Remove,
            Op::Replace(_) => OpKind::Replace,
            Op::Move(_) => OpKind::Move,
            Op::Copy(_) => OpKind::Copy,
            Op::Test(_) => OpKind::Test,
        }
    }

    /// Returns the target path.
    pub fn path(&self) -> String {
        match &self.0 {
            Op::Add(op) => op.path.to_string(),
            Op::Remove(op) => op.path.to_string(),
            Op::Replace(op) => op.path.to_string(),
            Op::Move(op) => op.path.to_string(),
            Op::Copy(op) => op.path.to_string(),
            Op::Test(op) => op.path.to_string(),
        }
    }

    /// Returns the source path for `move` and `copy`.
    pub fn source(&self) -> Option<String> {
        match &self.0 {
            Op::Move(op) => Some(op.from.to_string()),
            Op::Copy(op) => Some(op.from.to_string()),
            _ => None,
        }
    }

    /// Returns the operand value for `add`, `replace` and `test`.
    pub fn value(&self) -> Option<&Value> {
        match &self.0 {
            Op::Add(op) => Some(&op.value),
            Op::Replace(op) => Some(&op.value),
            Op::Test(op) => Some(&op.value),
            _ => None,
        }
    }

    pub fn as_json_patch(&self) -> &Op {
        &self.0
    }

    /// Applies the operation to `doc`. On error `doc` is left untouched.
    pub fn apply(&self, doc: &mut Value) -> Result<(), PatchError> {
        json_patch::patch(doc, std::slice::from_ref(&self.0)).map_err(|e| PatchError::Failed {
            op: self.kind(),
            path: self.path(),
            reason: e.to_string(),
        })
    }

    /// Returns a patched copy of `doc`.
    pub fn applied_to(&self, doc: &Value) -> Result<Value, PatchError> {
        let mut patched = doc.clone();
        self.apply(&mut patched)?;
        Ok(patched)
    }
}

impl From<Op> for PatchOperation {
    fn from(op: Op) -> Self {
        Self(op)
    }
}

impl fmt::Display for PatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
