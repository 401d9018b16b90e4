// RDB - Remote Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Point-in-time snapshot of a suspended program.
//!
//! A [`Snapshot`] is the only artifact a capture produces. Objects reachable from
//! the stack are flattened into [`Snapshot::variable_table`]; every other
//! [`Variable`] refers to them through `var_table_index`. The first
//! [`RESERVED_SLOTS`] entries of the table are canned status entries shared by
//! every reference that could not carry real data.

use serde::{Deserialize, Serialize};

/// Table index of the "buffer full" sentinel.
pub const BUFFER_FULL_INDEX: usize = 0;
/// Table index of the "native property unavailable" sentinel.
pub const NATIVE_PROPERTY_INDEX: usize = 1;
/// Table index of the "getter unavailable" sentinel.
pub const GETTER_INDEX: usize = 2;
/// Table index of the "arguments and locals not captured beyond the depth cap" sentinel.
pub const FRAME_DEPTH_LIMIT_INDEX: usize = 3;
/// Number of table slots reserved for sentinels.
pub const RESERVED_SLOTS: usize = 4;

/// What part of a variable a [`StatusMessage`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefersTo {
    /// The status explains the (missing, truncated or replaced) value.
    VariableValue,
    /// The status concerns the variable's name, e.g. an expression that failed to evaluate.
    VariableName,
}

/// Informational or error notice attached to a [`Variable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    /// Which part of the variable this status refers to
    pub refers_to: RefersTo,
    /// Human readable description
    pub description: String,
    /// Whether this status reports a failure rather than a limit
    pub is_error: bool,
}

impl StatusMessage {
    /// Non-error notice about a variable's value.
    pub fn info(description: impl Into<String>) -> Self {
        Self { refers_to: RefersTo::VariableValue, description: description.into(), is_error: false }
    }

    /// Error about a variable's value.
    pub fn value_error(description: impl Into<String>) -> Self {
        Self { refers_to: RefersTo::VariableValue, description: description.into(), is_error: true }
    }

    /// Error about a variable's name (used for failed watch expressions).
    pub fn name_error(description: impl Into<String>) -> Self {
        Self { refers_to: RefersTo::VariableName, description: description.into(), is_error: true }
    }
}

/// A named datum in a snapshot.
///
/// Leaf variables carry either `value` (primitives and functions), a
/// `var_table_index` (objects), or an error `status`. Entries of the variable
/// table carry `members` once the referenced object has been resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Variable name; empty for table entries and notices
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Textual value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Index into [`Snapshot::variable_table`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_table_index: Option<usize>,
    /// Attached notice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMessage>,
    /// Resolved members of an object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Variable>,
}

impl Variable {
    /// A variable carrying a textual value.
    pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: Some(value.into()), ..Default::default() }
    }

    /// A variable referring to a slot of the variable table.
    pub fn reference(name: impl Into<String>, index: usize) -> Self {
        Self { name: name.into(), var_table_index: Some(index), ..Default::default() }
    }

    /// A variable that could not be produced, with the reason as an error status.
    pub fn error(name: impl Into<String>, status: StatusMessage) -> Self {
        Self { name: name.into(), status: Some(status), ..Default::default() }
    }

    /// Attach a status to this variable.
    pub fn with_status(mut self, status: StatusMessage) -> Self {
        self.status = Some(status);
        self
    }

    /// Visit this variable and all of its members, depth first.
    pub fn walk(&self, f: &mut impl FnMut(&Self)) {
        f(self);
        for member in &self.members {
            member.walk(f);
        }
    }

    /// Mutable counterpart of [`Variable::walk`].
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Self)) {
        f(self);
        for member in &mut self.members {
            member.walk_mut(f);
        }
    }
}

/// Source position of a stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path relative to the project root, `/`-separated
    pub path: String,
    /// One-based line number
    pub line: u32,
}

/// One captured stack frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
    /// Resolved function name
    pub function_name: String,
    /// Where the frame is suspended
    pub location: SourceLocation,
    /// Arguments of the frame
    #[serde(default)]
    pub arguments: Vec<Variable>,
    /// Local variables visible in the frame
    #[serde(default)]
    pub locals: Vec<Variable>,
}

/// Result of one capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Captured frames in call order, innermost first
    pub stack_frames: Vec<StackFrame>,
    /// Flattened, deduplicated objects
    pub variable_table: Vec<Variable>,
    /// Results of the watch expressions, in request order
    pub evaluated_expressions: Vec<Variable>,
}

impl Snapshot {
    /// Visit every variable reachable from the snapshot: frame arguments and
    /// locals, evaluated expressions and table entries, including members.
    pub fn for_each_variable(&self, mut f: impl FnMut(&Variable)) {
        for frame in &self.stack_frames {
            frame.arguments.iter().chain(&frame.locals).for_each(|v| v.walk(&mut f));
        }
        self.evaluated_expressions.iter().for_each(|v| v.walk(&mut f));
        self.variable_table.iter().for_each(|v| v.walk(&mut f));
    }

    /// Mutable counterpart of [`Snapshot::for_each_variable`].
    pub fn for_each_variable_mut(&mut self, mut f: impl FnMut(&mut Variable)) {
        for frame in &mut self.stack_frames {
            frame.arguments.iter_mut().chain(&mut frame.locals).for_each(|v| v.walk_mut(&mut f));
        }
        self.evaluated_expressions.iter_mut().for_each(|v| v.walk_mut(&mut f));
        self.variable_table.iter_mut().for_each(|v| v.walk_mut(&mut f));
    }

    /// Serialize into the JSON shape expected by the remote debugging service.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_serializes_camel_case_and_skips_absent_fields() {
        let var = Variable::reference("obj", 7);
        let json = serde_json::to_string(&var).unwrap();
        assert_eq!(json, r#"{"name":"obj","varTableIndex":7}"#);
    }

    #[test]
    fn test_status_serialization() {
        let var = Variable::error("1 +", StatusMessage::name_error("unexpected end of input"));
        let json = serde_json::to_value(&var).unwrap();
        assert_eq!(json["status"]["refersTo"], "VARIABLE_NAME");
        assert_eq!(json["status"]["isError"], true);
    }

    #[test]
    fn test_for_each_variable_reaches_nested_members() {
        let mut entry = Variable::value("", "Object");
        entry.members.push(Variable::reference("inner", 5));
        let snapshot = Snapshot {
            stack_frames: vec![StackFrame {
                function_name: "main".into(),
                location: SourceLocation { path: "index.js".into(), line: 3 },
                arguments: vec![],
                locals: vec![Variable::reference("a", 4)],
            }],
            variable_table: vec![entry],
            evaluated_expressions: vec![Variable::value("1 + 1", "2")],
        };

        let mut names = Vec::new();
        snapshot.for_each_variable(|v| names.push(v.name.clone()));
        assert_eq!(names, vec!["a", "1 + 1", "", "inner"]);
    }

    #[test]
    fn test_for_each_variable_mut_rewrites() {
        let mut snapshot = Snapshot {
            evaluated_expressions: vec![Variable::reference("x", 9)],
            ..Default::default()
        };
        snapshot.for_each_variable_mut(|v| v.var_table_index = Some(BUFFER_FULL_INDEX));
        assert_eq!(snapshot.evaluated_expressions[0].var_table_index, Some(BUFFER_FULL_INDEX));
    }
}
