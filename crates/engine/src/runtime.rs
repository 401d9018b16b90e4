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

//! Capability set of the inspected runtime.
//!
//! The capture engine never talks to a concrete debug API. Everything it needs
//! from the suspended program is expressed by the traits in this module, which
//! an agent implements on top of its runtime's debugger bindings (and which
//! the `test_utils` module implements in memory).
//!
//! # Traits
//!
//! - [`ExecutionState`] - the suspended stack
//! - [`FrameHandle`] - one stack frame: function, location, receiver, scopes
//! - [`ValueHandle`] - an opaque value, classified into a [`ValueShape`]
//! - [`ObjectHandle`] - an object with a stable identity and enumerable properties
//! - [`DebugInterface`] - wraps arbitrary runtime values (e.g. expression results) into handles
//!
//! None of these traits may run user code: implementations must read
//! properties without invoking getters and must not evaluate anything.

use auto_impl::auto_impl;
use derive_more::{Display, From};

/// Identity of a heap object in the inspected runtime.
///
/// Two handles with equal identities denote the same object (reference
/// equality), regardless of their contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[display("#{_0}")]
pub struct ObjectId(pub u64);

/// Naming information of a function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionInfo {
    /// Name given in the source, if any
    pub name: Option<String>,
    /// Name inferred by the runtime from the surrounding assignment, if any
    pub inferred_name: Option<String>,
}

impl FunctionInfo {
    /// A function with an explicit name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), inferred_name: None }
    }

    /// The explicit name, else the inferred name. Empty names count as absent.
    pub fn resolved_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.inferred_name.as_deref().filter(|n| !n.is_empty()))
    }
}

/// Shape of a value as reported by the runtime.
#[derive(Debug, Clone)]
pub enum ValueShape<O> {
    /// Primitive value in the runtime's own textual form
    Primitive(String),
    /// Regular expression in the runtime's own textual form
    RegExp(String),
    /// Function
    Function(FunctionInfo),
    /// Object with identity and properties
    Object(O),
    /// Anything the engine has no representation for
    Unrecognized,
}

/// One own property of an object.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor<V> {
    /// Property name
    pub name: String,
    /// Stored value; meaningless for native properties and accessors
    pub value: V,
    /// Property is implemented by the engine rather than stored on the object
    pub is_native: bool,
    /// Property is an accessor with a getter
    pub has_getter: bool,
}

impl<V> PropertyDescriptor<V> {
    /// A plain data property.
    pub fn data(name: impl Into<String>, value: V) -> Self {
        Self { name: name.into(), value, is_native: false, has_getter: false }
    }
}

/// Opaque handle to a value of the inspected runtime.
pub trait ValueHandle: Clone {
    /// Handle type for object values
    type Object: ObjectHandle<Value = Self>;

    /// Determine the shape of this value.
    fn classify(&self) -> ValueShape<Self::Object>;
}

/// Opaque handle to an object of the inspected runtime.
pub trait ObjectHandle: Clone {
    /// Handle type for property values
    type Value: ValueHandle<Object = Self>;

    /// Reference identity of the object.
    fn identity(&self) -> ObjectId;

    /// Short description of the object, e.g. its constructor name.
    fn class_name(&self) -> String;

    /// Whether the object is array-like, which makes its `length` safe to read.
    fn is_array_like(&self) -> bool;

    /// Own properties in enumeration order.
    fn properties(&self) -> Vec<PropertyDescriptor<Self::Value>>;
}

/// Kind of a lexical scope in a frame's scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ScopeKind {
    /// Global object scope
    Global,
    /// Top-level script scope (`let`/`const` at script level)
    Script,
    /// Function-local scope
    Local,
    /// Closure scope captured by the function
    Closure,
    /// Block scope
    Block,
    /// `catch` clause scope
    Catch,
    /// `with` statement scope
    With,
    /// ES module scope
    Module,
    /// `eval` scope
    Eval,
}

/// One lexical scope with its bindings in declaration order.
#[derive(Debug, Clone)]
pub struct ScopeMirror<V> {
    /// Kind of the scope
    pub kind: ScopeKind,
    /// Bindings declared in the scope
    pub bindings: Vec<(String, V)>,
}

/// Handle to one suspended stack frame.
pub trait FrameHandle {
    /// Handle type for values reachable from the frame
    type Value: ValueHandle;

    /// The function executing in this frame.
    fn function(&self) -> FunctionInfo;

    /// Absolute path of the script, if the frame has one.
    fn script_path(&self) -> Option<String>;

    /// Zero-based line the frame is suspended at.
    fn line(&self) -> u32;

    /// The invocation receiver; `None` when it is undefined or null.
    fn receiver(&self) -> Option<Self::Value>;

    /// The scope chain, innermost scope first.
    fn scopes(&self) -> Vec<ScopeMirror<Self::Value>>;
}

/// The stack of a suspended program.
#[auto_impl(&, Box, Rc, Arc)]
pub trait ExecutionState {
    /// Frame handle type
    type Frame: FrameHandle;

    /// Number of frames on the stack.
    fn frame_count(&self) -> usize;

    /// Frame at `index`, `0` being the innermost.
    fn frame(&self, index: usize) -> Option<Self::Frame>;
}

/// Boxes arbitrary runtime values into handles the engine can classify.
#[auto_impl(&, Box, Rc, Arc)]
pub trait DebugInterface {
    /// Raw runtime value, as produced by expression evaluation
    type Raw;
    /// Handle type produced
    type Value: ValueHandle;

    /// Wrap a raw value into a handle.
    fn mirror(&self, raw: Self::Raw) -> Self::Value;
}
