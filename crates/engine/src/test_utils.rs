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

//! In-memory runtime for testing the capture engine.
//!
//! Objects are shared through `Rc`, so cloning a [`FakeObject`] keeps its
//! identity and cycles can be built by storing an object inside itself.
//!
//! ```rust,ignore
//! let node = FakeObject::new("Node");
//! node.set("next", node.value());
//! let frame = FakeFrame::new("walk", "/app/list.js", 9)
//!     .scope(ScopeKind::Local, vec![("node", node.value())]);
//! let state = FakeState::new(vec![frame]);
//! ```

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    eval::{EvalError, ExpressionEvaluator},
    runtime::{
        DebugInterface, ExecutionState, FrameHandle, FunctionInfo, ObjectHandle, ObjectId,
        PropertyDescriptor, ScopeKind, ScopeMirror, ValueHandle, ValueShape,
    },
};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// A value of the fake runtime.
#[derive(Debug, Clone)]
pub enum FakeValue {
    /// Primitive in textual form
    Primitive(String),
    /// Regular expression in textual form
    RegExp(String),
    /// Function
    Function(FunctionInfo),
    /// Object
    Object(FakeObject),
    /// Value with no representation
    Unrecognized,
}

impl FakeValue {
    /// A string primitive.
    pub fn string(s: impl Into<String>) -> Self {
        Self::Primitive(s.into())
    }

    /// A number primitive.
    pub fn number(n: f64) -> Self {
        Self::Primitive(n.to_string())
    }

    /// A named function.
    pub fn function(name: &str) -> Self {
        Self::Function(FunctionInfo::named(name))
    }
}

impl ValueHandle for FakeValue {
    type Object = FakeObject;

    fn classify(&self) -> ValueShape<FakeObject> {
        match self {
            Self::Primitive(text) => ValueShape::Primitive(text.clone()),
            Self::RegExp(text) => ValueShape::RegExp(text.clone()),
            Self::Function(info) => ValueShape::Function(info.clone()),
            Self::Object(object) => ValueShape::Object(object.clone()),
            Self::Unrecognized => ValueShape::Unrecognized,
        }
    }
}

struct ObjectData {
    id: u64,
    class_name: String,
    array_like: bool,
    properties: RefCell<Vec<PropertyDescriptor<FakeValue>>>,
}

/// An object of the fake runtime.
#[derive(Clone)]
pub struct FakeObject(Rc<ObjectData>);

impl fmt::Debug for FakeObject {
    // Objects may contain themselves, so members are not printed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.0.class_name, self.0.id)
    }
}

impl FakeObject {
    /// An empty object.
    pub fn new(class_name: &str) -> Self {
        Self::with_kind(class_name, false)
    }

    /// An array with indexed elements and a native `length`.
    pub fn array(items: Vec<FakeValue>) -> Self {
        let array = Self::with_kind("Array", true);
        let length = items.len();
        for (i, item) in items.into_iter().enumerate() {
            array.set(&i.to_string(), item);
        }
        array.push(PropertyDescriptor {
            name: "length".into(),
            value: FakeValue::number(length as f64),
            is_native: true,
            has_getter: false,
        });
        array
    }

    fn with_kind(class_name: &str, array_like: bool) -> Self {
        Self(Rc::new(ObjectData {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            class_name: class_name.to_string(),
            array_like,
            properties: RefCell::new(Vec::new()),
        }))
    }

    fn push(&self, property: PropertyDescriptor<FakeValue>) {
        self.0.properties.borrow_mut().push(property);
    }

    /// Add a data property.
    pub fn set(&self, name: &str, value: FakeValue) {
        self.push(PropertyDescriptor::data(name, value));
    }

    /// Add an engine-native property.
    pub fn set_native(&self, name: &str) {
        self.push(PropertyDescriptor {
            name: name.into(),
            value: FakeValue::Unrecognized,
            is_native: true,
            has_getter: false,
        });
    }

    /// Add an accessor property.
    pub fn set_getter(&self, name: &str) {
        self.push(PropertyDescriptor {
            name: name.into(),
            value: FakeValue::Unrecognized,
            is_native: false,
            has_getter: true,
        });
    }

    /// This object as a value.
    pub fn value(&self) -> FakeValue {
        FakeValue::Object(self.clone())
    }
}

impl ObjectHandle for FakeObject {
    type Value = FakeValue;

    fn identity(&self) -> ObjectId {
        ObjectId(self.0.id)
    }

    fn class_name(&self) -> String {
        self.0.class_name.clone()
    }

    fn is_array_like(&self) -> bool {
        self.0.array_like
    }

    fn properties(&self) -> Vec<PropertyDescriptor<FakeValue>> {
        self.0.properties.borrow().clone()
    }
}

/// A stack frame of the fake runtime.
///
/// Scopes added with [`FakeFrame::scope`] are ordered innermost first and are
/// followed by an empty script scope and an empty global scope. A frame with no
/// scopes added has a single empty local scope.
#[derive(Debug, Clone)]
pub struct FakeFrame {
    function: FunctionInfo,
    path: Option<String>,
    line: u32,
    receiver: Option<FakeValue>,
    scopes: Vec<ScopeMirror<FakeValue>>,
    raw_scopes: Option<Vec<ScopeMirror<FakeValue>>>,
}

impl FakeFrame {
    /// A frame of `function` suspended at zero-based `line` of `path`.
    pub fn new(function: &str, path: &str, line: u32) -> Self {
        Self {
            function: FunctionInfo::named(function),
            path: Some(path.to_string()),
            line,
            receiver: None,
            scopes: Vec::new(),
            raw_scopes: None,
        }
    }

    /// Replace the function naming information.
    pub fn function_info(mut self, info: FunctionInfo) -> Self {
        self.function = info;
        self
    }

    /// Append a scope outside the ones added so far.
    pub fn scope(mut self, kind: ScopeKind, bindings: Vec<(&str, FakeValue)>) -> Self {
        let bindings = bindings.into_iter().map(|(n, v)| (n.to_string(), v)).collect();
        self.scopes.push(ScopeMirror { kind, bindings });
        self
    }

    /// Set the receiver.
    pub fn with_receiver(mut self, value: FakeValue) -> Self {
        self.receiver = Some(value);
        self
    }

    /// Use exactly these scopes, without the implicit script and global scopes.
    pub fn with_raw_scopes(mut self, scopes: Vec<ScopeMirror<FakeValue>>) -> Self {
        self.raw_scopes = Some(scopes);
        self
    }

    fn lookup(&self, name: &str) -> Option<FakeValue> {
        self.scopes()
            .into_iter()
            .flat_map(|scope| scope.bindings)
            .find_map(|(n, v)| (n == name).then_some(v))
    }
}

impl FrameHandle for FakeFrame {
    type Value = FakeValue;

    fn function(&self) -> FunctionInfo {
        self.function.clone()
    }

    fn script_path(&self) -> Option<String> {
        self.path.clone()
    }

    fn line(&self) -> u32 {
        self.line
    }

    fn receiver(&self) -> Option<FakeValue> {
        self.receiver.clone()
    }

    fn scopes(&self) -> Vec<ScopeMirror<FakeValue>> {
        if let Some(raw) = &self.raw_scopes {
            return raw.clone();
        }
        let mut scopes = self.scopes.clone();
        if scopes.is_empty() {
            scopes.push(ScopeMirror { kind: ScopeKind::Local, bindings: Vec::new() });
        }
        scopes.push(ScopeMirror { kind: ScopeKind::Script, bindings: Vec::new() });
        scopes.push(ScopeMirror { kind: ScopeKind::Global, bindings: Vec::new() });
        scopes
    }
}

/// A suspended stack of fake frames, innermost first.
#[derive(Debug, Clone, Default)]
pub struct FakeState {
    frames: Vec<FakeFrame>,
}

impl FakeState {
    /// A stack made of `frames`, innermost first.
    pub fn new(frames: Vec<FakeFrame>) -> Self {
        Self { frames }
    }
}

impl ExecutionState for FakeState {
    type Frame = FakeFrame;

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Option<FakeFrame> {
        self.frames.get(index).cloned()
    }
}

/// Debug interface whose raw values already are handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakeDebug;

impl DebugInterface for FakeDebug {
    type Raw = FakeValue;
    type Value = FakeValue;

    fn mirror(&self, raw: FakeValue) -> FakeValue {
        raw
    }
}

/// Evaluator answering from a fixed table, then from the frame's bindings.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEvaluator {
    answers: HashMap<String, Result<FakeValue, EvalError>>,
}

impl ScriptedEvaluator {
    /// An evaluator that only knows the frame's bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `expression` with `result`.
    pub fn answer(mut self, expression: &str, result: Result<FakeValue, EvalError>) -> Self {
        self.answers.insert(expression.to_string(), result);
        self
    }
}

impl ExpressionEvaluator<FakeFrame> for ScriptedEvaluator {
    type Raw = FakeValue;

    fn evaluate(&self, expression: &str, frame: &FakeFrame) -> Result<FakeValue, EvalError> {
        if let Some(answer) = self.answers.get(expression) {
            return answer.clone();
        }
        frame
            .lookup(expression)
            .ok_or_else(|| EvalError::Runtime(format!("ReferenceError: {expression} is not defined")))
    }
}
