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

//! Scope chain resolution of a single frame.

use std::collections::HashSet;

use rdb_common::types::Variable;
use tracing::debug;

use crate::{
    capture::{CaptureError, Capturer},
    runtime::{FrameHandle, ScopeKind, ScopeMirror, ValueHandle},
};

/// Name under which the frame's receiver is captured.
pub const RECEIVER_NAME: &str = "context";

impl<V: ValueHandle> Capturer<'_, V> {
    /// Locals visible in `frame`, inner declarations shadowing outer ones,
    /// followed by the receiver.
    ///
    /// The global and script scopes are never captured, and neither is a
    /// module wrapper closure directly inside them: its bindings would show up
    /// in every frame of the module.
    pub(crate) fn resolve_locals<F>(
        &mut self,
        frame: &F,
        position: usize,
    ) -> Result<Vec<Variable>, CaptureError>
    where
        F: FrameHandle<Value = V>,
    {
        let scopes = frame.scopes();
        let excluded = self.excluded_scopes(&scopes, position)?;

        let mut seen = HashSet::new();
        let mut locals = Vec::new();
        for scope in &scopes[..scopes.len() - excluded] {
            for (name, value) in &scope.bindings {
                if seen.insert(name.as_str()) {
                    locals.push(self.resolve_variable(name.clone(), value, false));
                }
            }
        }

        if let Some(receiver) = frame.receiver() {
            if seen.contains(RECEIVER_NAME) {
                debug!(frame = position, "receiver not captured, a local is already named `{RECEIVER_NAME}`");
            } else {
                locals.push(self.resolve_variable(RECEIVER_NAME.to_string(), &receiver, false));
            }
        }

        Ok(locals)
    }

    /// Number of outermost scopes hidden from the capture.
    fn excluded_scopes(
        &self,
        scopes: &[ScopeMirror<V>],
        position: usize,
    ) -> Result<usize, CaptureError> {
        let count = scopes.len();
        let well_formed = count >= 3
            && scopes[count - 1].kind == ScopeKind::Global
            && scopes[count - 2].kind == ScopeKind::Script;

        if !well_formed {
            self.violation(CaptureError::UnsupportedScopeChain {
                frame: position,
                kinds: scopes.iter().map(|s| s.kind).collect(),
            })?;
            // Best effort: hide whatever global or script scopes trail the chain
            return Ok(scopes
                .iter()
                .rev()
                .take_while(|s| matches!(s.kind, ScopeKind::Global | ScopeKind::Script))
                .count());
        }

        Ok(if scopes[count - 3].kind == ScopeKind::Closure { 3 } else { 2 })
    }
}
