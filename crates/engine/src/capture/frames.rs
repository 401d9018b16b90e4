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

//! Stack frame selection and resolution.

use std::path::{Component, Path, PathBuf};

use itertools::Itertools;
use rdb_common::types::{SourceLocation, StackFrame, Variable, FRAME_DEPTH_LIMIT_INDEX};
use tracing::trace;

use crate::{
    capture::{classify::function_name, CaptureError, Capturer},
    runtime::{ExecutionState, FrameHandle, ValueHandle},
};

impl<V: ValueHandle> Capturer<'_, V> {
    /// Captured frames, innermost first.
    ///
    /// At most `max_frames` raw frames are inspected. Frames outside the
    /// project root (or inside a dependency directory) are dropped; frames at
    /// or beyond `max_expand_frames` in the full stack get a marker instead of
    /// their arguments and locals.
    pub(crate) fn resolve_frames<S>(&mut self, state: &S) -> Result<Vec<StackFrame>, CaptureError>
    where
        S: ExecutionState,
        S::Frame: FrameHandle<Value = V>,
    {
        let count = state.frame_count().min(self.config.max_frames);
        let mut frames = Vec::new();

        for position in 0..count {
            let Some(frame) = state.frame(position) else { break };
            let Some(path) = frame.script_path().and_then(|p| self.relative_source_path(&p))
            else {
                trace!(frame = position, "frame not attributable to project source, skipped");
                continue;
            };

            let (arguments, locals) = if position < self.config.max_expand_frames {
                (Vec::new(), self.resolve_locals(&frame, position)?)
            } else {
                let arguments = Variable::reference("arguments_not_available", FRAME_DEPTH_LIMIT_INDEX);
                let locals = Variable::reference("locals_not_available", FRAME_DEPTH_LIMIT_INDEX);
                (vec![self.charge(arguments)], vec![self.charge(locals)])
            };

            frames.push(StackFrame {
                function_name: function_name(&frame.function()),
                location: SourceLocation { path, line: frame.line().saturating_add(1) },
                arguments,
                locals,
            });
        }

        Ok(frames)
    }

    /// `script_path` relative to the project root, `/`-separated, or `None`
    /// when the frame is not eligible for capture.
    pub(crate) fn relative_source_path(&self, script_path: &str) -> Option<String> {
        let root = normalize(&self.config.project_root);
        let path = normalize(&root.join(script_path));
        let relative = path.strip_prefix(&root).ok()?;

        let mut components = relative.components().map(|c| c.as_os_str().to_string_lossy());
        let first = components.next()?;
        if !self.config.include_dependency_directories
            && self.config.dependency_directories.iter().any(|dir| *dir == first)
        {
            return None;
        }

        Some(std::iter::once(first).chain(components).join("/"))
    }
}

/// Absolute, lexically normalized form of `path`: `.` components dropped,
/// `..` applied to the preceding component.
fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use rdb_common::CaptureConfig;

    use super::*;
    use crate::test_utils::{FakeFrame, FakeState, FakeValue};

    fn capturer(config: &CaptureConfig) -> Capturer<'_, FakeValue> {
        Capturer::new(config)
    }

    #[test]
    fn test_relative_path_inside_root() {
        let config = CaptureConfig::default().with_project_root("/srv/app");
        let capturer = capturer(&config);
        assert_eq!(capturer.relative_source_path("/srv/app/lib/a.js").as_deref(), Some("lib/a.js"));
        assert_eq!(
            capturer.relative_source_path("/srv/app/./lib/../b.js").as_deref(),
            Some("b.js")
        );
    }

    #[test]
    fn test_path_outside_root_rejected() {
        let config = CaptureConfig::default().with_project_root("/srv/app");
        let capturer = capturer(&config);
        assert_eq!(capturer.relative_source_path("/srv/other/a.js"), None);
        assert_eq!(capturer.relative_source_path("/srv/app/../other/a.js"), None);
        assert_eq!(capturer.relative_source_path("/srv/application/a.js"), None);
    }

    #[test]
    fn test_dependency_directories() {
        let config = CaptureConfig::default().with_project_root("/srv/app");
        assert_eq!(capturer(&config).relative_source_path("/srv/app/node_modules/x/i.js"), None);

        let config = config.with_dependency_directories_included(true);
        assert_eq!(
            capturer(&config).relative_source_path("/srv/app/node_modules/x/i.js").as_deref(),
            Some("node_modules/x/i.js")
        );
    }

    #[test]
    fn test_relative_script_path_resolves_against_root() {
        let config = CaptureConfig::default().with_project_root("/srv/app");
        assert_eq!(capturer(&config).relative_source_path("src/a.js").as_deref(), Some("src/a.js"));
    }

    #[test]
    fn test_line_is_one_based_and_saturates() {
        let config = CaptureConfig::default().with_project_root("/srv/app");
        let state = FakeState::new(vec![
            FakeFrame::new("f", "/srv/app/a.js", 0),
            FakeFrame::new("g", "/srv/app/a.js", u32::MAX),
        ]);

        let frames = capturer(&config).resolve_frames(&state).unwrap();
        assert_eq!(frames[0].location.line, 1);
        assert_eq!(frames[1].location.line, u32::MAX);
    }
}
