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

//! Snapshot capture engine.
//!
//! A capture runs to completion on the thread that suspended the program and
//! proceeds in one pass:
//!
//! 1. **Expressions**: watch expressions are evaluated against the top frame.
//!    They run first so that objects they return get the lowest table slots
//!    and are resolved before anything else when the budget is tight.
//! 2. **Frames**: eligible frames are resolved, their locals classified.
//! 3. **Drain**: queued objects are resolved in slot order, discovering more
//!    objects as they go, while the size budget has room.
//! 4. **Truncate**: if objects remain queued, every reference to them is
//!    redirected to the buffer-full sentinel.
//!
//! Nothing is cached across captures and the inspected program is never asked
//! to run code: getters and native properties are replaced by sentinels.

mod budget;
mod classify;
mod error;
mod frames;
mod scope;
mod table;

pub use classify::{function_name, function_text, ANONYMOUS_FUNCTION};
pub use error::CaptureError;
pub use scope::RECEIVER_NAME;

use rdb_common::{
    types::{Snapshot, StackFrame, StatusMessage, Variable, RESERVED_SLOTS},
    CaptureConfig,
};
use tracing::{debug, debug_span, warn};

use crate::{
    eval::ExpressionEvaluator,
    runtime::{DebugInterface, ExecutionState, FrameHandle, ValueHandle},
};

use self::{
    budget::{truncate, Budget},
    table::ObjectTable,
};

/// Capture a snapshot of a suspended program.
///
/// `expressions` are evaluated against the innermost frame through
/// `evaluator` exactly as given, and each result is named by its expression
/// text. Results are boxed by `debug`. A failing expression
/// yields a variable with an error status and never aborts the capture.
///
/// # Errors
///
/// Returns a [`CaptureError`] only when `config.strict_invariants` is set and
/// the runtime violates a structural invariant. Otherwise violations are
/// logged and the capture degrades.
pub fn capture<S, D, E>(
    state: &S,
    expressions: &[String],
    config: &CaptureConfig,
    debug: &D,
    evaluator: &E,
) -> Result<Snapshot, CaptureError>
where
    S: ExecutionState,
    S::Frame: FrameHandle<Value = D::Value>,
    D: DebugInterface,
    E: ExpressionEvaluator<S::Frame, Raw = D::Raw>,
{
    let span = debug_span!("capture", frames = state.frame_count(), expressions = expressions.len());
    let _enter = span.enter();

    let mut capturer = Capturer::<D::Value>::new(config);
    let evaluated_expressions = capturer.evaluate_expressions(state, expressions, debug, evaluator);
    let stack_frames = capturer.resolve_frames(state)?;
    capturer.drain()?;
    Ok(capturer.finish(stack_frames, evaluated_expressions))
}

/// State of one capture.
pub(crate) struct Capturer<'c, V: ValueHandle> {
    config: &'c CaptureConfig,
    table: ObjectTable<V::Object>,
    budget: Budget,
}

impl<'c, V: ValueHandle> Capturer<'c, V> {
    pub(crate) fn new(config: &'c CaptureConfig) -> Self {
        Self {
            config,
            table: ObjectTable::new(sentinels(config)),
            budget: Budget::new(config.max_data_size),
        }
    }

    /// Charge a produced variable to the budget and hand it back.
    fn charge(&mut self, variable: Variable) -> Variable {
        self.budget.charge(&variable);
        variable
    }

    /// Report a structural invariant violation: fatal in strict mode, logged otherwise.
    fn violation(&self, error: CaptureError) -> Result<(), CaptureError> {
        if self.config.strict_invariants {
            return Err(error);
        }
        warn!(%error, "invariant violated, continuing with best-effort capture");
        Ok(())
    }

    fn evaluate_expressions<S, D, E>(
        &mut self,
        state: &S,
        expressions: &[String],
        debug: &D,
        evaluator: &E,
    ) -> Vec<Variable>
    where
        S: ExecutionState,
        D: DebugInterface<Value = V>,
        E: ExpressionEvaluator<S::Frame, Raw = D::Raw>,
    {
        if expressions.is_empty() {
            return Vec::new();
        }

        let top = state.frame(0);
        expressions
            .iter()
            .map(|expression| {
                let name = expression.clone();
                let outcome = match &top {
                    Some(frame) => evaluator.evaluate(expression, frame).map_err(|e| e.to_string()),
                    None => Err("No stack frame to evaluate the expression in".to_string()),
                };
                match outcome {
                    Ok(raw) => self.resolve_variable(name, &debug.mirror(raw), true),
                    Err(description) => {
                        debug!(expression = %name, %description, "watch expression failed");
                        self.charge(Variable::error(name, StatusMessage::name_error(description)))
                    }
                }
            })
            .collect()
    }

    /// Resolve queued objects while the budget has room.
    fn drain(&mut self) -> Result<(), CaptureError> {
        while self.budget.has_room() {
            let Some(pending) = self.table.next_pending() else { break };
            let entry = self.resolve_object(&pending.handle, pending.evaluated);
            if let Err(error) = self.table.set_resolved(pending.index, entry) {
                self.violation(error)?;
            }
        }
        Ok(())
    }

    fn finish(self, stack_frames: Vec<StackFrame>, evaluated_expressions: Vec<Variable>) -> Snapshot {
        let exhausted = self.table.has_pending();
        let slots = self.table.len();
        let used = self.budget.used();

        let mut snapshot = Snapshot {
            stack_frames,
            variable_table: self.table.into_resolved(),
            evaluated_expressions,
        };
        if exhausted {
            let retained = snapshot.variable_table.len();
            truncate(&mut snapshot, retained);
        }

        debug!(
            frames = snapshot.stack_frames.len(),
            slots,
            resolved = snapshot.variable_table.len(),
            used,
            truncated = exhausted,
            "capture finished"
        );
        snapshot
    }
}

/// The reserved table entries, in slot order.
fn sentinels(config: &CaptureConfig) -> [Variable; RESERVED_SLOTS] {
    let entry = |description: String| Variable::default().with_status(StatusMessage::value_error(description));
    [
        entry(format!(
            "Max data size reached ({} bytes). Use an expression to see more data.",
            config.max_data_size
        )),
        entry("Native properties are not available".to_string()),
        entry("Properties with getters are not available".to_string()),
        entry(format!(
            "Locals and arguments are only displayed for the top `max_expand_frames` ({}) stack frames.",
            config.max_expand_frames
        )),
    ]
}
