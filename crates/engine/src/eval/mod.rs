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

//! Watch-expression evaluation seam.
//!
//! The capture engine consumes expression evaluation through
//! [`ExpressionEvaluator`] and never evaluates anything itself. Whether an
//! expression is free of side effects is decided by a [`SafetyValidator`];
//! [`GuardedEvaluator`] runs the validator before handing the expression to the
//! underlying evaluator, so rejected expressions are never executed.
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! let evaluator = GuardedEvaluator::new(MySideEffectChecker, MyRuntimeEvaluator);
//! let snapshot = capture(&state, &expressions, &config, &debug, &evaluator)?;
//! ```

use auto_impl::auto_impl;
use thiserror::Error;

/// Why an expression produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The expression could not be parsed
    #[error("{0}")]
    Parse(String),
    /// The safety validator refused to run the expression
    #[error("{0}")]
    Rejected(String),
    /// Evaluation started but faulted
    #[error("{0}")]
    Runtime(String),
}

/// Evaluates watch expressions against a frame of type `F`.
#[auto_impl(&, Box, Rc, Arc)]
pub trait ExpressionEvaluator<F> {
    /// Raw runtime value produced by evaluation
    type Raw;

    /// Evaluate `expression` in the lexical context of `frame`.
    fn evaluate(&self, expression: &str, frame: &F) -> Result<Self::Raw, EvalError>;
}

/// Decides whether an expression may be evaluated without side effects.
#[auto_impl(&, Box, Rc, Arc)]
pub trait SafetyValidator {
    /// `Ok` if the expression is safe to run, otherwise the reason it is not.
    fn validate(&self, expression: &str) -> Result<(), String>;
}

/// An evaluator that only runs expressions its validator accepts.
#[derive(Debug, Clone)]
pub struct GuardedEvaluator<V, E> {
    validator: V,
    inner: E,
}

impl<V, E> GuardedEvaluator<V, E> {
    /// Guard `inner` with `validator`.
    pub fn new(validator: V, inner: E) -> Self {
        Self { validator, inner }
    }
}

impl<F, V, E> ExpressionEvaluator<F> for GuardedEvaluator<V, E>
where
    V: SafetyValidator,
    E: ExpressionEvaluator<F>,
{
    type Raw = E::Raw;

    fn evaluate(&self, expression: &str, frame: &F) -> Result<Self::Raw, EvalError> {
        self.validator.validate(expression).map_err(EvalError::Rejected)?;
        self.inner.evaluate(expression, frame)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Counting<'a> {
        calls: &'a Cell<usize>,
    }

    impl ExpressionEvaluator<()> for Counting<'_> {
        type Raw = i64;

        fn evaluate(&self, _expression: &str, _frame: &()) -> Result<i64, EvalError> {
            self.calls.set(self.calls.get() + 1);
            Ok(7)
        }
    }

    struct NoAssignments;

    impl SafetyValidator for NoAssignments {
        fn validate(&self, expression: &str) -> Result<(), String> {
            if expression.contains('=') {
                Err("Possible side effect due to assignment".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_rejected_expression_is_never_evaluated() {
        let calls = Cell::new(0);
        let guarded = GuardedEvaluator::new(NoAssignments, Counting { calls: &calls });

        let err = guarded.evaluate("x = 1", &()).unwrap_err();
        assert_eq!(err, EvalError::Rejected("Possible side effect due to assignment".into()));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_accepted_expression_is_delegated() {
        let calls = Cell::new(0);
        let guarded = GuardedEvaluator::new(NoAssignments, Counting { calls: &calls });

        assert_eq!(guarded.evaluate("x + 1", &()), Ok(7));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_error_display_is_the_description() {
        assert_eq!(EvalError::Parse("Unexpected token".into()).to_string(), "Unexpected token");
    }
}
