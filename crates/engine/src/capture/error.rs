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

//! Structural invariant violations of a capture.
//!
//! Per-datum failures (a failing expression, a getter, a native property) are
//! never errors; they become variables with a status. The errors here mean the
//! runtime handed the engine something it cannot represent faithfully, or the
//! engine itself broke an invariant.

use itertools::Itertools;
use thiserror::Error;

use crate::runtime::ScopeKind;

/// A structural invariant violated during a capture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The scope chain does not end in `[.., Script, Global]` with at least three scopes.
    #[error(
        "unsupported scope chain in frame {frame}: [{}]; expected at least three scopes ending in Script, Global",
        .kinds.iter().join(", ")
    )]
    UnsupportedScopeChain {
        /// Position of the frame in the stack
        frame: usize,
        /// Scope kinds, innermost first
        kinds: Vec<ScopeKind>,
    },
    /// A variable table slot was written twice.
    #[error("variable table slot {index} was resolved twice")]
    SlotAlreadyResolved {
        /// The slot
        index: usize,
    },
}
