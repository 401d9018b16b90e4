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

//! Size budget of a capture and the truncation pass that enforces it.

use rdb_common::types::{Snapshot, Variable, BUFFER_FULL_INDEX};

/// Cost charged for a variable that carries no textual value. The real cost of
/// an object reference is paid when its table slot is resolved.
pub(crate) const REFERENCE_COST: usize = 8;

/// Running size of everything produced so far, against a ceiling.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Budget {
    used: usize,
    limit: usize,
}

impl Budget {
    /// `limit == 0` means unlimited.
    pub(crate) fn new(limit: usize) -> Self {
        Self { used: 0, limit }
    }

    /// Account for a produced variable.
    pub(crate) fn charge(&mut self, variable: &Variable) {
        self.used += match &variable.value {
            Some(value) => variable.name.len() + value.len(),
            None => REFERENCE_COST,
        };
    }

    /// Whether more table slots may be resolved.
    pub(crate) fn has_room(&self) -> bool {
        self.limit == 0 || self.used < self.limit
    }

    pub(crate) fn used(&self) -> usize {
        self.used
    }
}

/// Cut the variable table to `retained` entries and point every reference to
/// a dropped slot at the buffer-full sentinel.
pub(crate) fn truncate(snapshot: &mut Snapshot, retained: usize) {
    snapshot.variable_table.truncate(retained);
    snapshot.for_each_variable_mut(|variable| {
        if variable.var_table_index.is_some_and(|index| index >= retained) {
            variable.var_table_index = Some(BUFFER_FULL_INDEX);
        }
    });
}
