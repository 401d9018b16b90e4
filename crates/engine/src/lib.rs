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

//! RDB Engine - point-in-time snapshots of a suspended program
//!
//! The engine turns a suspended execution state into a bounded, deduplicated
//! [`Snapshot`](rdb_common::types::Snapshot) without running any code in the
//! inspected program. The runtime is reached only through the capability
//! traits of [`runtime`]; watch expressions go through [`eval`].

pub mod capture;
pub use capture::*;

pub mod eval;
pub use eval::*;

pub mod runtime;
pub use runtime::*;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
