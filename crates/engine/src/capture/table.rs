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

//! Object table: identity-deduplicated arena of the objects met during a capture.
//!
//! Every object handle is assigned a slot the first time its identity is seen;
//! later encounters (including back-edges of cycles) reuse that slot, so the
//! capture never descends into the same object twice. Newly assigned slots are
//! queued and resolved in first-discovery order by the drain phase.

use std::collections::{HashMap, VecDeque};

use rdb_common::types::{Variable, RESERVED_SLOTS};

use crate::{
    capture::CaptureError,
    runtime::{ObjectHandle, ObjectId},
};

enum Slot<O> {
    Sentinel,
    Object {
        handle: O,
        /// Reached from a watch expression, which lifts the per-value limits
        evaluated: bool,
    },
}

/// An object waiting to be resolved.
pub(crate) struct PendingObject<O> {
    pub index: usize,
    pub handle: O,
    pub evaluated: bool,
}

pub(crate) struct ObjectTable<O> {
    slots: Vec<Slot<O>>,
    by_identity: HashMap<ObjectId, usize>,
    resolved: Vec<Option<Variable>>,
    pending: VecDeque<usize>,
}

impl<O: ObjectHandle> ObjectTable<O> {
    /// Create a table whose reserved slots hold the given sentinels.
    pub(crate) fn new(sentinels: [Variable; RESERVED_SLOTS]) -> Self {
        Self {
            slots: (0..RESERVED_SLOTS).map(|_| Slot::Sentinel).collect(),
            by_identity: HashMap::new(),
            resolved: sentinels.into_iter().map(Some).collect(),
            pending: VecDeque::new(),
        }
    }

    /// Slot of `handle`, assigning and queueing a new one if its identity is new.
    pub(crate) fn index_of(&mut self, handle: O, evaluated: bool) -> usize {
        let identity = handle.identity();
        if let Some(&index) = self.by_identity.get(&identity) {
            // An object queued from a frame but also requested by an expression
            // is resolved without limits, as long as it is still queued
            if evaluated && self.resolved[index].is_none() {
                if let Slot::Object { evaluated: flag, .. } = &mut self.slots[index] {
                    *flag = true;
                }
            }
            return index;
        }

        let index = self.slots.len();
        self.slots.push(Slot::Object { handle, evaluated });
        self.resolved.push(None);
        self.by_identity.insert(identity, index);
        self.pending.push_back(index);
        index
    }

    /// Next queued object, in slot order.
    pub(crate) fn next_pending(&mut self) -> Option<PendingObject<O>> {
        let index = self.pending.pop_front()?;
        match &self.slots[index] {
            Slot::Object { handle, evaluated } => {
                Some(PendingObject { index, handle: handle.clone(), evaluated: *evaluated })
            }
            Slot::Sentinel => None,
        }
    }

    /// Whether objects remain unresolved.
    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Record the resolved form of slot `index`. Each slot is written at most once.
    pub(crate) fn set_resolved(
        &mut self,
        index: usize,
        variable: Variable,
    ) -> Result<(), CaptureError> {
        let slot = &mut self.resolved[index];
        if slot.is_some() {
            return Err(CaptureError::SlotAlreadyResolved { index });
        }
        *slot = Some(variable);
        Ok(())
    }

    /// Number of slots assigned so far, sentinels included.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// The resolved prefix of the table. Slots past the first unresolved one
    /// are dropped.
    pub(crate) fn into_resolved(self) -> Vec<Variable> {
        self.resolved.into_iter().map_while(|v| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeObject;

    fn table() -> ObjectTable<FakeObject> {
        ObjectTable::new(std::array::from_fn(|i| Variable::value("", format!("sentinel {i}"))))
    }

    #[test]
    fn test_identity_dedup() {
        let mut table = table();
        let obj = FakeObject::new("Object");
        let other = FakeObject::new("Object");

        let a = table.index_of(obj.clone(), false);
        let b = table.index_of(obj, false);
        let c = table.index_of(other, false);

        assert_eq!(a, RESERVED_SLOTS);
        assert_eq!(a, b);
        assert_eq!(c, RESERVED_SLOTS + 1);
        assert_eq!(table.len(), RESERVED_SLOTS + 2);
    }

    #[test]
    fn test_pending_in_discovery_order() {
        let mut table = table();
        let first = FakeObject::new("A");
        let second = FakeObject::new("B");
        table.index_of(first, false);
        table.index_of(second, true);

        let p = table.next_pending().unwrap();
        assert_eq!((p.index, p.evaluated), (RESERVED_SLOTS, false));
        let p = table.next_pending().unwrap();
        assert_eq!((p.index, p.evaluated), (RESERVED_SLOTS + 1, true));
        assert!(table.next_pending().is_none());
        assert!(!table.has_pending());
    }

    #[test]
    fn test_evaluated_flag_upgraded_while_queued() {
        let mut table = table();
        let obj = FakeObject::new("Object");
        table.index_of(obj.clone(), false);
        table.index_of(obj, true);
        assert!(table.next_pending().unwrap().evaluated);
    }

    #[test]
    fn test_double_write_rejected() {
        let mut table = table();
        let index = table.index_of(FakeObject::new("Object"), false);
        table.set_resolved(index, Variable::value("", "Object")).unwrap();
        assert_eq!(
            table.set_resolved(index, Variable::value("", "Object")),
            Err(CaptureError::SlotAlreadyResolved { index })
        );
    }

    #[test]
    fn test_into_resolved_keeps_prefix() {
        let mut table = table();
        let a = table.index_of(FakeObject::new("A"), false);
        table.index_of(FakeObject::new("B"), false);
        table.set_resolved(a, Variable::value("", "A")).unwrap();

        let resolved = table.into_resolved();
        assert_eq!(resolved.len(), RESERVED_SLOTS + 1);
        assert_eq!(resolved[a].value.as_deref(), Some("A"));
    }
}
