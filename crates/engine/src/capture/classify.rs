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

//! Value classification and object member resolution.

use rdb_common::types::{StatusMessage, Variable, GETTER_INDEX, NATIVE_PROPERTY_INDEX};

use crate::{
    capture::Capturer,
    runtime::{FunctionInfo, ObjectHandle, PropertyDescriptor, ValueHandle, ValueShape},
};

/// Name used for functions with neither an explicit nor an inferred name.
pub const ANONYMOUS_FUNCTION: &str = "(anonymous function)";

/// Display name of a function.
pub fn function_name(info: &FunctionInfo) -> String {
    info.resolved_name().unwrap_or(ANONYMOUS_FUNCTION).to_string()
}

/// Textual form of a function value.
pub fn function_text(info: &FunctionInfo) -> String {
    format!("function {}()", function_name(info))
}

impl<V: ValueHandle> Capturer<'_, V> {
    /// Resolve a named value into a variable and charge it to the budget.
    ///
    /// Objects are not descended into: they get a table slot and the variable
    /// refers to it.
    pub(crate) fn resolve_variable(&mut self, name: String, value: &V, evaluated: bool) -> Variable {
        let variable = match value.classify() {
            ValueShape::Primitive(text) | ValueShape::RegExp(text) => {
                self.primitive(name, text, evaluated)
            }
            ValueShape::Function(info) => Variable::value(name, function_text(&info)),
            ValueShape::Object(object) => {
                Variable::reference(name, self.table.index_of(object, evaluated))
            }
            ValueShape::Unrecognized => {
                Variable::error(name, StatusMessage::value_error("Unsupported value type"))
            }
        };
        self.charge(variable)
    }

    fn primitive(&self, name: String, text: String, evaluated: bool) -> Variable {
        let limit = self.config.max_string_length;
        if evaluated || limit == 0 {
            return Variable::value(name, text);
        }

        let length = text.chars().count();
        if length <= limit {
            return Variable::value(name, text);
        }

        let mut truncated: String = text.chars().take(limit).collect();
        truncated.push_str("...");
        Variable::value(name, truncated).with_status(StatusMessage::info(format!(
            "Only first `max_string_length` ({limit}) chars were captured for string of length {length}. Use in an expression to see the full string."
        )))
    }

    /// Resolve the members of an object for its table slot.
    pub(crate) fn resolve_object(&mut self, object: &V::Object, evaluated: bool) -> Variable {
        let properties = object.properties();
        let total = properties.len();
        let limit = self.config.max_properties;
        let truncated = !evaluated && limit > 0 && total > limit;
        let keep = if truncated { limit } else { total };

        let mut members = Vec::with_capacity(keep + usize::from(truncated));
        for property in properties.into_iter().take(keep) {
            let member = self.resolve_property(object, property, evaluated);
            members.push(member);
        }
        if truncated {
            let notice = Variable::default().with_status(StatusMessage::info(format!(
                "Only first `max_properties` ({limit}) of {total} items were captured. Use in an expression to see all items."
            )));
            members.push(self.charge(notice));
        }

        let entry = Variable { value: Some(object.class_name()), members, ..Default::default() };
        self.charge(entry)
    }

    fn resolve_property(
        &mut self,
        object: &V::Object,
        property: PropertyDescriptor<V>,
        evaluated: bool,
    ) -> Variable {
        let always_safe = property.name == "length" && object.is_array_like();
        if property.is_native && !always_safe {
            return self.charge(Variable::reference(property.name, NATIVE_PROPERTY_INDEX));
        }
        if property.has_getter {
            return self.charge(Variable::reference(property.name, GETTER_INDEX));
        }
        self.resolve_variable(property.name, &property.value, evaluated)
    }
}
