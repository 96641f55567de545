// SnapTrace - Execution Snapshot Tracer
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

//! Language conventions.
//!
//! The two supported debuggee languages encode objects differently: where the identity
//! of an object can be read, which container shape a type has, which variables are
//! debugger bookkeeping, and which lines are declarations worth stepping over. Each
//! language implements [`Convention`] once, and a trace generation picks its convention
//! up front through [`convention_for`].

mod java;
mod python;

pub use java::JavaConvention;
pub use python::PythonConvention;

use std::fmt;

use snaptrace_common::types::ContainerKind;

use crate::{Language, RawVariable, Scope};

/// Where the identity token of an object can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
    /// The printed value itself carries the token
    Token(String),
    /// The token is on the named child, one expansion away
    ChildField(&'static str),
    /// The object does not expose a stable identity
    Unavailable,
}

/// Language-specific knowledge used while reconstructing snapshots
pub trait Convention: fmt::Debug + Send + Sync {
    /// The language this convention describes
    fn language(&self) -> Language;

    /// Frame that marks the start of user code
    fn default_entry_frame(&self) -> &'static str;

    /// Whether a scope holds the frame's local variables
    fn is_local_scope(&self, scope: &Scope) -> bool;

    /// Whether a variable is debugger bookkeeping rather than program state
    fn is_bookkeeping(&self, var: &RawVariable) -> bool;

    /// Extract an identity token from a printed value
    fn identity_token(&self, text: &str) -> Option<String>;

    /// Where the identity of an expandable variable lives
    fn identity_source(&self, var: &RawVariable) -> IdentitySource {
        match self.identity_token(&var.raw_value_text) {
            Some(token) => IdentitySource::Token(token),
            None => IdentitySource::Unavailable,
        }
    }

    /// Container shape of an expandable variable
    fn container_kind(&self, var: &RawVariable) -> ContainerKind;

    /// Whether printed container values are literals that can be parsed back into structure
    fn prints_literals(&self) -> bool {
        false
    }

    /// Whether a source line declares something the debugger would otherwise step into
    fn is_declaration_line(&self, text: &str) -> bool;

    /// Class name shown for `class` nodes
    fn class_name(&self, declared_type: &str) -> String {
        declared_type.to_string()
    }

    /// Primitive type a boxed type unwraps to
    fn unboxed_type(&self, _declared_type: &str) -> Option<&'static str> {
        None
    }

    /// Key of a mapping entry, given the entry's variable name
    fn mapping_key(&self, name: &str) -> String {
        name.to_string()
    }

    /// Position of a sequence element, given its variable name (`3` or `[3]`)
    fn element_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        let name = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')).unwrap_or(name);
        name.parse().ok()
    }
}

/// The convention of a language
pub fn convention_for(language: Language) -> Box<dyn Convention> {
    match language {
        Language::Python => Box::new(PythonConvention),
        Language::Java => Box::new(JavaConvention),
    }
}
