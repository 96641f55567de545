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

//! Python (`debugpy`) conventions.
//!
//! - Objects print as `<module.Type object at 0x7f...>`; the hex address is the identity
//!   token. Builtin containers print their contents and carry no token.
//! - `debugpy` groups members into pseudo-variables (`special variables`,
//!   `function variables`, ...) and adds a `len()` child to sized containers.

use once_cell::sync::Lazy;
use regex::Regex;
use snaptrace_common::types::ContainerKind;

use super::Convention;
use crate::{classify::unquote, Language, RawVariable, Scope};

static IDENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" at (0x[0-9a-fA-F]+)>").expect("valid identity regex"));

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?:async\s+)?def\s|class\s|@|import\s|from\s+\S+\s+import\s)")
        .expect("valid declaration regex")
});

const BOOKKEEPING_GROUPS: &[&str] = &[
    "special variables",
    "function variables",
    "class variables",
    "protected variables",
    "len()",
];

const HIDDEN_TYPES: &[&str] = &["function", "builtin_function_or_method", "module", "type"];

/// Conventions of CPython debugged through `debugpy`
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonConvention;

impl Convention for PythonConvention {
    fn language(&self) -> Language {
        Language::Python
    }

    fn default_entry_frame(&self) -> &'static str {
        "<module>"
    }

    fn is_local_scope(&self, scope: &Scope) -> bool {
        scope.name == "Locals"
    }

    fn is_bookkeeping(&self, var: &RawVariable) -> bool {
        let dunder = var.name.len() > 4 && var.name.starts_with("__") && var.name.ends_with("__");
        dunder
            || BOOKKEEPING_GROUPS.contains(&var.name.as_str())
            || HIDDEN_TYPES.contains(&var.declared_type.as_str())
    }

    fn identity_token(&self, text: &str) -> Option<String> {
        IDENTITY.captures(text).map(|caps| caps[1].to_ascii_lowercase())
    }

    fn container_kind(&self, var: &RawVariable) -> ContainerKind {
        match var.declared_type.as_str() {
            "list" | "deque" => ContainerKind::List,
            "tuple" => ContainerKind::Tuple,
            "set" | "frozenset" => ContainerKind::Set,
            "dict" | "defaultdict" | "OrderedDict" | "Counter" | "mappingproxy" => {
                ContainerKind::Dict
            }
            _ => ContainerKind::Instance,
        }
    }

    fn prints_literals(&self) -> bool {
        true
    }

    fn is_declaration_line(&self, text: &str) -> bool {
        DECLARATION.is_match(text)
    }

    fn mapping_key(&self, name: &str) -> String {
        unquote(name).to_string()
    }
}
