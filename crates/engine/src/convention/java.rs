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

//! Java (`java-debug`) conventions.
//!
//! - Objects print as `Type@id ...` (`ArrayList@23 size=3`); `id` is the identity token.
//! - Strings print as their quoted content. Their identity is on the internal `value`
//!   field, so it takes one expansion to read it.
//! - Lambdas and inner classes expose captured state as synthetic `this$0`/`val$x` fields.

use once_cell::sync::Lazy;
use regex::Regex;
use snaptrace_common::types::ContainerKind;

use super::{Convention, IdentitySource};
use crate::{Language, RawVariable, Scope};

static IDENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^\s@"]+@(\d+)\b"#).expect("valid identity regex"));

static DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^\s*(?:",
        r"(?:import|package)\s",
        r"|(?:(?:public|protected|private|static|final|abstract|sealed|non-sealed)\s+)*",
        r"(?:class|interface|enum|record)\s",
        r"|(?:(?:public|protected|private|static|final|abstract|synchronized|native)\s+)+",
        r"[\w<>\[\],.? ]+\s+\w+\s*\([^;]*$",
        r")"
    ))
    .expect("valid declaration regex")
});

const BOXED: &[(&str, &str)] = &[
    ("Integer", "int"),
    ("Long", "long"),
    ("Short", "short"),
    ("Byte", "byte"),
    ("Float", "float"),
    ("Double", "double"),
    ("Boolean", "boolean"),
    ("Character", "char"),
    ("String", "String"),
];

/// Simple name of a type: no package, no generic arguments
fn simple_name(declared_type: &str) -> &str {
    let base = declared_type.split('<').next().unwrap_or(declared_type).trim();
    base.rsplit('.').next().unwrap_or(base)
}

/// Conventions of JVM programs debugged through `java-debug`
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaConvention;

impl Convention for JavaConvention {
    fn language(&self) -> Language {
        Language::Java
    }

    fn default_entry_frame(&self) -> &'static str {
        "main"
    }

    fn is_local_scope(&self, scope: &Scope) -> bool {
        matches!(scope.name.as_str(), "Local" | "Locals")
    }

    fn is_bookkeeping(&self, var: &RawVariable) -> bool {
        var.name.starts_with("this$") || var.name.starts_with("val$")
    }

    fn identity_token(&self, text: &str) -> Option<String> {
        IDENTITY.captures(text.trim_start()).map(|caps| caps[1].to_string())
    }

    fn identity_source(&self, var: &RawVariable) -> IdentitySource {
        if simple_name(&var.declared_type) == "String" {
            return IdentitySource::ChildField("value");
        }
        match self.identity_token(&var.raw_value_text) {
            Some(token) => IdentitySource::Token(token),
            None => IdentitySource::Unavailable,
        }
    }

    fn container_kind(&self, var: &RawVariable) -> ContainerKind {
        if var.declared_type.trim_end().ends_with(']') {
            return ContainerKind::List;
        }
        let name = simple_name(&var.declared_type);
        if self.unboxed_type(name).is_some() {
            ContainerKind::Wrapper
        } else if name.ends_with("Map") || matches!(name, "Hashtable" | "Properties") {
            ContainerKind::Map
        } else if name.ends_with("Set") {
            ContainerKind::Set
        } else if name.ends_with("List")
            || name.ends_with("Deque")
            || name.ends_with("Queue")
            || matches!(name, "Vector" | "Stack")
        {
            ContainerKind::List
        } else {
            ContainerKind::Class
        }
    }

    fn is_declaration_line(&self, text: &str) -> bool {
        DECLARATION.is_match(text)
    }

    fn class_name(&self, declared_type: &str) -> String {
        simple_name(declared_type).to_string()
    }

    fn unboxed_type(&self, declared_type: &str) -> Option<&'static str> {
        let name = simple_name(declared_type);
        BOXED.iter().find(|(boxed, _)| *boxed == name).map(|(_, primitive)| *primitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_token() {
        let convention = JavaConvention;
        assert_eq!(convention.identity_token("ArrayList@23 size=3").as_deref(), Some("23"));
        assert_eq!(convention.identity_token("Node@7").as_deref(), Some("7"));
        assert_eq!(convention.identity_token("\"me@123\""), None);
        assert_eq!(convention.identity_token("42"), None);
    }

    #[test]
    fn test_strings_carry_identity_on_value_field() {
        let convention = JavaConvention;
        let var = RawVariable::new("s", "String", "\"hi\"", 9);
        assert_eq!(convention.identity_source(&var), IdentitySource::ChildField("value"));
        let var = RawVariable::new("xs", "ArrayList<Integer>", "ArrayList@23 size=1", 10);
        assert_eq!(convention.identity_source(&var), IdentitySource::Token("23".into()));
    }

    #[test]
    fn test_container_kind() {
        let convention = JavaConvention;
        let kind = |ty: &str| convention.container_kind(&RawVariable::new("v", ty, "", 1));
        assert_eq!(kind("int[]"), ContainerKind::List);
        assert_eq!(kind("java.util.ArrayList<String>"), ContainerKind::List);
        assert_eq!(kind("LinkedList"), ContainerKind::List);
        assert_eq!(kind("HashSet<Integer>"), ContainerKind::Set);
        assert_eq!(kind("HashMap<String,Integer>"), ContainerKind::Map);
        assert_eq!(kind("Integer"), ContainerKind::Wrapper);
        assert_eq!(kind("java.lang.String"), ContainerKind::Wrapper);
        assert_eq!(kind("Node"), ContainerKind::Class);
    }

    #[test]
    fn test_declaration_lines() {
        let convention = JavaConvention;
        for line in [
            "import java.util.*;",
            "public class Main {",
            "    static int fib(int n) {",
            "    public static void main(String[] args) {",
            "record Point(int x, int y) {",
        ] {
            assert!(convention.is_declaration_line(line), "{line}");
        }
        assert!(!convention.is_declaration_line("        int x = fib(3);"));
        assert!(!convention.is_declaration_line("        list.add(1);"));
    }

    #[test]
    fn test_bookkeeping_and_scopes() {
        let convention = JavaConvention;
        assert!(convention.is_bookkeeping(&RawVariable::new("this$0", "Outer", "Outer@1", 4)));
        assert!(!convention.is_bookkeeping(&RawVariable::new("this", "Main", "Main@1", 4)));
        assert!(convention.is_local_scope(&Scope::new("Local", 1)));
        assert!(!convention.is_local_scope(&Scope::new("Static", 2)));
        assert_eq!(convention.class_name("com.example.Node<T>"), "Node");
        assert_eq!(convention.unboxed_type("Character"), Some("char"));
    }
}
