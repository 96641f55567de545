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

//! Heap graph builder.
//!
//! Expands every object reachable from a set of root variables into a [`HeapValue`] node,
//! keyed by canonical [`Address`]. The traversal is an explicit work-list:
//!
//! 1. [`HeapBuilder::value_of`] classifies a variable; a reference is resolved to its
//!    canonical address and scheduled unless that address was already visited.
//! 2. [`HeapBuilder::run`] pops scheduled nodes, lists their children through the
//!    inspection service and assembles the node by container kind, scheduling child
//!    references in turn.
//!
//! The `visited` set is what turns cyclic structures into finite graphs: a node is
//! expanded at most once and later references simply point at it. Nodes already present
//! in the prior heap (built for an outer frame of the same pause) count as visited, so
//! the first frame to reach an object owns its node.
//!
//! Failures are contained. A failing expansion keeps whatever was assembled so far, a
//! malformed printed composite degrades to an empty node, and once the per-pause node
//! budget is spent remaining references get empty placeholder nodes. Every reference in
//! the result has a heap entry.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use snaptrace_common::types::{Address, ContainerKind, Heap, HeapValue, Value};
use tracing::trace;

use crate::{
    classify::{classify, unquote},
    composite::{parse_composite, Composite},
    convention::IdentitySource,
    InspectionService, RawVariable, SessionContext, ValueDecodeError,
};

/// Why a heap node is not a plain expansion of a debuggee object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxOrigin {
    /// Recovered from the printed text of its parent
    Parsed,
    /// Left unexpanded because the node budget ran out
    Placeholder,
    /// Expansion failed part way; holds what was resolved before the failure
    Partial {
        /// The inspection failure
        error: String,
    },
    /// The printed text could not be parsed; the node is empty
    Degraded {
        /// The parse failure
        error: String,
    },
}

/// A heap node that is synthetic, partial or a placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxNode {
    /// Address of the node
    pub address: Address,
    /// How the node came to be
    pub origin: AuxOrigin,
}

/// Result of one heap traversal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeapBuild {
    /// Every node reachable from the roots, plus the prior heap
    pub heap: Heap,
    /// Nodes that are not plain expansions
    pub auxiliary: Vec<AuxNode>,
}

#[derive(Debug)]
struct Pending {
    address: Address,
    raw: RawVariable,
    kind: ContainerKind,
}

/// Work-list traversal over the heap of one pause
pub struct HeapBuilder<'a, S: ?Sized> {
    session: &'a mut SessionContext,
    service: &'a mut S,
    heap: Heap,
    visited: HashSet<Address>,
    worklist: VecDeque<Pending>,
    auxiliary: Vec<AuxNode>,
}

impl<'a, S: InspectionService + ?Sized> HeapBuilder<'a, S> {
    /// Start a traversal on top of the nodes already built for this pause
    pub fn new(session: &'a mut SessionContext, service: &'a mut S, prior: Heap) -> Self {
        let visited = prior.keys().copied().collect();
        Self {
            session,
            service,
            heap: prior,
            visited,
            worklist: VecDeque::new(),
            auxiliary: Vec::new(),
        }
    }

    /// Classify a variable, resolving and scheduling it if it is a reference
    pub async fn value_of(&mut self, raw: &RawVariable) -> Result<Value, ValueDecodeError> {
        let value = classify(raw)?;
        if !value.is_ref() {
            return Ok(value);
        }

        let address = self.resolve_address(raw).await;
        self.schedule(address, raw);
        Ok(Value::Ref(address))
    }

    /// Expand every scheduled node
    pub async fn run(&mut self) {
        while let Some(pending) = self.worklist.pop_front() {
            trace!(
                address = %pending.address,
                kind = %pending.kind,
                name = %pending.raw.name,
                "expanding"
            );
            let node = self.expand(&pending).await;
            self.heap.insert(pending.address, node);
        }
    }

    /// Record a contained problem against the session
    pub fn record_diagnostic(&mut self, subject: impl Into<String>, message: impl ToString) {
        self.session.record_diagnostic(subject, message);
    }

    /// The heap built so far and its auxiliary nodes
    pub fn finish(self) -> HeapBuild {
        HeapBuild { heap: self.heap, auxiliary: self.auxiliary }
    }

    /// Canonical address of an expandable variable
    async fn resolve_address(&mut self, raw: &RawVariable) -> Address {
        let proposed = Address(raw.raw_reference_id);
        let token = match self.session.convention().identity_source(raw) {
            IdentitySource::Token(token) => Some(token),
            IdentitySource::ChildField(field) => {
                match self.service.variables(raw.raw_reference_id).await {
                    Ok(children) => children.iter().find(|child| child.name == field).and_then(
                        |child| self.session.convention().identity_token(&child.raw_value_text),
                    ),
                    Err(e) => {
                        self.session.record_diagnostic(&raw.name, e);
                        None
                    }
                }
            }
            IdentitySource::Unavailable => None,
        };

        match token {
            Some(token) => self.session.identities.resolve(&token, proposed),
            None => self.session.untracked_address(raw.raw_reference_id),
        }
    }

    fn schedule(&mut self, address: Address, raw: &RawVariable) {
        if !self.visited.insert(address) {
            return;
        }

        let kind = self.session.convention().container_kind(raw);
        if self.session.pause.expanded_nodes >= self.session.config().max_heap_nodes {
            self.heap.insert(address, HeapValue::empty(kind, &raw.declared_type));
            self.auxiliary.push(AuxNode { address, origin: AuxOrigin::Placeholder });
            return;
        }

        self.session.pause.expanded_nodes += 1;
        self.worklist.push_back(Pending { address, raw: raw.clone(), kind });
    }

    async fn expand(&mut self, pending: &Pending) -> HeapValue {
        if pending.kind == ContainerKind::Wrapper {
            return self.wrapper(pending).await;
        }

        let children = match self.service.variables(pending.raw.raw_reference_id).await {
            Ok(children) => children,
            Err(e) => {
                self.partial(pending, e);
                return HeapValue::empty(pending.kind, &pending.raw.declared_type);
            }
        };
        let children: Vec<_> = children
            .into_iter()
            .filter(|child| !self.session.convention().is_bookkeeping(child))
            .collect();

        match pending.kind {
            ContainerKind::List | ContainerKind::Tuple | ContainerKind::Set => {
                self.sequence(pending, children).await
            }
            ContainerKind::Dict => {
                if children.is_empty() {
                    return self.from_printed(pending);
                }
                HeapValue::Dict(self.named(pending, children, true).await)
            }
            ContainerKind::Instance => {
                HeapValue::Instance(self.named(pending, children, false).await)
            }
            ContainerKind::Class => HeapValue::Class {
                class_name: self.session.convention().class_name(&pending.raw.declared_type),
                properties: self.named(pending, children, false).await,
            },
            ContainerKind::Map => self.map(pending, children).await,
            ContainerKind::Wrapper => self.wrapper(pending).await,
        }
    }

    /// Elements in index order; children without an index are only used when none has one
    async fn sequence(&mut self, pending: &Pending, children: Vec<RawVariable>) -> HeapValue {
        let mut indexed: Vec<_> = children
            .iter()
            .filter_map(|child| {
                self.session.convention().element_index(&child.name).map(|index| (index, child))
            })
            .collect();
        indexed.sort_by_key(|(index, _)| *index);
        let elements: Vec<&RawVariable> = if indexed.is_empty() {
            children.iter().collect()
        } else {
            indexed.into_iter().map(|(_, child)| child).collect()
        };

        if elements.is_empty() {
            return self.from_printed(pending);
        }

        let mut values = Vec::with_capacity(elements.len());
        for child in elements {
            match self.value_of(child).await {
                Ok(value) => values.push(value),
                Err(e) => self.session.record_diagnostic(member(pending, &child.name), e),
            }
        }

        match pending.kind {
            ContainerKind::Tuple => HeapValue::Tuple(values),
            ContainerKind::Set => HeapValue::Set(values),
            _ => HeapValue::List(values),
        }
    }

    async fn named(
        &mut self,
        pending: &Pending,
        children: Vec<RawVariable>,
        mapping_keys: bool,
    ) -> IndexMap<String, Value> {
        let mut entries = Vec::with_capacity(children.len());
        for child in &children {
            match self.value_of(child).await {
                Ok(value) => entries.push((child.name.clone(), value)),
                Err(e) => self.session.record_diagnostic(member(pending, &child.name), e),
            }
        }

        if mapping_keys {
            self.keyed(&pending.raw.name, entries)
        } else {
            entries.into_iter().collect()
        }
    }

    /// Key mapping entries by their unquoted printed keys.
    ///
    /// Printed keys that unquote to the same text (`1` and `'1'`) are kept as printed so
    /// neither entry is lost.
    fn keyed<V>(&mut self, subject: &str, entries: Vec<(String, V)>) -> IndexMap<String, V> {
        let convention = self.session.convention();
        let keys: Vec<String> =
            entries.iter().map(|(printed, _)| convention.mapping_key(printed)).collect();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for key in &keys {
            *counts.entry(key.as_str()).or_default() += 1;
        }

        let mut ambiguous = Vec::new();
        let mut fields = IndexMap::with_capacity(entries.len());
        for ((printed, value), key) in entries.into_iter().zip(&keys) {
            let key = if counts[key.as_str()] > 1 {
                ambiguous.push(printed.clone());
                printed
            } else {
                key.clone()
            };
            if fields.insert(key.clone(), value).is_some() {
                ambiguous.push(key);
            }
        }

        for printed in ambiguous {
            self.session.record_diagnostic(
                format!("{subject}.{printed}"),
                "mapping key is ambiguous once unquoted, kept as printed",
            );
        }
        fields
    }

    /// Entries of an identity-keyed map; each entry expands to `key` and `value` children
    async fn map(&mut self, pending: &Pending, entries: Vec<RawVariable>) -> HeapValue {
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in &entries {
            if !entry.is_expandable() {
                self.session.record_diagnostic(
                    member(pending, &entry.name),
                    "map entry cannot be expanded",
                );
                continue;
            }

            let parts = match self.service.variables(entry.raw_reference_id).await {
                Ok(parts) => parts,
                Err(e) => {
                    self.partial(pending, e);
                    break;
                }
            };
            let key = parts.iter().find(|part| part.name == "key");
            let value = parts.iter().find(|part| part.name == "value");
            let (Some(key), Some(value)) = (key, value) else {
                self.session
                    .record_diagnostic(member(pending, &entry.name), "map entry without key/value");
                continue;
            };

            match (self.value_of(key).await, self.value_of(value).await) {
                (Ok(key), Ok(value)) => pairs.push((key, value)),
                (Err(e), _) | (_, Err(e)) => {
                    self.session.record_diagnostic(member(pending, &entry.name), e)
                }
            }
        }
        HeapValue::Map(pairs)
    }

    /// A boxed scalar: strings unwrap their printed text, other boxes their `value` field
    async fn wrapper(&mut self, pending: &Pending) -> HeapValue {
        let raw = &pending.raw;
        let declared_type = raw.declared_type.clone();
        let unboxed = self.session.convention().unboxed_type(&raw.declared_type);
        let fallback = Value::Str(unquote(&raw.raw_value_text).to_string());

        let value = if unboxed == Some("String") {
            fallback
        } else {
            match self.service.variables(raw.raw_reference_id).await {
                Ok(children) => match children.iter().find(|child| child.name == "value") {
                    Some(child) => match self.value_of(child).await {
                        Ok(value) => value,
                        Err(e) => {
                            self.session.record_diagnostic(member(pending, "value"), e);
                            fallback
                        }
                    },
                    None => fallback,
                },
                Err(e) => {
                    self.partial(pending, e);
                    fallback
                }
            }
        };
        HeapValue::Wrapper { value, declared_type }
    }

    /// Rebuild a container from its printed text
    fn from_printed(&mut self, pending: &Pending) -> HeapValue {
        if !self.session.convention().prints_literals() {
            return HeapValue::empty(pending.kind, &pending.raw.declared_type);
        }
        match parse_composite(pending.kind, &pending.raw.raw_value_text) {
            Ok(composite) => self.materialize(&pending.raw.name, pending.kind, composite),
            Err(e) => {
                let error = e.to_string();
                self.session.record_diagnostic(&pending.raw.name, &error);
                let origin = AuxOrigin::Degraded { error };
                self.auxiliary.push(AuxNode { address: pending.address, origin });
                HeapValue::empty(pending.kind, &pending.raw.declared_type)
            }
        }
    }

    fn materialize(
        &mut self,
        subject: &str,
        kind: ContainerKind,
        composite: Composite,
    ) -> HeapValue {
        match composite {
            Composite::Seq(items) => {
                let values =
                    items.into_iter().map(|item| self.composite_value(subject, item)).collect();
                match kind {
                    ContainerKind::Tuple => HeapValue::Tuple(values),
                    ContainerKind::Set => HeapValue::Set(values),
                    _ => HeapValue::List(values),
                }
            }
            Composite::Mapping(entries) => {
                let entries: Vec<_> = entries
                    .into_iter()
                    .map(|(key, item)| (key, self.composite_value(subject, item)))
                    .collect();
                match kind {
                    ContainerKind::Map => HeapValue::Map(
                        entries.into_iter().map(|(key, value)| (atom_value(&key), value)).collect(),
                    ),
                    _ => HeapValue::Dict(self.keyed(subject, entries)),
                }
            }
            Composite::Atom(text) => HeapValue::List(vec![atom_value(&text)]),
        }
    }

    /// Value of a parsed element; nested composites become nodes at synthetic addresses
    fn composite_value(&mut self, subject: &str, composite: Composite) -> Value {
        let kind = match &composite {
            Composite::Atom(text) => return atom_value(text),
            Composite::Seq(_) => ContainerKind::List,
            Composite::Mapping(_) => ContainerKind::Dict,
        };

        let address = self.session.synthetic_address();
        self.visited.insert(address);
        let node = self.materialize(subject, kind, composite);
        self.heap.insert(address, node);
        self.auxiliary.push(AuxNode { address, origin: AuxOrigin::Parsed });
        Value::Ref(address)
    }

    fn partial(&mut self, pending: &Pending, error: impl ToString) {
        let error = error.to_string();
        self.session.record_diagnostic(&pending.raw.name, &error);
        let origin = AuxOrigin::Partial { error };
        self.auxiliary.push(AuxNode { address: pending.address, origin });
    }
}

fn member(pending: &Pending, child: &str) -> String {
    format!("{}.{child}", pending.raw.name)
}

/// Best-effort typing of a printed scalar token
fn atom_value(text: &str) -> Value {
    let unquoted = unquote(text);
    if unquoted.len() != text.len() {
        Value::Str(unquoted.to_string())
    } else if let Ok(int) = text.parse::<i64>() {
        Value::Int(int)
    } else if let Ok(float) = text.parse::<f64>() {
        Value::Float(float)
    } else if matches!(text, "True" | "False" | "true" | "false") {
        Value::Bool(text.to_string())
    } else {
        Value::Str(text.to_string())
    }
}

/// Build the heap reachable from `roots` on top of `prior`
pub async fn build_heap<S: InspectionService + ?Sized>(
    session: &mut SessionContext,
    service: &mut S,
    roots: &[RawVariable],
    prior: Heap,
) -> HeapBuild {
    let mut builder = HeapBuilder::new(session, service, prior);
    for root in roots {
        if let Err(e) = builder.value_of(root).await {
            builder.record_diagnostic(&root.name, e);
        }
    }
    builder.run().await;
    builder.finish()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use snaptrace_common::types::BackendTraceElem;

    use super::*;
    use crate::{
        test_utils::{ScriptedInspector, ScriptedPause},
        Language, PauseEvent, TraceConfig,
    };

    fn int(name: &str, value: i64) -> RawVariable {
        RawVariable::new(name, "int", value.to_string(), 0)
    }

    async fn paused(pause: ScriptedPause) -> ScriptedInspector {
        let mut inspector = ScriptedInspector::new([pause]);
        assert!(matches!(inspector.next_event().await.unwrap(), PauseEvent::Stopped { .. }));
        inspector
    }

    fn python() -> SessionContext {
        let mut session = SessionContext::new(TraceConfig::default());
        session.begin_pause();
        session
    }

    fn java() -> SessionContext {
        let mut session = SessionContext::new(TraceConfig::default().with_language(Language::Java));
        session.begin_pause();
        session
    }

    #[tokio::test]
    async fn test_list_of_ints() {
        let list = RawVariable::new("simpleList", "list", "[1, 2, 3, 4, 5]", 42);
        let mut children: Vec<_> = (1..=5).map(|i| int(&(i - 1).to_string(), i)).collect();
        children.push(RawVariable::new("len()", "int", "5", 0));
        let mut inspector = paused(ScriptedPause::new().children(42, children)).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[list], Heap::new()).await;

        assert_eq!(build.heap.len(), 1);
        assert_eq!(build.heap[&Address(42)], HeapValue::List((1..=5).map(Value::Int).collect()));
        assert!(build.auxiliary.is_empty());
    }

    #[tokio::test]
    async fn test_self_containing_list_terminates() {
        let list = RawVariable::new("L", "list", "[[...]]", 42);
        let mut inspector = paused(ScriptedPause::new().children(42, vec![list.clone()])).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[list], Heap::new()).await;

        assert_eq!(build.heap.len(), 1);
        assert_eq!(build.heap[&Address(42)], HeapValue::List(vec![Value::reference(42)]));
        assert_eq!(inspector.variable_requests(), 1);
    }

    #[tokio::test]
    async fn test_transitive_cycle() {
        let a = RawVariable::new("a", "Node", "<Node object at 0xa>", 10);
        let b = RawVariable::new("next", "Node", "<Node object at 0xb>", 11);
        let a_again = RawVariable::new("next", "Node", "<Node object at 0xa>", 12);
        let pause = ScriptedPause::new().children(10, vec![b]).children(11, vec![a_again]);
        let mut inspector = paused(pause).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[a], Heap::new()).await;

        assert_eq!(build.heap.len(), 2);
        let elem = BackendTraceElem::new(1, vec![], build.heap.clone());
        assert!(elem.dangling_references().is_empty());
        assert_eq!(
            build.heap[&Address(11)],
            HeapValue::Instance(IndexMap::from([("next".to_string(), Value::reference(10))]))
        );
    }

    #[tokio::test]
    async fn test_prior_heap_wins() {
        let list = RawVariable::new("xs", "list", "[1]", 42);
        let mut inspector = paused(ScriptedPause::new().children(42, vec![int("0", 1)])).await;
        let mut session = python();
        let mut prior = Heap::new();
        prior.insert(Address(42), HeapValue::List(vec![Value::Int(7)]));

        let build = build_heap(&mut session, &mut inspector, &[list], prior).await;

        assert_eq!(build.heap[&Address(42)], HeapValue::List(vec![Value::Int(7)]));
        assert_eq!(inspector.variable_requests(), 0);
    }

    #[tokio::test]
    async fn test_failed_expansion_keeps_a_node() {
        let node = RawVariable::new("n", "Node", "<Node object at 0x1>", 5);
        let mut inspector = paused(ScriptedPause::new().failing(5)).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[node], Heap::new()).await;

        assert_eq!(build.heap[&Address(5)], HeapValue::Instance(IndexMap::new()));
        assert!(matches!(build.auxiliary[0].origin, AuxOrigin::Partial { .. }));
        assert_eq!(session.diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_child_is_skipped() {
        let node = RawVariable::new("n", "Node", "<Node object at 0x1>", 5);
        let children = vec![RawVariable::new("bad", "int", "x1", 0), int("good", 2)];
        let mut inspector = paused(ScriptedPause::new().children(5, children)).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[node], Heap::new()).await;

        assert_eq!(
            build.heap[&Address(5)],
            HeapValue::Instance(IndexMap::from([("good".to_string(), Value::Int(2))]))
        );
        assert_eq!(session.diagnostics()[0].subject, "n.bad");
    }

    #[tokio::test]
    async fn test_printed_composites() {
        let pairs = RawVariable::new("pairs", "tuple", "((1, 'a'), {2})", 8);
        let broken = RawVariable::new("broken", "set", "{1; 2}", 9);
        let pause = ScriptedPause::new().children(8, vec![]).children(9, vec![]);
        let mut inspector = paused(pause).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[pairs, broken], Heap::new()).await;

        let HeapValue::Tuple(items) = &build.heap[&Address(8)] else {
            panic!("expected a tuple, got {:?}", build.heap[&Address(8)]);
        };
        assert_eq!(items.len(), 2);
        let first = items[0].as_ref_address().unwrap();
        assert_eq!(build.heap[&first], HeapValue::List(vec![Value::Int(1), Value::str("a")]));
        assert_eq!(build.heap[&Address(9)], HeapValue::Set(vec![]));

        let origins: Vec<_> = build.auxiliary.iter().map(|aux| aux.origin.clone()).collect();
        assert_eq!(origins.iter().filter(|origin| **origin == AuxOrigin::Parsed).count(), 2);
        assert!(origins.iter().any(|origin| matches!(origin, AuxOrigin::Degraded { .. })));
        let elem = BackendTraceElem::new(1, vec![], build.heap);
        assert!(elem.dangling_references().is_empty());
    }

    #[tokio::test]
    async fn test_dict_keys_that_unquote_alike_are_both_kept() {
        let d = RawVariable::new("d", "dict", "{1: 'a', '1': 'b'}", 5);
        let children = vec![
            RawVariable::new("1", "str", "'a'", 0),
            RawVariable::new("'1'", "str", "'b'", 0),
            RawVariable::new("'k'", "int", "3", 0),
        ];
        let mut inspector = paused(ScriptedPause::new().children(5, children)).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[d], Heap::new()).await;

        assert_eq!(
            build.heap[&Address(5)],
            HeapValue::Dict(IndexMap::from([
                ("1".to_string(), Value::str("a")),
                ("'1'".to_string(), Value::str("b")),
                ("k".to_string(), Value::Int(3)),
            ]))
        );
        let subjects: Vec<_> = session.diagnostics().iter().map(|d| d.subject.as_str()).collect();
        assert_eq!(subjects, vec!["d.1", "d.'1'"]);
    }

    #[tokio::test]
    async fn test_printed_dict_keys_that_unquote_alike_are_both_kept() {
        let d = RawVariable::new("d", "dict", "{1: 'a', '1': 'b', 'k': '2'}", 5);
        let mut inspector = paused(ScriptedPause::new().children(5, vec![])).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[d], Heap::new()).await;

        assert_eq!(
            build.heap[&Address(5)],
            HeapValue::Dict(IndexMap::from([
                ("1".to_string(), Value::str("a")),
                ("'1'".to_string(), Value::str("b")),
                ("k".to_string(), Value::str("2")),
            ]))
        );
        assert_eq!(session.diagnostics().len(), 2);
    }

    #[tokio::test]
    async fn test_node_budget_leaves_placeholders() {
        let outer = RawVariable::new("outer", "list", "[[1]]", 1);
        let inner = RawVariable::new("0", "list", "[1]", 2);
        let mut inspector = paused(ScriptedPause::new().children(1, vec![inner])).await;
        let mut session = SessionContext::new(TraceConfig::default().with_max_heap_nodes(1));
        session.begin_pause();

        let build = build_heap(&mut session, &mut inspector, &[outer], Heap::new()).await;

        assert_eq!(build.heap[&Address(1)], HeapValue::List(vec![Value::reference(2)]));
        assert_eq!(build.heap[&Address(2)], HeapValue::List(vec![]));
        assert_eq!(
            build.auxiliary,
            vec![AuxNode { address: Address(2), origin: AuxOrigin::Placeholder }]
        );
    }

    #[tokio::test]
    async fn test_same_token_under_two_references() {
        let first = RawVariable::new("a", "Node", "<Node object at 0xff>", 3);
        let second = RawVariable::new("b", "Node", "<Node object at 0xff>", 4);
        let pause =
            ScriptedPause::new().children(3, vec![int("v", 1)]).children(4, vec![int("v", 1)]);
        let mut inspector = paused(pause).await;
        let mut session = python();

        let build = build_heap(&mut session, &mut inspector, &[first, second], Heap::new()).await;

        assert_eq!(build.heap.keys().copied().collect::<Vec<_>>(), vec![Address(3)]);
    }

    #[tokio::test]
    async fn test_java_strings_boxes_and_maps() {
        let name = RawVariable::new("name", "String", "\"bob\"", 20);
        let boxed = RawVariable::new("count", "Integer", "Integer@31", 30);
        let map = RawVariable::new("ages", "HashMap<String,Integer>", "HashMap@40 size=1", 40);
        let pause = ScriptedPause::new()
            .children(20, vec![RawVariable::new("value", "byte[]", "byte[3]@21", 21)])
            .children(30, vec![int("value", 7)])
            .children(40, vec![RawVariable::new("[0]", "HashMap$Node", "\"bob\" -> 7", 41)])
            .children(
                41,
                vec![
                    RawVariable::new("key", "String", "\"bob\"", 42),
                    RawVariable::new("value", "Integer", "Integer@31", 43),
                ],
            )
            .children(42, vec![RawVariable::new("value", "byte[]", "byte[3]@21", 44)])
            .children(43, vec![int("value", 7)]);
        let mut inspector = paused(pause).await;
        let mut session = java();

        let build =
            build_heap(&mut session, &mut inspector, &[name, boxed, map], Heap::new()).await;

        assert_eq!(
            build.heap[&Address(20)],
            HeapValue::Wrapper { value: Value::str("bob"), declared_type: "String".into() }
        );
        assert_eq!(
            build.heap[&Address(30)],
            HeapValue::Wrapper { value: Value::Int(7), declared_type: "Integer".into() }
        );
        // The entry's key and value are the same objects as the locals
        assert_eq!(
            build.heap[&Address(40)],
            HeapValue::Map(vec![(Value::reference(20), Value::reference(30))])
        );
        assert_eq!(build.heap.len(), 3);
    }

    #[tokio::test]
    async fn test_java_empty_array_is_not_parsed() {
        let args = RawVariable::new("args", "String[]", "String[0]@17", 17);
        let mut inspector = paused(ScriptedPause::new().children(17, vec![])).await;
        let mut session = java();

        let build = build_heap(&mut session, &mut inspector, &[args], Heap::new()).await;

        assert_eq!(build.heap[&Address(17)], HeapValue::List(vec![]));
        assert!(build.auxiliary.is_empty());
        assert!(session.diagnostics().is_empty());
    }

    #[tokio::test]
    async fn test_failing_map_entry_keeps_earlier_pairs() {
        let map = RawVariable::new("m", "TreeMap", "TreeMap@1 size=2", 1);
        let pause = ScriptedPause::new()
            .children(
                1,
                vec![
                    RawVariable::new("[0]", "Entry", "1 -> 2", 2),
                    RawVariable::new("[1]", "Entry", "3 -> 4", 3),
                ],
            )
            .children(2, vec![int("key", 1), int("value", 2)])
            .failing(3);
        let mut inspector = paused(pause).await;
        let mut session = java();

        let build = build_heap(&mut session, &mut inspector, &[map], Heap::new()).await;

        assert_eq!(build.heap[&Address(1)], HeapValue::Map(vec![(Value::Int(1), Value::Int(2))]));
        assert!(matches!(build.auxiliary[0].origin, AuxOrigin::Partial { .. }));
    }
}
