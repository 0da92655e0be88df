//! Query evaluation against an [`XmlDocument`].

use super::parser::{Axis, Condition, LocationPath, NameTest, Predicate, Step};
use crate::core::source::dom::{NodeId, XmlDocument};

/// A node selected by a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    /// The (virtual) document node above the root element
    Document,
    Element(NodeId),
    /// Attribute `index` of the element
    Attribute(NodeId, usize),
    /// Direct text content of the element
    Text(NodeId),
}

impl Item {
    fn order_key(&self) -> (u64, usize) {
        match *self {
            Item::Document => (0, 0),
            Item::Element(id) => (u64::from(id) + 1, 0),
            Item::Text(id) => (u64::from(id) + 1, 1),
            Item::Attribute(id, idx) => (u64::from(id) + 1, idx + 2),
        }
    }
}

/// Evaluate a union of location paths from `context`, returning
/// de-duplicated items in document order
pub fn evaluate(doc: &XmlDocument, paths: &[LocationPath], context: Item) -> Vec<Item> {
    let mut out = Vec::new();
    for path in paths {
        out.extend(evaluate_path(doc, path, context));
    }
    sort_unique(&mut out);
    out
}

/// String value of an item
pub fn string_value(doc: &XmlDocument, item: Item) -> String {
    match item {
        Item::Document => doc.string_value(doc.root()),
        Item::Element(id) => doc.string_value(id),
        Item::Attribute(id, idx) => doc.element(id).attributes[idx].value.clone(),
        Item::Text(id) => doc.element(id).own_text(),
    }
}

fn sort_unique(items: &mut Vec<Item>) {
    items.sort_by_key(Item::order_key);
    items.dedup();
}

fn evaluate_path(doc: &XmlDocument, path: &LocationPath, context: Item) -> Vec<Item> {
    let mut current = if path.absolute {
        vec![Item::Document]
    } else {
        vec![context]
    };
    for step in &path.steps {
        current = apply_step(doc, &current, step);
        if current.is_empty() {
            break;
        }
    }
    current
}

fn apply_step(doc: &XmlDocument, input: &[Item], step: &Step) -> Vec<Item> {
    let mut out = Vec::new();
    for &item in input {
        let bases = if step.descendant {
            descendant_or_self(doc, item)
        } else {
            vec![item]
        };
        for base in bases {
            let mut selected = select_axis(doc, base, step);
            for predicate in &step.predicates {
                selected = apply_predicate(doc, selected, predicate);
            }
            out.extend(selected);
        }
    }
    sort_unique(&mut out);
    out
}

fn select_axis(doc: &XmlDocument, base: Item, step: &Step) -> Vec<Item> {
    match step.axis {
        Axis::Child => children(doc, base)
            .into_iter()
            .filter(|&id| {
                let el = doc.element(id);
                matches_name(&step.test, el.namespace.as_deref(), &el.local_name)
            })
            .map(Item::Element)
            .collect(),
        Axis::Attribute => match base {
            Item::Element(id) => doc
                .element(id)
                .attributes
                .iter()
                .enumerate()
                .filter(|(_, a)| matches_name(&step.test, a.namespace.as_deref(), &a.local_name))
                .map(|(idx, _)| Item::Attribute(id, idx))
                .collect(),
            _ => Vec::new(),
        },
        Axis::Parent => parent(doc, base).into_iter().collect(),
        Axis::SelfNode => vec![base],
        Axis::Text => match base {
            Item::Element(id) if !doc.element(id).own_text().is_empty() => vec![Item::Text(id)],
            _ => Vec::new(),
        },
    }
}

fn children(doc: &XmlDocument, item: Item) -> Vec<NodeId> {
    match item {
        Item::Document => vec![doc.root()],
        Item::Element(id) => doc.element(id).child_ids().collect(),
        Item::Attribute(..) | Item::Text(_) => Vec::new(),
    }
}

fn parent(doc: &XmlDocument, item: Item) -> Option<Item> {
    match item {
        Item::Document => None,
        Item::Element(id) => Some(
            doc.element(id)
                .parent
                .map(Item::Element)
                .unwrap_or(Item::Document),
        ),
        Item::Attribute(id, _) | Item::Text(id) => Some(Item::Element(id)),
    }
}

fn descendant_or_self(doc: &XmlDocument, item: Item) -> Vec<Item> {
    match item {
        Item::Document => {
            let root = doc.root();
            let mut out = vec![Item::Document, Item::Element(root)];
            out.extend(doc.descendants(root).into_iter().map(Item::Element));
            out
        }
        Item::Element(id) => {
            let mut out = vec![Item::Element(id)];
            out.extend(doc.descendants(id).into_iter().map(Item::Element));
            out
        }
        other => vec![other],
    }
}

fn matches_name(test: &NameTest, namespace: Option<&str>, local: &str) -> bool {
    match test {
        NameTest::Any => true,
        NameTest::AnyIn(ns) => namespace == Some(ns.as_str()),
        NameTest::Name {
            namespace: want_ns,
            local: want_local,
        } => want_local == local && want_ns.as_deref() == namespace,
    }
}

fn apply_predicate(doc: &XmlDocument, selected: Vec<Item>, predicate: &Predicate) -> Vec<Item> {
    match predicate {
        Predicate::Position(n) => selected.get(n - 1).copied().into_iter().collect(),
        Predicate::Condition(condition) => selected
            .into_iter()
            .filter(|&item| test_condition(doc, condition, item))
            .collect(),
    }
}

fn test_condition(doc: &XmlDocument, condition: &Condition, item: Item) -> bool {
    match condition {
        Condition::Or(a, b) => test_condition(doc, a, item) || test_condition(doc, b, item),
        Condition::And(a, b) => test_condition(doc, a, item) && test_condition(doc, b, item),
        Condition::Not(inner) => !test_condition(doc, inner, item),
        Condition::Exists(path) => !evaluate_path(doc, path, item).is_empty(),
        // Node-set comparison: true when any selected node satisfies it
        Condition::Compare {
            path,
            value,
            negated,
        } => evaluate_path(doc, path, item)
            .into_iter()
            .any(|found| (string_value(doc, found) == *value) != *negated),
    }
}
