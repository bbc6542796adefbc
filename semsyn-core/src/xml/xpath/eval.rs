//! Evaluation of parsed expressions against a document

use super::parser::{Axis, Expr, LocationPath, NodeTest, Step};
use super::PathError;
use crate::xml::{Document, Fragment, NodeId, NodeKind};
use once_cell::unsync::OnceCell;
use std::collections::{HashMap, HashSet};

/// A node-set member: a tree node or one attribute of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Item {
    Node(NodeId),
    Attr(NodeId, usize),
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<Item>),
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy)]
struct Context {
    item: Item,
    position: usize,
}

/// A node test with its prefix already resolved to a namespace URI
enum Test<'a> {
    Any,
    Text,
    Wildcard,
    Name {
        namespace: Option<&'a str>,
        prefixed: bool,
        local: &'a str,
    },
}

type EvalResult<T> = Result<T, PathError>;

pub(super) fn select(
    doc: &Document,
    context: Option<&Fragment>,
    expr: &Expr,
) -> EvalResult<Vec<Fragment>> {
    let item = match context {
        None => Item::Node(NodeId::DOCUMENT),
        Some(Fragment::Element(id)) | Some(Fragment::Text(id)) => Item::Node(*id),
        Some(Fragment::Attribute(id, index)) => Item::Attr(*id, *index),
    };
    let evaluator = Evaluator {
        doc,
        order: OnceCell::new(),
    };
    let value = evaluator.eval(expr, Context { item, position: 1 })?;
    Ok(match value {
        Value::Nodes(items) => items
            .into_iter()
            .filter_map(|item| evaluator.fragment(item))
            .collect(),
        _ => Vec::new(),
    })
}

struct Evaluator<'d> {
    doc: &'d Document,
    order: OnceCell<HashMap<NodeId, usize>>,
}

impl<'d> Evaluator<'d> {
    fn fragment(&self, item: Item) -> Option<Fragment> {
        match item {
            Item::Attr(id, index) => Some(Fragment::Attribute(id, index)),
            Item::Node(id) => match self.doc.kind(id)? {
                NodeKind::Element(_) => Some(Fragment::Element(id)),
                NodeKind::Text(_) => Some(Fragment::Text(id)),
                NodeKind::Document => None,
            },
        }
    }

    fn eval(&self, expr: &Expr, ctx: Context) -> EvalResult<Value> {
        Ok(match expr {
            Expr::Or(a, b) => {
                Value::Bool(self.boolean(self.eval(a, ctx)?) || self.boolean(self.eval(b, ctx)?))
            }
            Expr::And(a, b) => {
                Value::Bool(self.boolean(self.eval(a, ctx)?) && self.boolean(self.eval(b, ctx)?))
            }
            Expr::Eq(a, b) => Value::Bool(self.compare(self.eval(a, ctx)?, self.eval(b, ctx)?, true)),
            Expr::Ne(a, b) => {
                Value::Bool(self.compare(self.eval(a, ctx)?, self.eval(b, ctx)?, false))
            }
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Number(*n),
            Expr::Function(name, args) => self.call(name, args, ctx)?,
            Expr::Path(path) => Value::Nodes(self.path(path, ctx.item)?),
        })
    }

    // =========================================================================
    // LOCATION PATHS
    // =========================================================================

    fn path(&self, path: &LocationPath, context: Item) -> EvalResult<Vec<Item>> {
        let mut current = vec![if path.absolute {
            Item::Node(NodeId::DOCUMENT)
        } else {
            context
        }];
        for step in &path.steps {
            let test = self.resolve(step)?;
            let mut next = Vec::new();
            let mut seen = HashSet::new();
            for item in &current {
                let candidates: Vec<Item> = self
                    .axis(*item, step.axis)
                    .into_iter()
                    .filter(|c| self.matches(*c, step.axis, &test))
                    .collect();
                for selected in self.filter(candidates, &step.predicates)? {
                    if seen.insert(selected) {
                        next.push(selected);
                    }
                }
            }
            if current.len() > 1 {
                self.sort(&mut next);
            }
            current = next;
        }
        Ok(current)
    }

    fn resolve<'s>(&self, step: &'s Step) -> EvalResult<Test<'s>>
    where
        'd: 's,
    {
        Ok(match &step.test {
            NodeTest::Node => Test::Any,
            NodeTest::Text => Test::Text,
            NodeTest::Wildcard => Test::Wildcard,
            NodeTest::Name { prefix, local } => match prefix {
                Some(prefix) => Test::Name {
                    namespace: Some(
                        self.doc
                            .namespace_uri(prefix)
                            .ok_or_else(|| PathError::UnknownPrefix(prefix.clone()))?,
                    ),
                    prefixed: true,
                    local: local.as_str(),
                },
                None => Test::Name {
                    namespace: None,
                    prefixed: false,
                    local: local.as_str(),
                },
            },
        })
    }

    fn axis(&self, item: Item, axis: Axis) -> Vec<Item> {
        match (axis, item) {
            (Axis::SelfNode, _) => vec![item],
            (Axis::Parent, Item::Node(id)) => self.doc.parent(id).map(Item::Node).into_iter().collect(),
            (Axis::Parent, Item::Attr(id, _)) => vec![Item::Node(id)],
            (Axis::Child, Item::Node(id)) => {
                self.doc.children(id).iter().map(|c| Item::Node(*c)).collect()
            }
            (Axis::Attribute, Item::Node(id)) => {
                let count = self.doc.element(id).map_or(0, |e| e.attributes.len());
                (0..count).map(|i| Item::Attr(id, i)).collect()
            }
            (Axis::DescendantOrSelf, Item::Node(id)) => {
                let mut out = vec![item];
                self.descendants(id, &mut out);
                out
            }
            (Axis::DescendantOrSelf, Item::Attr(..)) => vec![item],
            (Axis::Child, Item::Attr(..)) | (Axis::Attribute, Item::Attr(..)) => Vec::new(),
        }
    }

    fn descendants(&self, id: NodeId, out: &mut Vec<Item>) {
        for child in self.doc.children(id) {
            out.push(Item::Node(*child));
            self.descendants(*child, out);
        }
    }

    fn matches(&self, item: Item, axis: Axis, test: &Test<'_>) -> bool {
        match item {
            Item::Attr(id, index) => {
                let Some(attr) = self.doc.attribute(id, index) else {
                    return false;
                };
                match test {
                    Test::Any => true,
                    Test::Text => false,
                    Test::Wildcard => axis == Axis::Attribute,
                    Test::Name {
                        namespace, local, ..
                    } => {
                        (*local == "*" || attr.name.local == *local)
                            && attr.name.namespace.as_deref() == *namespace
                    }
                }
            }
            Item::Node(id) => match (self.doc.kind(id), test) {
                (_, Test::Any) => true,
                (Some(NodeKind::Text(_)), Test::Text) => true,
                (Some(NodeKind::Element(_)), Test::Wildcard) => axis != Axis::Attribute,
                (
                    Some(NodeKind::Element(element)),
                    Test::Name {
                        namespace,
                        prefixed,
                        local,
                    },
                ) => {
                    if *local != "*" && element.name.local != *local {
                        return false;
                    }
                    let actual = element.name.namespace.as_deref();
                    if *prefixed {
                        actual == *namespace
                    } else {
                        actual.is_none() || actual == self.doc.namespace_uri("")
                    }
                }
                _ => false,
            },
        }
    }

    fn filter(&self, mut items: Vec<Item>, predicates: &[Expr]) -> EvalResult<Vec<Item>> {
        for predicate in predicates {
            let mut kept = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let ctx = Context {
                    item: *item,
                    position: i + 1,
                };
                let keep = match self.eval(predicate, ctx)? {
                    Value::Number(n) => n == ctx.position as f64,
                    other => self.boolean(other),
                };
                if keep {
                    kept.push(*item);
                }
            }
            items = kept;
        }
        Ok(items)
    }

    fn sort(&self, items: &mut [Item]) {
        let order = self.order.get_or_init(|| {
            let mut order = HashMap::new();
            let mut stack = vec![NodeId::DOCUMENT];
            while let Some(id) = stack.pop() {
                order.insert(id, order.len());
                stack.extend(self.doc.children(id).iter().rev().copied());
            }
            order
        });
        items.sort_by_key(|item| match *item {
            Item::Node(id) => (order.get(&id).copied().unwrap_or(usize::MAX), 0),
            Item::Attr(id, index) => (order.get(&id).copied().unwrap_or(usize::MAX), index + 1),
        });
    }

    // =========================================================================
    // CONVERSIONS
    // =========================================================================

    fn item_string(&self, item: Item) -> String {
        match item {
            Item::Node(id) => self.doc.string_value(id),
            Item::Attr(id, index) => self
                .doc
                .attribute(id, index)
                .map(|a| a.value.clone())
                .unwrap_or_default(),
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(items) => items
                .first()
                .map(|item| self.item_string(*item))
                .unwrap_or_default(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            Value::Number(n) => n.to_string(),
            Value::Str(s) => s.clone(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            other => self.string(other).trim().parse().unwrap_or(f64::NAN),
        }
    }

    fn boolean(&self, value: Value) -> bool {
        match value {
            Value::Nodes(items) => !items.is_empty(),
            Value::Bool(b) => b,
            Value::Number(n) => n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn compare(&self, a: Value, b: Value, equal: bool) -> bool {
        match (a, b) {
            (Value::Nodes(x), Value::Nodes(y)) => x.iter().any(|i| {
                let left = self.item_string(*i);
                y.iter().any(|j| (left == self.item_string(*j)) == equal)
            }),
            (Value::Nodes(nodes), other) | (other, Value::Nodes(nodes)) => match other {
                Value::Bool(b) => (!nodes.is_empty() == b) == equal,
                Value::Number(n) => nodes.iter().any(|i| {
                    let v = self.item_string(*i).trim().parse().unwrap_or(f64::NAN);
                    (v == n) == equal
                }),
                Value::Str(s) => nodes.iter().any(|i| (self.item_string(*i) == s) == equal),
                Value::Nodes(_) => false,
            },
            (a, b) => {
                let same = if matches!(a, Value::Bool(_)) || matches!(b, Value::Bool(_)) {
                    self.boolean(a) == self.boolean(b)
                } else if matches!(a, Value::Number(_)) || matches!(b, Value::Number(_)) {
                    self.number(&a) == self.number(&b)
                } else {
                    self.string(&a) == self.string(&b)
                };
                same == equal
            }
        }
    }

    // =========================================================================
    // FUNCTIONS
    // =========================================================================

    fn args(&self, args: &[Expr], ctx: Context) -> EvalResult<Vec<Value>> {
        args.iter().map(|a| self.eval(a, ctx)).collect()
    }

    fn call(&self, name: &str, args: &[Expr], ctx: Context) -> EvalResult<Value> {
        let arity = |expected: &'static str| PathError::Arity {
            function: name.to_string(),
            expected,
        };
        let values = self.args(args, ctx)?;
        Ok(match name {
            "true" | "false" => {
                if !values.is_empty() {
                    return Err(arity("0"));
                }
                Value::Bool(name == "true")
            }
            "not" => {
                let [value] = <[Value; 1]>::try_from(values).map_err(|_| arity("1"))?;
                Value::Bool(!self.boolean(value))
            }
            "normalize-space" | "string" => {
                let text = match values.as_slice() {
                    [] => self.item_string(ctx.item),
                    [value] => self.string(value),
                    _ => return Err(arity("0 or 1")),
                };
                if name == "string" {
                    Value::Str(text)
                } else {
                    Value::Str(text.split_whitespace().collect::<Vec<_>>().join(" "))
                }
            }
            "contains" | "starts-with" => {
                let [haystack, needle] = <[Value; 2]>::try_from(values).map_err(|_| arity("2"))?;
                let (haystack, needle) = (self.string(&haystack), self.string(&needle));
                Value::Bool(if name == "contains" {
                    haystack.contains(&needle)
                } else {
                    haystack.starts_with(&needle)
                })
            }
            "count" => match <[Value; 1]>::try_from(values).map_err(|_| arity("1"))? {
                [Value::Nodes(items)] => Value::Number(items.len() as f64),
                _ => return Err(PathError::NotANodeSet(name.to_string())),
            },
            _ => return Err(PathError::UnknownFunction(name.to_string())),
        })
    }
}
