// Shape-tolerant accessors over raw Yahoo Fantasy JSON.
//
// Yahoo encodes "zero or more of X" three different ways: a single object, a
// sequence, or a mapping keyed by ordinal strings plus a `count` sentinel.
// Everything in this module reads through those encodings without the caller
// having to branch on which one it got.

use serde_json::{Map, Value};

/// Literal key Yahoo adds next to ordinal keys in collection mappings.
pub const COUNT_KEY: &str = "count";

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// The structural view of a raw value that every traversal matches on.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    /// `null`, or a value that was never there.
    Absent,
    /// String, number or bool.
    Scalar(&'a Value),
    List(&'a [Value]),
    Map(&'a Map<String, Value>),
}

impl<'a> Shape<'a> {
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Null => Shape::Absent,
            Value::Array(items) => Shape::List(items),
            Value::Object(map) => Shape::Map(map),
            scalar => Shape::Scalar(scalar),
        }
    }

    pub fn as_list(self) -> Option<&'a [Value]> {
        match self {
            Shape::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(self) -> Option<&'a Map<String, Value>> {
        match self {
            Shape::Map(map) => Some(map),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// iterate / first
// ---------------------------------------------------------------------------

/// Yield the value stored under `key` in every mapping-typed element of
/// `container`.
///
/// A mapping container is walked over its values (payload order, since
/// serde_json is built with `preserve_order`); a sequence over its elements.
/// Absent, scalar and empty containers produce nothing. Elements that are not
/// mappings, or mappings without `key`, are skipped.
pub fn iterate<'a>(container: &'a Value, key: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    children(container).filter_map(move |item| match Shape::of(item) {
        Shape::Map(map) => map.get(key),
        _ => None,
    })
}

/// First match of [`iterate`], or `None`.
pub fn first<'a>(container: &'a Value, key: &str) -> Option<&'a Value> {
    children(container).find_map(|item| match Shape::of(item) {
        Shape::Map(map) => map.get(key),
        _ => None,
    })
}

/// Direct children of a container: mapping values or sequence elements.
fn children(container: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match Shape::of(container) {
        Shape::Map(map) => Box::new(map.values()),
        Shape::List(items) => Box::new(items.iter()),
        Shape::Absent | Shape::Scalar(_) => Box::new(std::iter::empty()),
    }
}

/// Read `key` from a node that is either a mapping holding it directly or a
/// container of attribute blocks (`[{"guid": ..}, {"games": ..}]`).
pub fn lookup<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match Shape::of(node) {
        Shape::Map(map) if map.contains_key(key) => map.get(key),
        _ => first(node, key),
    }
}

/// Iterate the entries of a Yahoo collection (`{"0": {"team": ..}, "count": 2}`
/// or `[{"team": ..}]`), skipping the `count` sentinel and projecting each
/// entry through `key`.
pub fn entries<'a>(section: &'a Value, key: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    let items: Box<dyn Iterator<Item = &'a Value> + 'a> = match Shape::of(section) {
        Shape::Map(map) => Box::new(
            map.iter()
                .filter(|(k, _)| k.as_str() != COUNT_KEY)
                .map(|(_, v)| v),
        ),
        Shape::List(items) => Box::new(items.iter()),
        Shape::Absent | Shape::Scalar(_) => Box::new(std::iter::empty()),
    };
    items.filter_map(move |item| match Shape::of(item) {
        Shape::Map(map) => map.get(key),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Nested attribute sequences
// ---------------------------------------------------------------------------

/// First sequence among the direct children of `items` that carries at least
/// one mapping. Empty `[]` placeholders Yahoo scatters through attribute lists
/// are passed over.
pub fn first_list(items: &[Value]) -> Option<&[Value]> {
    items
        .iter()
        .filter_map(|item| Shape::of(item).as_list())
        .find(|list| has_maps(list))
}

/// Locate the attribute sequence of a team or player block.
///
/// Yahoo sends `[attrs..]`, `[[attrs..], {sub-block}]`, and occasionally
/// `[[[attrs..]]]`. The first sequence found within two nesting levels that
/// carries mapping entries wins; a flat sequence of mappings is its own
/// attribute list.
pub fn attribute_list(node: &Value) -> Option<&[Value]> {
    let outer = Shape::of(node).as_list()?;
    if let Some(inner) = first_list(outer) {
        return Some(inner);
    }
    let deeper = outer
        .iter()
        .filter_map(|item| Shape::of(item).as_list())
        .find_map(first_list);
    deeper.or_else(|| has_maps(outer).then_some(outer))
}

/// Attribute sequence of a block whose identity lives under `required`
/// (`team_key`, `player_key`).
///
/// A sequence that itself carries `required` wins over any sub-sequence, so a
/// flat attribute list followed by a nested block such as `[{"team_logo": ..}]`
/// still resolves to the attributes. Without such a match this falls back to
/// [`attribute_list`].
pub fn attribute_list_for<'a>(node: &'a Value, required: &str) -> Option<&'a [Value]> {
    let outer = Shape::of(node).as_list()?;
    if attr(outer, required).is_some() {
        return Some(outer);
    }
    for list in outer.iter().filter_map(|item| Shape::of(item).as_list()) {
        if attr(list, required).is_some() {
            return Some(list);
        }
        let inner = list
            .iter()
            .filter_map(|item| Shape::of(item).as_list())
            .find(|inner| attr(inner, required).is_some());
        if inner.is_some() {
            return inner;
        }
    }
    attribute_list(node)
}

fn has_maps(items: &[Value]) -> bool {
    items.iter().any(|item| matches!(item, Value::Object(_)))
}

/// Mapping siblings of the attribute list inside a wrapping sequence.
///
/// For `[[attrs..], {"ownership": ..}]` this yields the ownership mapping.
pub fn sibling_blocks(node: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    Shape::of(node)
        .as_list()
        .unwrap_or_default()
        .iter()
        .filter_map(|item| Shape::of(item).as_map())
}

/// Value of `key` in the first attribute block that carries it.
pub fn attr<'a>(attrs: &'a [Value], key: &str) -> Option<&'a Value> {
    attrs.iter().find_map(|item| match Shape::of(item) {
        Shape::Map(map) => map.get(key),
        _ => None,
    })
}

/// `text` applied to `attr(attrs, key)`.
pub fn attr_text(attrs: &[Value], key: &str) -> Option<String> {
    attr(attrs, key).and_then(text)
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Render a scalar as trimmed text. Strings are trimmed, numbers formatted;
/// empty strings, bools and containers produce `None`.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `text` applied to `lookup(node, key)`.
pub fn text_at(node: &Value, key: &str) -> Option<String> {
    lookup(node, key).and_then(text)
}

/// Yahoo flags are `"1"`, `1`, `true` or `"true"` when set.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True" | "yes"),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Payload sections
// ---------------------------------------------------------------------------

/// Strip the `fantasy_content` envelope when present.
pub fn content(payload: &Value) -> &Value {
    payload.get("fantasy_content").unwrap_or(payload)
}

/// The `league` node of a league-scoped payload.
pub fn league_node(payload: &Value) -> Option<&Value> {
    lookup(content(payload), "league")
}

/// A named sub-section of the league node, e.g. `teams` or `players`.
pub fn league_section<'a>(payload: &'a Value, key: &'a str) -> Option<&'a Value> {
    league_node(payload).and_then(|league| lookup(league, key))
}
