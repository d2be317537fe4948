//! The selector subset theme markup uses.
//!
//! Supports compound selectors (`tag.class[attr][attr=value]:not([attr])`)
//! chained with the descendant combinator. That covers every selector the
//! engine emits; anything else fails to match rather than panicking.

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Compound {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, Option<String>)>,
    pub not_attrs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Selector {
    /// Descendant chain, outermost first.
    pub chain: Vec<Compound>,
}

/// Read-only view of a node for matching.
pub(crate) trait Matchable {
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
}

impl Compound {
    pub fn matches(&self, node: &impl Matchable) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(node.tag()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| node.has_class(class)) {
            return false;
        }
        let attrs_ok = self.attrs.iter().all(|(name, value)| match (node.attr(name), value) {
            (Some(_), None) => true,
            (Some(actual), Some(expected)) => actual == expected,
            (None, _) => false,
        });
        attrs_ok && self.not_attrs.iter().all(|name| node.attr(name).is_none())
    }
}

impl Selector {
    pub fn parse(input: &str) -> Option<Self> {
        let chain = input
            .split_whitespace()
            .map(parse_compound)
            .collect::<Option<Vec<_>>>()?;
        if chain.is_empty() {
            return None;
        }
        Some(Self { chain })
    }

    /// Matches `node` against the chain; `ancestors` yields parents nearest first.
    pub fn matches<'a, N: Matchable + 'a>(
        &self,
        node: &N,
        ancestors: impl Iterator<Item = &'a N>,
    ) -> bool {
        let Some((subject, rest)) = self.chain.split_last() else {
            return false;
        };
        if !subject.matches(node) {
            return false;
        }
        let mut pending = rest.iter().rev().peekable();
        for ancestor in ancestors {
            match pending.peek() {
                Some(compound) if compound.matches(ancestor) => {
                    pending.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        pending.peek().is_none()
    }
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(input: &str) -> (&str, &str) {
    let end = input.find(|c: char| !is_ident(c)).unwrap_or(input.len());
    input.split_at(end)
}

fn parse_attr(body: &str) -> (String, Option<String>) {
    match body.split_once('=') {
        Some((name, value)) => (
            name.trim().to_string(),
            Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
        ),
        None => (body.trim().to_string(), None),
    }
}

fn parse_compound(input: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let (tag, mut rest) = take_ident(input);
    if !tag.is_empty() {
        compound.tag = Some(tag.to_string());
    } else if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    }

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            let (class, tail) = take_ident(after);
            if class.is_empty() {
                return None;
            }
            compound.classes.push(class.to_string());
            rest = tail;
        } else if let Some(after) = rest.strip_prefix(":not([") {
            let (body, tail) = after.split_once("])")?;
            compound.not_attrs.push(parse_attr(body).0);
            rest = tail;
        } else if let Some(after) = rest.strip_prefix('[') {
            let (body, tail) = after.split_once(']')?;
            compound.attrs.push(parse_attr(body));
            rest = tail;
        } else {
            return None;
        }
    }
    Some(compound)
}
