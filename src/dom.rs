//! Owned document tree over quick-xml events.
//!
//! The loader works on a plain element tree rather than a stream of
//! events; this module builds that tree and tracks the `xmlns` scope
//! visible at each element so prefixed attribute values can be resolved
//! against the bindings in force where they appear.

use std::collections::HashMap;
use std::io::BufRead;

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use crate::{error::Error, types::QName};

pub fn split_name(prefixed_name: &str) -> (Option<&str>, &str) {
    let mut split = prefixed_name.split(':');
    let first = split.next().unwrap_or(prefixed_name);
    let second = split.next();

    if let Some(second) = second {
        (Some(first), second)
    } else {
        (None, first)
    }
}

pub fn local_part(prefixed_name: &str) -> &str {
    split_name(prefixed_name).1
}

#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn root(&self) -> &Element {
        &self.root
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    scope: HashMap<Option<String>, String>,
    children: Vec<Element>,
}

impl Element {
    /// Local name, prefix stripped.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// First attribute whose local name matches, prefix ignored.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_part(key) == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }

    pub fn child(&self, local: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == local)
    }

    pub fn child_in_ns(&self, local: &str, namespace: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|child| child.name == local && child.namespace.as_deref() == Some(namespace))
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == local)
    }

    pub fn children_in_ns<'a>(
        &'a self,
        local: &'a str,
        namespace: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| {
            child.name == local && child.namespace.as_deref() == Some(namespace)
        })
    }

    pub fn child_with_attr(&self, local: &str, attr: &str, value: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|child| child.name == local && child.attr(attr) == Some(value))
    }

    /// Namespace bound to `prefix` at this element, `None` prefix being
    /// the default namespace.
    pub fn resolve_prefix(&self, prefix: Option<&str>) -> Option<&str> {
        self.scope
            .get(&prefix.map(ToOwned::to_owned))
            .map(String::as_str)
    }

    /// Splits a possibly prefixed name and resolves the prefix against
    /// the scope visible here. An unresolvable prefix keeps the raw
    /// string as a bare local name, which is how the bare-form fallback
    /// lookups find it.
    pub fn resolve_qname(&self, raw: &str) -> QName {
        let (prefix, local) = split_name(raw);

        match self.resolve_prefix(prefix) {
            Some(namespace) => QName::new(Some(namespace), local),
            None => QName::new(None, raw),
        }
    }
}

pub fn parse(bytes: &[u8]) -> Result<Document, Error> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut buffer = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event(&mut buffer)? {
            Event::Start(start) => {
                let element = open_element(&reader, &start, stack.last())?;
                stack.push(element);
            }

            Event::End(..) => {
                if let Some(element) = stack.pop() {
                    close_element(element, &mut stack, &mut root);
                }
            }

            Event::Empty(start) => {
                let element = open_element(&reader, &start, stack.last())?;
                close_element(element, &mut stack, &mut root);
            }

            Event::Eof => break,

            // Text and the rest carry nothing the loader reads.
            _ => (),
        }

        buffer.clear();
    }

    root.map(|root| Document { root }).ok_or(Error::EmptyDocument)
}

fn open_element<B: BufRead>(
    reader: &Reader<B>,
    start: &BytesStart<'_>,
    parent: Option<&Element>,
) -> Result<Element, Error> {
    let (prefix, local) = split_name(reader.decode(start.name())?);
    let (prefix, local) = (prefix.map(ToOwned::to_owned), local.to_owned());

    let mut scope = parent.map(|parent| parent.scope.clone()).unwrap_or_default();
    let mut attributes = Vec::new();

    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = reader.decode(attribute.key)?;
        let value = reader.decode(attribute.value.as_ref())?.to_owned();

        match split_name(key) {
            (Some("xmlns"), bound_prefix) => {
                scope.insert(Some(bound_prefix.to_owned()), value);
            }
            (None, "xmlns") => {
                scope.insert(None, value);
            }
            _ => attributes.push((key.to_owned(), value)),
        }
    }

    let namespace = scope.get(&prefix).cloned();

    Ok(Element {
        name: local,
        namespace,
        attributes,
        scope,
        children: Vec::new(),
    })
}

fn close_element(element: Element, stack: &mut Vec<Element>, root: &mut Option<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
