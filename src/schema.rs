//! Schema-side tables the loader resolves type and element references
//! against.
//!
//! This is the narrow surface the WSDL pass needs from a schema engine:
//! element, named-type and attribute declarations collected from every
//! `<schema>` seen during the build, plus the two finalization hooks
//! that let references settle before and after binding assembly. Full
//! XSD processing is someone else's job.

use std::collections::HashMap;

use tracing::trace;

use crate::{dom::Element, ns, types::QName};

/// Opaque marshalling descriptor handed to the envelope codec. Two
/// encoders are the same exactly when they name the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoder {
    name: QName,
}

impl Encoder {
    pub(crate) fn new(name: QName) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct ElementDecl {
    pub name: QName,
    pub type_ref: Option<QName>,
    pub encoder: Option<Encoder>,
}

#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: QName,
    pub type_ref: Option<QName>,
    pub encoder: Option<Encoder>,
}

const XSD_BUILTINS: &[&str] = &[
    "anyType",
    "anySimpleType",
    "anyURI",
    "base64Binary",
    "boolean",
    "byte",
    "date",
    "dateTime",
    "decimal",
    "double",
    "duration",
    "ENTITY",
    "float",
    "gDay",
    "gMonth",
    "gMonthDay",
    "gYear",
    "gYearMonth",
    "hexBinary",
    "ID",
    "IDREF",
    "int",
    "integer",
    "language",
    "long",
    "Name",
    "NCName",
    "negativeInteger",
    "NMTOKEN",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "normalizedString",
    "NOTATION",
    "positiveInteger",
    "QName",
    "short",
    "string",
    "time",
    "token",
    "unsignedByte",
    "unsignedInt",
    "unsignedLong",
    "unsignedShort",
];

#[derive(Debug, Default)]
pub struct SchemaSet {
    elements: HashMap<QName, ElementDecl>,
    types: HashMap<QName, Encoder>,
    attributes: HashMap<QName, AttributeDecl>,
}

impl SchemaSet {
    /// Registers the top-level declarations of one `<schema>` element.
    /// Declarations are keyed under the schema's target namespace, or
    /// bare when it has none.
    pub(crate) fn collect(&mut self, schema: &Element) {
        let target_ns = schema.attr("targetNamespace");

        for child in schema.children() {
            match child.name() {
                "element" => {
                    if let Some(name) = child.attr("name") {
                        let name = QName::new(target_ns, name);
                        let type_ref = child.attr("type").map(|raw| child.resolve_qname(raw));

                        self.elements.insert(
                            name.clone(),
                            ElementDecl {
                                name,
                                type_ref,
                                encoder: None,
                            },
                        );
                    }
                }

                "simpleType" | "complexType" => {
                    if let Some(name) = child.attr("name") {
                        let name = QName::new(target_ns, name);
                        self.types.insert(name.clone(), Encoder::new(name));
                    }
                }

                "attribute" => {
                    if let Some(name) = child.attr("name") {
                        let name = QName::new(target_ns, name);
                        let type_ref = child.attr("type").map(|raw| child.resolve_qname(raw));

                        self.attributes.insert(
                            name.clone(),
                            AttributeDecl {
                                name,
                                type_ref,
                                encoder: None,
                            },
                        );
                    }
                }

                other => trace!(element = other, "schema construct outside the collected surface"),
            }
        }
    }

    pub fn element(&self, namespace: Option<&str>, local: &str) -> Option<&ElementDecl> {
        self.elements.get(&QName::new(namespace, local))
    }

    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&AttributeDecl> {
        self.attributes.get(&QName::new(namespace, local))
    }

    /// Encoder for a qualified type name. XSD built-in types always
    /// resolve; everything else must have been declared in a collected
    /// schema.
    pub fn encoder(&self, namespace: Option<&str>, local: &str) -> Option<Encoder> {
        if namespace == Some(ns::XSD) && XSD_BUILTINS.contains(&local) {
            return Some(Encoder::new(QName::new(namespace, local)));
        }

        self.types.get(&QName::new(namespace, local)).cloned()
    }

    fn lookup(&self, name: &QName) -> Option<Encoder> {
        self.encoder(name.namespace.as_deref(), &name.local)
    }

    /// First finalization hook, run once every document is collected:
    /// settle element encoders, now that the types they point at are
    /// all registered. An element without a `type` reference encodes as
    /// itself.
    pub(crate) fn finalize_declarations(&mut self) {
        let settled: Vec<(QName, Option<Encoder>)> = self
            .elements
            .iter()
            .map(|(key, decl)| {
                let encoder = match &decl.type_ref {
                    Some(type_ref) => self.lookup(type_ref),
                    None => Some(Encoder::new(decl.name.clone())),
                };
                (key.clone(), encoder)
            })
            .collect();

        for (key, encoder) in settled {
            if let Some(decl) = self.elements.get_mut(&key) {
                decl.encoder = encoder;
            }
        }
    }

    /// Second finalization hook, run once binding assembly is done:
    /// settle the attribute table the same way.
    pub(crate) fn finalize_model(&mut self) {
        let settled: Vec<(QName, Option<Encoder>)> = self
            .attributes
            .iter()
            .map(|(key, decl)| {
                let encoder = match &decl.type_ref {
                    Some(type_ref) => self.lookup(type_ref),
                    None => Some(Encoder::new(decl.name.clone())),
                };
                (key.clone(), encoder)
            })
            .collect();

        for (key, encoder) in settled {
            if let Some(decl) = self.attributes.get_mut(&key) {
                decl.encoder = encoder;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    fn schema_set(xml: &str) -> SchemaSet {
        let document = dom::parse(xml.as_bytes()).unwrap();
        let mut schema = SchemaSet::default();
        schema.collect(document.root());
        schema.finalize_declarations();
        schema.finalize_model();
        schema
    }

    #[test]
    fn builtin_types_always_resolve() {
        let schema = SchemaSet::default();

        assert!(schema.encoder(Some(ns::XSD), "string").is_some());
        assert!(schema.encoder(Some(ns::XSD), "noSuchType").is_none());
        assert!(schema.encoder(Some("urn:other"), "string").is_none());
    }

    #[test]
    fn element_inherits_encoder_from_its_type() {
        let schema = schema_set(
            r#"<schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x">
                 <element name="Count" type="xsd:int"/>
               </schema>"#,
        );

        let decl = schema.element(Some("urn:x"), "Count").unwrap();
        assert_eq!(
            decl.encoder.as_ref().map(|encoder| encoder.name().clone()),
            Some(QName::new(Some(ns::XSD), "int"))
        );
    }

    #[test]
    fn element_without_type_encodes_as_itself() {
        let schema = schema_set(
            r#"<schema targetNamespace="urn:x">
                 <element name="Payload"/>
               </schema>"#,
        );

        let decl = schema.element(Some("urn:x"), "Payload").unwrap();
        assert_eq!(
            decl.encoder.as_ref().map(|encoder| encoder.name().clone()),
            Some(QName::new(Some("urn:x"), "Payload"))
        );
    }

    #[test]
    fn declared_types_and_attributes_are_keyed_by_target_namespace() {
        let schema = schema_set(
            r#"<schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x">
                 <complexType name="Pair"/>
                 <attribute name="unit" type="xsd:string"/>
               </schema>"#,
        );

        assert!(schema.encoder(Some("urn:x"), "Pair").is_some());
        assert!(schema.encoder(None, "Pair").is_none());

        let attribute = schema.attribute(Some("urn:x"), "unit").unwrap();
        assert_eq!(
            attribute.encoder.as_ref().map(|encoder| encoder.name().clone()),
            Some(QName::new(Some(ns::XSD), "string"))
        );
    }
}
