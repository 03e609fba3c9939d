//! The resolved service description model.

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexMap;
use url::Url;

use crate::schema::{Encoder, SchemaSet};

/// A namespace-qualified name with structural equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(namespace: Option<&str>, local: &str) -> Self {
        Self {
            namespace: namespace.map(ToOwned::to_owned),
            local: local.to_owned(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}:{}", namespace, self.local),
            None => f.write_str(&self.local),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Soap,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Rpc,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Use {
    Literal,
    Encoded,
}

/// Concrete transport mapping a port resolved to. Referenced, not
/// owned, by every [`Function`] assembled from it.
#[derive(Debug)]
pub struct Binding {
    pub name: String,
    pub location: String,
    pub kind: BindingKind,
}

#[derive(Debug)]
pub enum BindingKind {
    Soap(SoapBinding),
    Http,
}

#[derive(Debug)]
pub struct SoapBinding {
    pub style: Style,
    pub transport: Option<String>,
}

impl Binding {
    pub fn protocol(&self) -> Protocol {
        match &self.kind {
            BindingKind::Soap(..) => Protocol::Soap,
            BindingKind::Http => Protocol::Http,
        }
    }
}

/// One direction of a SOAP operation. `use_` stays `None` when the
/// binding operation carried no `<soap:body>` child at all; headers are
/// collected either way.
#[derive(Debug, Default)]
pub struct SoapBody {
    pub use_: Option<Use>,
    pub namespace: Option<String>,
    pub parts: Option<String>,
    pub encoding_style: Option<String>,
    pub headers: IndexMap<QName, SoapHeader>,
}

#[derive(Debug)]
pub struct SoapHeader {
    pub name: String,
    pub namespace: Option<String>,
    pub use_: Use,
    pub encoding_style: Option<String>,
    pub element: Option<QName>,
    pub encoder: Option<Encoder>,
}

#[derive(Debug)]
pub struct SoapOperation {
    pub soap_action: Option<String>,
    pub style: Style,
    pub input: SoapBody,
    pub output: SoapBody,
}

#[derive(Debug)]
pub enum FunctionKind {
    Soap(SoapOperation),
    Http,
}

/// An ordered, named, typed message part.
#[derive(Debug)]
pub struct Param {
    pub name: String,
    pub order: usize,
    pub element: Option<QName>,
    pub encoder: Option<Encoder>,
}

/// A callable operation merged from a port type and its binding.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub request_name: Option<String>,
    pub response_name: Option<String>,
    pub request_params: Option<Vec<Param>>,
    pub response_params: Option<Vec<Param>>,
    pub binding: Arc<Binding>,
    pub kind: FunctionKind,
}

impl Function {
    pub fn soap(&self) -> Option<&SoapOperation> {
        match &self.kind {
            FunctionKind::Soap(operation) => Some(operation),
            FunctionKind::Http => None,
        }
    }
}

/// The fully resolved service description for one WSDL URI.
///
/// Published into the process-wide cache once built, after which it is
/// immutable and shared read-only.
#[derive(Debug)]
pub struct SdlModel {
    pub(crate) source: Url,
    pub(crate) target_ns: Option<String>,
    pub(crate) functions: HashMap<String, Arc<Function>>,
    pub(crate) requests: Option<HashMap<String, Arc<Function>>>,
    pub(crate) bindings: Option<HashMap<String, Arc<Binding>>>,
    pub(crate) schema: SchemaSet,
}

impl SdlModel {
    pub fn source(&self) -> &Url {
        &self.source
    }

    /// Target namespace of the top-level document; imports don't
    /// contribute one.
    pub fn target_namespace(&self) -> Option<&str> {
        self.target_ns.as_deref()
    }

    /// Looks a function up by operation name, falling through to the
    /// alternate wire request names. Lookup is case-insensitive.
    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        let key = name.to_ascii_lowercase();

        self.functions.get(&key).or_else(|| {
            self.requests
                .as_ref()
                .and_then(|requests| requests.get(&key))
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &Arc<Function>> {
        self.functions.values()
    }

    pub fn binding(&self, name: &str) -> Option<&Arc<Binding>> {
        self.bindings.as_ref()?.get(name)
    }

    /// First binding carrying the given protocol tag, in no particular
    /// order.
    pub fn first_binding(&self, protocol: Protocol) -> Option<&Arc<Binding>> {
        self.bindings
            .as_ref()?
            .values()
            .find(|binding| binding.protocol() == protocol)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Arc<Binding>> {
        self.bindings.iter().flat_map(|bindings| bindings.values())
    }

    /// Handles into the schema engine's element/type/attribute tables.
    pub fn schema(&self) -> &SchemaSet {
        &self.schema
    }
}
