//! The WSDL loader and model builder.
//!
//! A top-level build runs depth-first and synchronous: fetch and parse
//! the document graph (imports resolved against the importing
//! document, a visited set terminating cycles), collect the
//! declarations of every definitions document into transient tables,
//! let the schema settle, then walk services → ports → bindings →
//! operations and merge the abstract port-type operations with their
//! concrete bindings into the function table. Any failure aborts the
//! whole build; the transient tables die with it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, trace};
use url::Url;

use crate::{
    dom::{self, local_part, Document, Element},
    error::Error,
    fetch::Fetch,
    ns,
    schema::{Encoder, SchemaSet},
    types::{
        Binding, BindingKind, Function, FunctionKind, Param, QName, SdlModel, SoapBinding,
        SoapBody, SoapHeader, SoapOperation, Style, Use,
    },
};

/// Transient per-build symbol tables, keyed by local name and kept in
/// document order. Discarded once assembly has consumed them.
#[derive(Default)]
struct LoadCtx<'doc> {
    messages: IndexMap<String, &'doc Element>,
    port_types: IndexMap<String, &'doc Element>,
    bindings: IndexMap<String, &'doc Element>,
    services: IndexMap<String, &'doc Element>,
}

/// Model tables under construction; the secondary tables only come
/// into being when something lands in them.
#[derive(Default)]
struct ModelTables {
    functions: HashMap<String, Arc<Function>>,
    requests: Option<HashMap<String, Arc<Function>>>,
    bindings: Option<HashMap<String, Arc<Binding>>>,
}

enum DocumentKind {
    Definitions,
    Schema,
}

struct LoadedDocument {
    document: Document,
    kind: DocumentKind,
}

pub(crate) fn load(fetcher: &dyn Fetch, url: Url) -> Result<SdlModel, Error> {
    debug!(%url, "building service description");

    let mut visited = HashSet::new();
    let mut documents = Vec::new();
    fetch_documents(fetcher, url.clone(), false, &mut visited, &mut documents)?;

    // the target namespace comes from the top-level document alone
    let target_ns = documents
        .first()
        .and_then(|loaded| loaded.document.root().attr("targetNamespace"))
        .map(ToOwned::to_owned);

    let mut schema = SchemaSet::default();
    let mut ctx = LoadCtx::default();

    for loaded in &documents {
        match loaded.kind {
            DocumentKind::Definitions => collect(&mut ctx, &mut schema, loaded.document.root())?,
            DocumentKind::Schema => schema.collect(loaded.document.root()),
        }
    }

    schema.finalize_declarations();

    let mut model = ModelTables::default();
    assemble(&ctx, &schema, &mut model)?;

    schema.finalize_model();

    debug!(functions = model.functions.len(), "service description built");

    Ok(SdlModel {
        source: url,
        target_ns,
        functions: model.functions,
        requests: model.requests,
        bindings: model.bindings,
        schema,
    })
}

/// Fetches `url` and everything it transitively imports, depth-first.
/// Each absolute URI is fetched and parsed at most once per build,
/// which is what makes import cycles terminate.
fn fetch_documents(
    fetcher: &dyn Fetch,
    url: Url,
    import: bool,
    visited: &mut HashSet<Url>,
    documents: &mut Vec<LoadedDocument>,
) -> Result<(), Error> {
    if !visited.insert(url.clone()) {
        trace!(%url, "already loaded this build");
        return Ok(());
    }

    debug!(%url, import, "loading document");
    let bytes = fetcher.fetch(&url)?;
    let document = dom::parse(&bytes)?;

    if document.root().name() != "definitions" {
        // an imported document may be a bare schema, handed to the
        // schema engine as-is
        if import && document.root().name() == "schema" {
            documents.push(LoadedDocument {
                document,
                kind: DocumentKind::Schema,
            });
            return Ok(());
        }

        return Err(Error::MissingDefinitions(url.to_string()));
    }

    // imports without a location are skipped, not diagnosed
    let imports: Vec<String> = document
        .root()
        .children_named("import")
        .filter_map(|import| import.attr("location").map(ToOwned::to_owned))
        .collect();

    documents.push(LoadedDocument {
        document,
        kind: DocumentKind::Definitions,
    });

    for location in imports {
        let target = url.join(&location)?;
        fetch_documents(fetcher, target, true, visited, documents)?;
    }

    Ok(())
}

/// One pass over the immediate children of a `<definitions>` element,
/// filling the transient tables and forwarding schemas.
fn collect<'doc>(
    ctx: &mut LoadCtx<'doc>,
    schema: &mut SchemaSet,
    definitions: &'doc Element,
) -> Result<(), Error> {
    for child in definitions.children() {
        match child.name() {
            "types" => {
                for node in child.children_named("schema") {
                    schema.collect(node);
                }
            }

            // resolved by the loader pass
            "import" => (),

            "message" => declare(&mut ctx.messages, "message", child)?,
            "portType" => declare(&mut ctx.port_types, "portType", child)?,
            "binding" => declare(&mut ctx.bindings, "binding", child)?,
            "service" => declare(&mut ctx.services, "service", child)?,

            other => trace!(element = other, "skipping definitions child"),
        }
    }

    Ok(())
}

fn declare<'doc>(
    table: &mut IndexMap<String, &'doc Element>,
    kind: &'static str,
    node: &'doc Element,
) -> Result<(), Error> {
    let name = node.attr("name").ok_or(Error::UnnamedDeclaration(kind))?;

    if table.insert(name.to_owned(), node).is_some() {
        return Err(Error::DuplicateDeclaration {
            kind,
            name: name.to_owned(),
        });
    }

    Ok(())
}

enum AddressKind {
    Soap(&'static str),
    Http,
}

fn assemble(ctx: &LoadCtx<'_>, schema: &SchemaSet, model: &mut ModelTables) -> Result<(), Error> {
    if ctx.services.is_empty() {
        return Err(Error::NoServices);
    }

    for service in ctx.services.values() {
        for port in service.children_named("port") {
            assemble_port(ctx, schema, model, port)?;
        }
    }

    Ok(())
}

fn assemble_port(
    ctx: &LoadCtx<'_>,
    schema: &SchemaSet,
    model: &mut ModelTables,
    port: &Element,
) -> Result<(), Error> {
    let binding_attr = port.attr("binding").ok_or(Error::PortWithoutBinding)?;
    let address = port.child("address").ok_or(Error::PortWithoutAddress)?;
    let location = address
        .attr("location")
        .ok_or(Error::AddressWithoutLocation)?;

    // the namespace of the address element decides the protocol
    let address_kind = match address.namespace().ok_or(Error::UnknownBindingType)? {
        ns::WSDL_SOAP11 => AddressKind::Soap(ns::WSDL_SOAP11),
        ns::WSDL_SOAP12 => AddressKind::Soap(ns::WSDL_SOAP12),
        ns::RPC_SOAP12 => AddressKind::Soap(ns::RPC_SOAP12),
        ns::WSDL_HTTP11 | ns::WSDL_HTTP12 => AddressKind::Http,
        other => return Err(Error::UnsupportedBindingNamespace(other.to_owned())),
    };

    let binding_node = *ctx
        .bindings
        .get(local_part(binding_attr))
        .ok_or_else(|| Error::UnknownBinding(local_part(binding_attr).to_owned()))?;

    let (kind, soap_ns) = match address_kind {
        AddressKind::Soap(soap_ns) => {
            let mut style = Style::Document;
            let mut transport = None;

            if let Some(soap_binding) = binding_node.child_in_ns("binding", soap_ns) {
                if soap_binding.attr("style") == Some("rpc") {
                    style = Style::Rpc;
                }

                if let Some(value) = soap_binding.attr("transport") {
                    if value != ns::HTTP_TRANSPORT {
                        return Err(Error::UnsupportedTransport(value.to_owned()));
                    }
                    transport = Some(value.to_owned());
                }
            }

            (
                BindingKind::Soap(SoapBinding { style, transport }),
                Some(soap_ns),
            )
        }

        AddressKind::Http => (BindingKind::Http, None),
    };

    let name = binding_node.attr("name").ok_or(Error::MissingName("binding"))?;
    let type_attr = binding_node
        .attr("type")
        .ok_or_else(|| Error::BindingWithoutType(name.to_owned()))?;
    let port_type = *ctx
        .port_types
        .get(local_part(type_attr))
        .ok_or_else(|| Error::UnknownPortType(local_part(type_attr).to_owned()))?;

    let binding = Arc::new(Binding {
        name: name.to_owned(),
        location: location.to_owned(),
        kind,
    });

    for operation in binding_node.children_named("operation") {
        assemble_operation(ctx, schema, model, &binding, soap_ns, port_type, operation)?;
    }

    // first registration of a binding name wins
    model
        .bindings
        .get_or_insert_with(HashMap::new)
        .entry(binding.name.clone())
        .or_insert_with(|| Arc::clone(&binding));

    Ok(())
}

fn assemble_operation(
    ctx: &LoadCtx<'_>,
    schema: &SchemaSet,
    model: &mut ModelTables,
    binding: &Arc<Binding>,
    soap_ns: Option<&'static str>,
    port_type: &Element,
    operation: &Element,
) -> Result<(), Error> {
    let op_name = operation.attr("name").ok_or(Error::MissingName("operation"))?;
    let port_op = port_type
        .child_with_attr("operation", "name", op_name)
        .ok_or_else(|| Error::UnknownOperation(op_name.to_owned()))?;

    let mut kind = match (&binding.kind, soap_ns) {
        (BindingKind::Soap(soap_binding), Some(soap_ns)) => {
            let mut style = soap_binding.style;
            let mut soap_action = None;

            if let Some(soap_op) = operation.child_in_ns("operation", soap_ns) {
                if let Some(action) = soap_op.attr("soapAction") {
                    soap_action = Some(action.to_owned());
                }

                // an explicit style overrides the binding's; absence
                // leaves the binding's style standing
                match soap_op.attr("style") {
                    Some("rpc") => style = Style::Rpc,
                    Some(_) => style = Style::Document,
                    None => (),
                }
            }

            FunctionKind::Soap(SoapOperation {
                soap_action,
                style,
                input: SoapBody::default(),
                output: SoapBody::default(),
            })
        }

        _ => FunctionKind::Http,
    };

    let input = port_op.child("input");
    let mut request_name = None;
    let mut request_params = None;

    if let Some(input) = input {
        let message = input
            .attr("message")
            .ok_or_else(|| Error::OperationWithoutMessage {
                element: "input",
                operation: op_name.to_owned(),
            })?;

        request_params = Some(resolve_message(ctx, schema, message)?);
        request_name = Some(input.attr("name").unwrap_or(op_name).to_owned());

        if let (FunctionKind::Soap(soap_op), Some(soap_ns)) = (&mut kind, soap_ns) {
            if let Some(binding_input) = operation.child("input") {
                soap_op.input = soap_body(ctx, schema, binding_input, soap_ns)?;
            }
        }
    }

    let mut response_name = None;
    let mut response_params = None;

    if let Some(output) = port_op.child("output") {
        let message = output
            .attr("message")
            .ok_or_else(|| Error::OperationWithoutMessage {
                element: "output",
                operation: op_name.to_owned(),
            })?;

        response_params = Some(resolve_message(ctx, schema, message)?);
        response_name = Some(match output.attr("name") {
            Some(name) => name.to_owned(),
            None if input.is_none() => op_name.to_owned(),
            None => format!("{}Response", op_name),
        });

        if let (FunctionKind::Soap(soap_op), Some(soap_ns)) = (&mut kind, soap_ns) {
            if let Some(binding_output) = operation.child("output") {
                soap_op.output = soap_body(ctx, schema, binding_output, soap_ns)?;
            }
        }
    }

    let function = Arc::new(Function {
        name: op_name.to_owned(),
        request_name,
        response_name,
        request_params,
        response_params,
        binding: Arc::clone(binding),
        kind,
    });

    let key = function.name.to_ascii_lowercase();
    if model.functions.contains_key(&key) {
        return Err(Error::DuplicateFunction(function.name.clone()));
    }
    model.functions.insert(key, Arc::clone(&function));

    // a request name differing from the operation name gets a second,
    // lazily created lookup table; collisions there keep the first
    if let Some(request_name) = &function.request_name {
        if request_name != &function.name {
            model
                .requests
                .get_or_insert_with(HashMap::new)
                .entry(request_name.to_ascii_lowercase())
                .or_insert_with(|| Arc::clone(&function));
        }
    }

    Ok(())
}

/// Resolves a `message` reference into its ordered parameter list.
fn resolve_message(
    ctx: &LoadCtx<'_>,
    schema: &SchemaSet,
    message: &str,
) -> Result<Vec<Param>, Error> {
    let local = local_part(message);
    let node = *ctx
        .messages
        .get(local)
        .ok_or_else(|| Error::UnknownMessage(message.to_owned()))?;

    let mut params = Vec::new();

    for (order, part) in node.children_named("part").enumerate() {
        let name = part
            .attr("name")
            .ok_or_else(|| Error::PartWithoutName(local.to_owned()))?;
        let (element, encoder) = resolve_type_or_element(schema, part);

        params.push(Param {
            name: name.to_owned(),
            order,
            element,
            encoder,
        });
    }

    Ok(params)
}

/// A `type` attribute wins over `element`; resolution via `element`
/// inherits the element's own encoder. Neither being present is fine
/// at this layer.
fn resolve_type_or_element(schema: &SchemaSet, node: &Element) -> (Option<QName>, Option<Encoder>) {
    if let Some(type_attr) = node.attr("type") {
        return (None, lookup_encoder(schema, node, type_attr));
    }

    if let Some(element_attr) = node.attr("element") {
        if let Some(decl) = lookup_element(schema, node, element_attr) {
            return (Some(decl.name.clone()), decl.encoder.clone());
        }
    }

    (None, None)
}

/// Qualified-form lookup first, bare-form fallback.
fn lookup_encoder(schema: &SchemaSet, node: &Element, raw: &str) -> Option<Encoder> {
    let (prefix, local) = dom::split_name(raw);

    if let Some(namespace) = node.resolve_prefix(prefix) {
        if let Some(encoder) = schema.encoder(Some(namespace), local) {
            return Some(encoder);
        }
    }

    schema.encoder(None, raw)
}

fn lookup_element<'s>(
    schema: &'s SchemaSet,
    node: &Element,
    raw: &str,
) -> Option<&'s crate::schema::ElementDecl> {
    let (prefix, local) = dom::split_name(raw);

    if let Some(namespace) = node.resolve_prefix(prefix) {
        if let Some(decl) = schema.element(Some(namespace), local) {
            return Some(decl);
        }
    }

    schema.element(None, raw)
}

/// Reads the `<soap:body>` of a binding operation's input or output,
/// then scans its `<soap:header>` siblings whether or not a body was
/// present.
fn soap_body(
    ctx: &LoadCtx<'_>,
    schema: &SchemaSet,
    node: &Element,
    soap_ns: &str,
) -> Result<SoapBody, Error> {
    let mut body = SoapBody::default();

    if let Some(body_node) = node.child_in_ns("body", soap_ns) {
        // anything but the literal string "literal" is encoded,
        // including an absent attribute
        body.use_ = Some(if body_node.attr("use") == Some("literal") {
            Use::Literal
        } else {
            Use::Encoded
        });
        body.namespace = body_node.attr("namespace").map(ToOwned::to_owned);
        body.parts = body_node.attr("parts").map(ToOwned::to_owned);

        if body.use_ == Some(Use::Encoded) {
            body.encoding_style = Some(required_encoding_style(body_node)?);
        }
    }

    for header_node in node.children_in_ns("header", soap_ns) {
        let message_attr = header_node
            .attr("message")
            .ok_or(Error::HeaderWithoutMessage)?;
        let message = *ctx
            .messages
            .get(local_part(message_attr))
            .ok_or_else(|| Error::UnknownMessage(message_attr.to_owned()))?;

        let part_attr = header_node.attr("part").ok_or(Error::HeaderWithoutPart)?;
        let part = message
            .child_with_attr("part", "name", part_attr)
            .ok_or_else(|| Error::UnknownPart {
                part: part_attr.to_owned(),
                message: local_part(message_attr).to_owned(),
            })?;

        let (element, encoder) = resolve_type_or_element(schema, part);

        // headers default the other way around: encoded only on the
        // literal string "encoded"
        let use_ = if header_node.attr("use") == Some("encoded") {
            Use::Encoded
        } else {
            Use::Literal
        };

        let encoding_style = if use_ == Use::Encoded {
            Some(required_encoding_style(header_node)?)
        } else {
            None
        };

        let header = SoapHeader {
            name: part_attr.to_owned(),
            namespace: header_node.attr("namespace").map(ToOwned::to_owned),
            use_,
            encoding_style,
            element,
            encoder,
        };

        // a second header under the same key is dropped on the floor
        let key = QName::new(header.namespace.as_deref(), &header.name);
        body.headers.entry(key).or_insert(header);
    }

    Ok(body)
}

fn required_encoding_style(node: &Element) -> Result<String, Error> {
    match node.attr("encodingStyle") {
        None => Err(Error::UnspecifiedEncodingStyle),
        Some(value) if value == ns::SOAP11_ENC || value == ns::SOAP12_ENC => Ok(value.to_owned()),
        Some(value) => Err(Error::UnknownEncodingStyle(value.to_owned())),
    }
}
