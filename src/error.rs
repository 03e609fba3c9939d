use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to parse provided URL")]
    UrlParse(#[from] url::ParseError),

    #[error("Unable to convert provided path")]
    PathConversion(Option<std::io::Error>),

    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Couldn't load document from '{uri}'")]
    DocumentLoad {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't fetch document from '{uri}'")]
    DocumentFetch {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Error parsing XML input")]
    Xml(#[from] quick_xml::Error),

    #[error("Document has no root element")]
    EmptyDocument,

    #[error("Couldn't find <definitions> in '{0}'")]
    MissingDefinitions(String),

    #[error("<{0}> hasn't a name attribute")]
    UnnamedDeclaration(&'static str),

    #[error("<{kind}> '{name}' already defined")]
    DuplicateDeclaration { kind: &'static str, name: String },

    #[error("No binding associated with <port>")]
    PortWithoutBinding,

    #[error("No address associated with <port>")]
    PortWithoutAddress,

    #[error("No location associated with <port>")]
    AddressWithoutLocation,

    #[error("Unknown binding type for <port> address")]
    UnknownBindingType,

    #[error("Unsupported binding namespace '{0}'")]
    UnsupportedBindingNamespace(String),

    #[error("Unsupported transport '{0}'")]
    UnsupportedTransport(String),

    #[error("Missing 'name' attribute for <{0}>")]
    MissingName(&'static str),

    #[error("Missing 'type' attribute for <binding> '{0}'")]
    BindingWithoutType(String),

    #[error("No <binding> element with name '{0}'")]
    UnknownBinding(String),

    #[error("Missing <portType> with name '{0}'")]
    UnknownPortType(String),

    #[error("Missing <portType> operation with name '{0}'")]
    UnknownOperation(String),

    #[error("Missing 'message' attribute for <{element}> of '{operation}'")]
    OperationWithoutMessage {
        element: &'static str,
        operation: String,
    },

    #[error("Missing <message> with name '{0}'")]
    UnknownMessage(String),

    #[error("No name associated with <part> of message '{0}'")]
    PartWithoutName(String),

    #[error("Missing 'message' attribute for <header>")]
    HeaderWithoutMessage,

    #[error("Missing 'part' attribute for <header>")]
    HeaderWithoutPart,

    #[error("Missing part '{part}' in message '{message}'")]
    UnknownPart { part: String, message: String },

    #[error("Unknown encodingStyle '{0}'")]
    UnknownEncodingStyle(String),

    #[error("Unspecified encodingStyle")]
    UnspecifiedEncodingStyle,

    #[error("Function '{0}' already defined")]
    DuplicateFunction(String),

    #[error("Couldn't bind to service")]
    NoServices,
}
