//! Namespace URIs recognized by the loader.

pub const WSDL: &str = "http://schemas.xmlsoap.org/wsdl/";

pub const WSDL_SOAP11: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const WSDL_SOAP12: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";
pub const RPC_SOAP12: &str = "http://www.w3.org/2003/05/soap-rpc";
pub const WSDL_HTTP11: &str = "http://schemas.xmlsoap.org/wsdl/http/";
pub const WSDL_HTTP12: &str = "http://www.w3.org/2003/05/http";

/// The only transport a `<soap:binding>` may name.
pub const HTTP_TRANSPORT: &str = "http://schemas.xmlsoap.org/soap/http";

pub const SOAP11_ENC: &str = "http://schemas.xmlsoap.org/soap/encoding/";
pub const SOAP12_ENC: &str = "http://www.w3.org/2003/05/soap-encoding";

pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";
