//! WSDL loader and resolved service description model.
//!
//! Builds an in-memory service description (the "SDL") from a WSDL
//! document and everything it imports: operations merged with their
//! SOAP or HTTP bindings into a callable function table, message parts
//! resolved to marshalling descriptors, and the whole thing published
//! into a process-wide cache keyed by URI. Envelope encoding and
//! transport live elsewhere and consume the model this crate produces.

use std::{path::Path, sync::Arc};

use url::Url;

pub mod cache;
mod dom;
pub mod error;
pub mod fetch;
pub mod ns;
mod parser;
pub mod schema;
pub mod types;

pub use error::Error;
pub use types::SdlModel;

/// Returns the service description for `uri`, building it on first
/// sight and serving the shared cached model after that.
pub fn get_or_build_model<S: AsRef<str>>(uri: S) -> Result<Arc<SdlModel>, Error> {
    let url = normalize_url(uri.as_ref())?;
    cache::get_or_build(&url, &fetch::DefaultFetcher)
}

/// Runs one uncached build with the default fetcher.
pub fn load<S: AsRef<str>>(uri: S) -> Result<SdlModel, Error> {
    let url = normalize_url(uri.as_ref())?;
    parser::load(&fetch::DefaultFetcher, url)
}

/// Runs one uncached build against a caller-supplied fetcher.
pub fn load_with(fetcher: &dyn fetch::Fetch, url: Url) -> Result<SdlModel, Error> {
    parser::load(fetcher, url)
}

fn normalize_url(uri: &str) -> Result<Url, Error> {
    match Url::parse(uri) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = Path::new(uri)
                .canonicalize()
                .map_err(|err| Error::PathConversion(Some(err)))?;

            Url::from_file_path(&path).map_err(|()| Error::PathConversion(None))
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const WSDL: &str = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
            xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
            xmlns:xsd="http://www.w3.org/2001/XMLSchema"
            xmlns:tns="urn:files" targetNamespace="urn:files">
          <import location="common.wsdl"/>
          <portType name="FilePortType">
            <operation name="Stat"><input message="tns:StatIn"/></operation>
          </portType>
          <binding name="FileBinding" type="tns:FilePortType">
            <operation name="Stat"><input/></operation>
          </binding>
          <service name="FileService">
            <port name="FilePort" binding="tns:FileBinding">
              <soap:address location="http://example.org/files"/>
            </port>
          </service>
        </definitions>"#;

    const COMMON: &str = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
            xmlns:xsd="http://www.w3.org/2001/XMLSchema"
            xmlns:tns="urn:common" targetNamespace="urn:common">
          <message name="StatIn">
            <part name="path" type="xsd:string"/>
          </message>
        </definitions>"#;

    #[test]
    fn loads_files_and_resolves_relative_imports() {
        let dir = tempfile::tempdir().unwrap();

        let service = dir.path().join("service.wsdl");
        write!(std::fs::File::create(&service).unwrap(), "{}", WSDL).unwrap();
        write!(
            std::fs::File::create(dir.path().join("common.wsdl")).unwrap(),
            "{}",
            COMMON
        )
        .unwrap();

        // a bare filesystem path normalizes to a file URL
        let model = load(service.to_str().unwrap()).unwrap();

        assert_eq!(model.target_namespace(), Some("urn:files"));
        assert_eq!(model.source().scheme(), "file");

        let stat = model.function("stat").unwrap();
        let params = stat.request_params.as_ref().unwrap();
        assert_eq!(params[0].name, "path");
    }

    #[test]
    fn rejects_unsupported_schemes() {
        assert!(matches!(
            load("ftp://example.org/service.wsdl"),
            Err(Error::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }
}
