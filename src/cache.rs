//! Process-wide URI-keyed model cache.
//!
//! Each URI holds its own slot, so at most one build per URI is in
//! flight at a time: later callers for the same URI block on the slot
//! until the first build lands, while builds for different URIs run
//! independently. A failed build publishes nothing and the next caller
//! retries.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use url::Url;

use crate::{error::Error, fetch::Fetch, parser, types::SdlModel};

type Slot = Arc<Mutex<Option<Arc<SdlModel>>>>;

static MODELS: LazyLock<Mutex<HashMap<Url, Slot>>> = LazyLock::new(Default::default);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn get_or_build(url: &Url, fetcher: &dyn Fetch) -> Result<Arc<SdlModel>, Error> {
    let slot = lock(&MODELS).entry(url.clone()).or_default().clone();

    let mut slot = lock(&slot);
    if let Some(model) = slot.as_ref() {
        debug!(%url, "serving cached service description");
        return Ok(model.clone());
    }

    let model = Arc::new(parser::load(fetcher, url.clone())?);
    *slot = Some(model.clone());
    Ok(model)
}

/// Drops the cached model for `url`; the next call rebuilds it.
pub fn invalidate(url: &Url) {
    lock(&MODELS).remove(url);
}

pub fn clear() {
    lock(&MODELS).clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetch;

    struct OneDocument(&'static str);

    impl Fetch for OneDocument {
        fn fetch(&self, _url: &Url) -> Result<Vec<u8>, Error> {
            Ok(self.0.as_bytes().to_vec())
        }
    }

    const WSDL: &str = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
            xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
            xmlns:tns="urn:cache" targetNamespace="urn:cache">
          <message name="PingRequest"/>
          <portType name="PingPortType">
            <operation name="Ping"><input message="tns:PingRequest"/></operation>
          </portType>
          <binding name="PingBinding" type="tns:PingPortType">
            <operation name="Ping"><input/></operation>
          </binding>
          <service name="PingService">
            <port name="PingPort" binding="tns:PingBinding">
              <soap:address location="http://example.org/ping"/>
            </port>
          </service>
        </definitions>"#;

    #[test]
    fn same_uri_returns_the_identical_model() {
        let url = Url::parse("http://cache.test/identical.wsdl").unwrap();
        let fetcher = OneDocument(WSDL);

        let first = get_or_build(&url, &fetcher).unwrap();
        let second = get_or_build(&url, &fetcher).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn invalidation_forces_a_rebuild() {
        let url = Url::parse("http://cache.test/invalidate.wsdl").unwrap();
        let fetcher = OneDocument(WSDL);

        let first = get_or_build(&url, &fetcher).unwrap();
        invalidate(&url);
        let second = get_or_build(&url, &fetcher).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failed_builds_are_not_cached() {
        struct Failing;

        impl Fetch for Failing {
            fn fetch(&self, url: &Url) -> Result<Vec<u8>, Error> {
                Err(Error::UnsupportedScheme(url.scheme().to_owned()))
            }
        }

        let url = Url::parse("http://cache.test/failing.wsdl").unwrap();
        assert!(get_or_build(&url, &Failing).is_err());

        // the slot is still empty, so a working fetcher succeeds
        let model = get_or_build(&url, &OneDocument(WSDL)).unwrap();
        assert_eq!(model.functions().count(), 1);
    }
}
