//! Document retrieval, behind a trait so builds can run against
//! anything that maps URIs to bytes.

use url::Url;

use crate::error::Error;

pub trait Fetch {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, Error>;
}

/// Reads `file` URLs from the filesystem and `http`/`https` URLs over a
/// blocking HTTP client. Any other scheme is rejected.
#[derive(Debug, Default)]
pub struct DefaultFetcher;

impl Fetch for DefaultFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, Error> {
        match url.scheme() {
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|()| Error::PathConversion(None))?;

                std::fs::read(&path).map_err(|source| Error::DocumentLoad {
                    uri: url.to_string(),
                    source,
                })
            }

            "http" | "https" => {
                let response =
                    reqwest::blocking::get(url.clone()).map_err(|source| Error::DocumentFetch {
                        uri: url.to_string(),
                        source,
                    })?;

                let bytes = response.bytes().map_err(|source| Error::DocumentFetch {
                    uri: url.to_string(),
                    source,
                })?;

                Ok(bytes.to_vec())
            }

            other => Err(Error::UnsupportedScheme(other.into())),
        }
    }
}
