use std::future::Future;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LoadError;

/// Somewhere a load document can be fetched from.
pub trait DocumentSource {
    fn describe(&self) -> String;

    fn fetch(&self) -> impl Future<Output = Result<String, LoadError>> + Send;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        debug!(file = %self.path.display(), "reading load document");
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| LoadError::io(&self.path, err))
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl DocumentSource for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        debug!(url = %self.url, "fetching load document");
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: self.url.clone(),
                status,
            });
        }
        Ok(response.text().await?)
    }
}

/// A document already held in memory.
#[derive(Debug, Clone)]
pub struct InlineSource {
    body: String,
}

impl InlineSource {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl DocumentSource for InlineSource {
    fn describe(&self) -> String {
        "<inline>".to_string()
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        Ok(self.body.clone())
    }
}

/// The source selected by a `data.location` / `--source` value.
#[derive(Debug, Clone)]
pub enum AnySource {
    File(FileSource),
    Http(HttpSource),
}

impl AnySource {
    pub fn from_location(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            AnySource::Http(HttpSource::new(trimmed))
        } else {
            AnySource::File(FileSource::new(crate::config::expand_tilde(Path::new(
                trimmed,
            ))))
        }
    }
}

impl DocumentSource for AnySource {
    fn describe(&self) -> String {
        match self {
            AnySource::File(source) => source.describe(),
            AnySource::Http(source) => source.describe(),
        }
    }

    async fn fetch(&self) -> Result<String, LoadError> {
        match self {
            AnySource::File(source) => source.fetch().await,
            AnySource::Http(source) => source.fetch().await,
        }
    }
}
