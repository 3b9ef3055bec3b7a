use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;

use log::debug;
use reqwest::blocking::{Client, Response};
use scraper::Html;
use tempfile::NamedTempFile;

use crate::errors::*;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.121 Safari/537.36";

/// Blocking access to remote pages and files.
pub trait Fetch {
    fn fetch_html(&self, url: &str) -> Result<Html>;

    /// Downloads `url` into a temporary file that is deleted on drop.
    fn download(&self, url: &str) -> Result<NamedTempFile>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<HttpFetcher> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .chain_err(|| "Could not build the HTTP client")?;
        Ok(HttpFetcher { client })
    }

    fn get(&self, url: &str, message: &str) -> Result<Response> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .send()
            .chain_err(|| format!("Unable to retrieve URL {}", url))?;
        let status = resp.status();
        if !status.is_success() {
            bail!(ErrorKind::Request(
                message.to_string(),
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown").to_string(),
                resp.url().to_string(),
            ));
        }
        Ok(resp)
    }
}

impl Fetch for HttpFetcher {
    fn fetch_html(&self, url: &str) -> Result<Html> {
        let resp = self.get(url, "Error when fetching a page")?;
        let text = resp.text()?;
        Ok(Html::parse_document(&text))
    }

    fn download(&self, url: &str) -> Result<NamedTempFile> {
        let mut resp = self.get(url, "Failed to download the image")?;
        let mut file = NamedTempFile::new()?;
        let written = resp.copy_to(&mut file)?;
        file.flush()?;
        debug!("Downloaded {} bytes from {}", written, url);
        Ok(file)
    }
}

/// Serves pages and files from memory, failing with a 404 for anything else.
#[derive(Default)]
pub struct Canned {
    pages: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl Canned {
    pub fn new() -> Canned {
        Canned::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Canned {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn file(mut self, url: &str, bytes: &[u8]) -> Canned {
        self.files.insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Every URL asked for so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    fn not_found(message: &str, url: &str) -> Error {
        ErrorKind::Request(
            message.to_string(),
            404,
            "Not Found".to_string(),
            url.to_string(),
        )
        .into()
    }
}

impl Fetch for Canned {
    fn fetch_html(&self, url: &str) -> Result<Html> {
        self.requests.borrow_mut().push(url.to_string());
        match self.pages.get(url) {
            Some(html) => Ok(Html::parse_document(html)),
            None => Err(Canned::not_found("Error when fetching a page", url)),
        }
    }

    fn download(&self, url: &str) -> Result<NamedTempFile> {
        self.requests.borrow_mut().push(url.to_string());
        let bytes = self
            .files
            .get(url)
            .ok_or_else(|| Canned::not_found("Failed to download the image", url))?;
        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn canned_serves_pages_and_files() {
        let fetch = Canned::new()
            .page("http://a/1", "<p class='x'>hello</p>")
            .file("http://a/img", b"bytes");

        let doc = fetch.fetch_html("http://a/1").unwrap();
        let sel = Selector::parse("p.x").unwrap();
        assert_eq!(doc.select(&sel).next().unwrap().inner_html(), "hello");

        let file = fetch.download("http://a/img").unwrap();
        let content = std::fs::read(file.path()).unwrap();
        assert_eq!(content, b"bytes");

        assert_eq!(fetch.requests(), vec!["http://a/1", "http://a/img"]);
    }

    #[test]
    fn missing_page_is_a_request_error() {
        let fetch = Canned::new();
        let err = fetch.fetch_html("http://nowhere").unwrap_err();
        match err.kind() {
            ErrorKind::Request(_, status, reason, url) => {
                assert_eq!(*status, 404);
                assert_eq!(reason, "Not Found");
                assert_eq!(url, "http://nowhere");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("[Status: 404 because Not Found"));
    }
}
