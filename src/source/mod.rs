//! Site adapters and the registry that picks one for a URL.

use regex::Regex;
use scraper::Selector;

use crate::book::Book;
use crate::errors::*;
use crate::fetch::{Fetch, DEFAULT_USER_AGENT};
use crate::report::Report;

pub mod wattpad;

/// Collaborators handed to an adapter for one extraction.
pub struct Context<'a> {
    pub fetch: &'a dyn Fetch,
    pub report: &'a dyn Report,
}

pub trait Source {
    fn name(&self) -> &'static str;

    fn user_agent(&self) -> &'static str {
        DEFAULT_USER_AGENT
    }

    /// Fetches the story at `url` and everything it links to.
    fn extract(&self, url: &str, ctx: &Context) -> Result<Book>;
}

type Predicate = Box<dyn Fn(&str) -> bool>;

/// Ordered (predicate, adapter) pairs; the first matching predicate wins.
pub struct Registry {
    entries: Vec<(Predicate, Box<dyn Source>)>,
}

impl Registry {
    pub fn empty() -> Registry {
        Registry {
            entries: Vec::new(),
        }
    }

    pub fn register<P, S>(&mut self, predicate: P, source: S) -> &mut Registry
    where
        P: Fn(&str) -> bool + 'static,
        S: Source + 'static,
    {
        self.entries.push((Box::new(predicate), Box::new(source)));
        self
    }

    pub fn register_pattern<S: Source + 'static>(&mut self, pattern: Regex, source: S) -> &mut Registry {
        self.register(move |url: &str| pattern.is_match(url), source)
    }

    pub fn find(&self, url: &str) -> Option<&dyn Source> {
        let url = url.trim();
        self.entries
            .iter()
            .find(|(matches, _)| matches(url))
            .map(|(_, source)| source.as_ref())
    }

    pub fn extract(&self, url: &str, ctx: &Context) -> Result<Book> {
        match self.find(url) {
            Some(source) => source.extract(url.trim(), ctx),
            None => bail!(ErrorKind::UnsupportedSource(url.trim().to_string())),
        }
    }
}

impl Default for Registry {
    fn default() -> Registry {
        let mut registry = Registry::empty();
        registry.register_pattern(wattpad::url_pattern(), wattpad::Wattpad);
        registry
    }
}

/// One fetched page of a paginated chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: u32,
    pub markup: String,
}

/// Walks the pages of a chapter in order, starting at page 1, for as long as
/// the last fetched page offers a way to load more.
pub struct Pages<'a> {
    fetch: &'a dyn Fetch,
    url_for: Box<dyn Fn(u32) -> String + 'a>,
    content_css: &'a str,
    content: Selector,
    more: Selector,
    next: Option<u32>,
}

impl<'a> Pages<'a> {
    /// `content_css` selects the text of a page, `more_css` the control that
    /// announces a following page.
    pub fn new<F>(fetch: &'a dyn Fetch, url_for: F, content_css: &'a str, more_css: &str) -> Result<Pages<'a>>
    where
        F: Fn(u32) -> String + 'a,
    {
        Ok(Pages {
            fetch,
            url_for: Box::new(url_for),
            content_css,
            content: selector(content_css)?,
            more: selector(more_css)?,
            next: Some(1),
        })
    }

    fn fetch_page(&mut self, number: u32) -> Result<Page> {
        let url = (self.url_for)(number);
        let doc = self.fetch.fetch_html(&url)?;
        let markup = doc
            .select(&self.content)
            .next()
            .ok_or_else(|| ErrorKind::MissingElement(self.content_css.to_string(), url.clone()))?
            .inner_html();
        if doc.select(&self.more).next().is_some() {
            self.next = Some(number + 1);
        }
        Ok(Page { number, markup })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ErrorKind::InvalidSelector(css.to_string(), e.to_string()).into())
}

impl<'a> Iterator for Pages<'a> {
    type Item = Result<Page>;

    fn next(&mut self) -> Option<Result<Page>> {
        let number = self.next.take()?;
        Some(self.fetch_page(number))
    }
}
