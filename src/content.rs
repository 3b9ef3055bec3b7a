//! Post-processing of extracted chapter markup.

use log::debug;
use scraper::{ElementRef, Html, Node, Selector};

use crate::book::Book;
use crate::errors::*;
use crate::fetch::Fetch;
use crate::image_data::ImageData;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// A parsed piece of markup, such as the body of one chapter page.
pub struct Fragment {
    html: Html,
}

impl Fragment {
    pub fn parse(markup: &str) -> Fragment {
        Fragment {
            html: Html::parse_fragment(markup),
        }
    }

    /// Removes every element matching `selector`, returning how many matched.
    pub fn strip(&mut self, selector: &Selector) -> usize {
        let ids: Vec<_> = self.html.select(selector).map(|el| el.id()).collect();
        for id in &ids {
            if let Some(mut node) = self.html.tree.get_mut(*id) {
                node.detach();
            }
        }
        ids.len()
    }

    pub fn text(&self) -> String {
        self.html.root_element().text().collect()
    }

    /// Serializes the fragment as XHTML.
    pub fn to_markup(&self) -> String {
        // keeping every attribute as is cannot fail
        self.serialize(|_, _, _| Ok(None)).unwrap_or_default()
    }

    /// Serializes the fragment as XHTML, letting `rewrite` replace the value
    /// of any attribute. It is called with the element, the attribute name
    /// and its decoded value, in document order.
    fn serialize<F>(&self, mut rewrite: F) -> Result<String>
    where
        F: FnMut(&ElementRef, &str, &str) -> Result<Option<String>>,
    {
        let mut out = String::new();
        write_children(self.html.root_element(), &mut out, &mut rewrite)?;
        Ok(out)
    }
}

fn write_children<F>(parent: ElementRef, out: &mut String, rewrite: &mut F) -> Result<()>
where
    F: FnMut(&ElementRef, &str, &str) -> Result<Option<String>>,
{
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => push_escaped(out, text),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    write_element(el, out, rewrite)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn write_element<F>(el: ElementRef, out: &mut String, rewrite: &mut F) -> Result<()>
where
    F: FnMut(&ElementRef, &str, &str) -> Result<Option<String>>,
{
    let name = el.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in el.value().attrs() {
        if !is_xml_name(attr) {
            continue;
        }
        let value = rewrite(&el, attr, value)?.unwrap_or_else(|| value.to_string());
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        push_escaped(out, &value);
        out.push('"');
    }

    if VOID_ELEMENTS.iter().any(|void| *void == name) {
        out.push_str("/>");
        return Ok(());
    }
    out.push('>');
    write_children(el, out, rewrite)?;
    out.push_str("</");
    out.push_str(name);
    out.push('>');
    Ok(())
}

/// Escapes text for both content and attribute values. Only the predefined
/// XML entities and numeric references are emitted, and characters XML 1.0
/// cannot carry are dropped.
fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&#160;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < ' ' || c == '\u{fffe}' || c == '\u{ffff}' => {}
            c => out.push(c),
        }
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.' || c == ':')
}

/// Downloads every image referenced by `fragment`, registers it with `book`
/// and returns the XHTML markup with each `src` pointing at the local copy.
///
/// Image ids are the book's image count at the time of the download, so they
/// stay dense and follow the order of appearance. A failed download aborts
/// the whole fragment.
pub fn localize_images(fragment: &Fragment, book: &mut Book, fetch: &dyn Fetch) -> Result<String> {
    fragment.serialize(|el, attr, value| {
        if el.value().name() != "img" || attr != "src" {
            return Ok(None);
        }
        let url = resolve(value);
        let file = fetch
            .download(&url)
            .chain_err(|| format!("Could not localize image {}", url))?;

        let image = ImageData::from_temp(file, Some(book.images().len().to_string()));
        let location = image.epub_location()?;
        book.add_image(image)?;
        debug!("Localized {} as {}", url, location);
        Ok(Some(location))
    })
}

fn resolve(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{}", url)
    } else {
        url.to_string()
    }
}
