use crate::date::Date;

pub const FRONT_PAGE_FILENAME: &str = "index_frontpage.xhtml";

/// One item of the reading order, ready to hand to the EPUB writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub title: String,
    pub filename: String,
    pub body: String,
}

impl Entry {
    /// Wraps the body into a standalone XHTML document.
    pub fn to_xhtml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
<meta charset="UTF-8"/>
<title>{title}</title>
</head>
<body>
{body}
</body>
</html>
"#,
            title = escape(&self.title),
            body = self.body
        )
    }
}

#[derive(Debug, Clone)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    filename: Option<String>,
}

impl Chapter {
    pub fn new<T: Into<String>, C: Into<String>>(title: T, content: C) -> Chapter {
        Chapter {
            title: title.into(),
            content: content.into(),
            filename: None,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Names the chapter after its 1-based position in the reading order.
    pub fn assign_filename(&mut self, index: usize) {
        self.filename = Some(format!("chapter_{}.xhtml", index));
    }

    /// `None` until a file name has been assigned.
    pub fn to_entry(&self) -> Option<Entry> {
        let filename = self.filename.clone()?;
        Some(Entry {
            title: self.title.clone(),
            filename,
            body: format!("<h2>{}</h2>\n{}", escape(&self.title), self.content),
        })
    }
}

/// Introductory page built from the book's metadata.
#[derive(Debug, Clone)]
pub struct FrontPage {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub authors: Vec<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub date: Date,
}

impl FrontPage {
    pub fn to_entry(&self) -> Entry {
        let mut items = Vec::new();
        if !self.tags.is_empty() {
            items.push(("Tags", self.tags.join(", ")));
        }
        if !self.authors.is_empty() {
            items.push(("Author", self.authors.join(", ")));
        }
        if let Some(ref source) = self.source {
            items.push(("From", source.clone()));
        }
        if let Some(ref status) = self.status {
            items.push(("Status", status.clone()));
        }
        items.push(("Date", self.date.to_string()));

        let items: String = items
            .iter()
            .map(|(label, value)| format!("<li><strong>{}:</strong> {}</li>\n", label, escape(value)))
            .collect();

        // the description is markup already, only line breaks are kept
        let description = self.description.replace('\n', "<br/>");

        Entry {
            title: self.title.clone(),
            filename: FRONT_PAGE_FILENAME.to_string(),
            body: format!(
                "<h1>{title}</h1>\n<p style=\"font-style:italic;\">\n{description}\n</p>\n<ul>\n{items}</ul>",
                title = escape(&self.title),
                description = description,
                items = items
            ),
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
