use log::debug;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::book::Book;
use crate::content::{localize_images, Fragment};
use crate::errors::*;
use crate::fetch::Fetch;
use crate::source::{Context, Pages, Source};

pub const WATTPAD_BASE: &str = "https://www.wattpad.com";

const TITLE_CSS: &str = "#story-landing header h1";
const CONTENT_CSS: &str = "#app-container main .panel-reading pre";
const LOAD_MORE_CSS: &str = "a.on-load-more-page";

lazy_static! {
    static ref STORY_ID: Selector = Selector::parse("button[data-story-id]").unwrap();
    static ref TITLE: Selector = Selector::parse(TITLE_CSS).unwrap();
    static ref AUTHOR: Selector =
        Selector::parse("#story-landing .author-info a.send-author-event").unwrap();
    static ref DESCRIPTION: Selector = Selector::parse(".panel h2.description > pre").unwrap();
    static ref STATUS: Selector = Selector::parse("#story-landing div.author-info > small").unwrap();
    static ref COVER: Selector = Selector::parse("#story-landing .cover.cover-lg > img").unwrap();
    static ref PARTS: Selector =
        Selector::parse(".story-parts .table-of-contents a.on-navigate-part").unwrap();
    static ref TAGS: Selector = Selector::parse("ul.tag-items li a").unwrap();
    static ref SPAN: Selector = Selector::parse("span").unwrap();
    static ref FIGCAPTION: Selector = Selector::parse("figcaption").unwrap();
    static ref FIGURE_SPAN: Selector = Selector::parse("figure span").unwrap();
    static ref URL_PATTERN: Regex = Regex::new(r"^(https?://)?(www\.)?wattpad\.com/.+$").unwrap();
}

pub fn url_pattern() -> Regex {
    URL_PATTERN.clone()
}

pub struct Wattpad;

impl Source for Wattpad {
    fn name(&self) -> &'static str {
        "Wattpad"
    }

    fn extract(&self, url: &str, ctx: &Context) -> Result<Book> {
        let (landing, story_id, url) = landing_page(url, ctx)?;

        let title = text_of(&landing, &TITLE).ok_or_else(|| missing(TITLE_CSS, &url))?;
        let mut book = Book::new(title);
        book.source = Some("wattpad".to_string());
        book.identifier = Some(story_id);
        book.authors = text_of(&landing, &AUTHOR).into_iter().collect();
        book.description = landing
            .select(&DESCRIPTION)
            .next()
            .map(|pre| Fragment::parse(&pre.inner_html()).to_markup().trim().to_string());
        book.status = status_of(&landing);
        book.tags = landing.select(&TAGS).map(|a| element_text(&a)).collect();

        ctx.report.info(&format!(
            "============ Downloading \"{}\" from Wattpad ============",
            book.title
        ));

        if let Some(src) = landing
            .select(&COVER)
            .next()
            .and_then(|img| img.value().attr("src"))
        {
            book.cover_from_url(&cover_url(src), ctx.fetch)?;
        }

        let parts: Vec<(String, String)> = landing
            .select(&PARTS)
            .map(|a| {
                let href = a.value().attr("href").unwrap_or_default();
                (element_text(&a), absolute(href))
            })
            .collect();

        for (i, (name, chapter_url)) in parts.iter().enumerate() {
            ctx.report.info(&format!("==> Chapter {}/{}", i + 1, parts.len()));
            let content = chapter_content(chapter_url, &mut book, ctx)?;
            book.add_chapter(name.as_str(), content);
        }

        Ok(book)
    }
}

/// Fetches the landing page, restarting once from the canonical story URL
/// when `url` points elsewhere (a chapter, for instance).
fn landing_page(url: &str, ctx: &Context) -> Result<(Html, String, String)> {
    let mut url = url.to_string();
    let mut redirected = false;
    loop {
        ctx.report.info(&format!("Downloading {} ...", url));
        let doc = ctx.fetch.fetch_html(&url)?;
        let story_id = doc
            .select(&STORY_ID)
            .next()
            .and_then(|button| button.value().attr("data-story-id"))
            .map(str::to_string)
            .ok_or_else(|| missing("button[data-story-id]", &url))?;

        if url.contains(&format!("/story/{}", story_id)) {
            return Ok((doc, story_id, url));
        }
        if redirected {
            bail!("{} does not lead to the main page of story {}", url, story_id);
        }
        ctx.report.warning("The url was not the main page of the story");
        url = format!("{}/story/{}", WATTPAD_BASE, story_id);
        redirected = true;
    }
}

/// Concatenates every page of a chapter, localizing images as pages arrive.
fn chapter_content(chapter_url: &str, book: &mut Book, ctx: &Context) -> Result<String> {
    let pages = Pages::new(
        ctx.fetch,
        |n| format!("{}/page/{}", chapter_url, n),
        CONTENT_CSS,
        LOAD_MORE_CSS,
    )?;
    let mut parts = Vec::new();
    for page in pages {
        let page = page?;
        ctx.report.info(&format!("Page {}...", page.number));
        parts.push(post_process(&page.markup, book, ctx.fetch)?);
    }
    debug!("{} has {} pages", chapter_url, parts.len());
    Ok(parts.concat())
}

fn post_process(markup: &str, book: &mut Book, fetch: &dyn Fetch) -> Result<String> {
    let mut fragment = Fragment::parse(markup);
    fragment.strip(&FIGCAPTION);
    fragment.strip(&FIGURE_SPAN);
    localize_images(&fragment, book, fetch)
}

fn status_of(doc: &Html) -> Option<String> {
    let small = doc.select(&STATUS).next()?;
    let mut fragment = Fragment::parse(&small.inner_html());
    fragment.strip(&SPAN);
    let status = fragment.text().trim().to_string();
    if status.is_empty() {
        None
    } else {
        Some(status)
    }
}

/// Thumbnail URLs look like `<base>-<size>-<key>`; ask for the 512px version.
fn cover_url(src: &str) -> String {
    let parts: Vec<&str> = src.split('-').collect();
    if parts.len() < 3 {
        return src.to_string();
    }
    format!("{}-512-{}", parts[0], parts[2..].join("-"))
}

fn absolute(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", WATTPAD_BASE, href)
    } else {
        format!("{}/{}", WATTPAD_BASE, href)
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn text_of(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel).next().map(|el| element_text(&el))
}

fn missing(selector: &str, url: &str) -> Error {
    ErrorKind::MissingElement(selector.to_string(), url.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Canned;
    use crate::image_data::fixtures::{JPEG, PNG};
    use crate::report::{Level, Recorder};

    const STORY: &str = "https://www.wattpad.com/story/42-my-story";

    fn landing() -> String {
        r#"<html><body>
        <button data-story-id="42">Read</button>
        <div id="story-landing">
          <header><h1> My Story </h1></header>
          <div class="cover cover-lg"><img src="https://img.wattpad.com/cover/42-256-k99.jpg"></div>
          <div class="author-info">
            <a class="send-author-event" href="/user/jane"> Jane Doe </a>
            <small><span class="icon"></span> Ongoing <span>2 parts</span></small>
          </div>
        </div>
        <div class="panel"><h2 class="description"><pre>A tale
of <b>two</b>&nbsp;parts.<br></pre></h2></div>
        <div class="story-parts"><ul class="table-of-contents">
          <li><a class="on-navigate-part" href="/100-the-start"> The Start </a></li>
          <li><a class="on-navigate-part" href="/101-the-end">The End</a></li>
        </ul></div>
        <ul class="tag-items"><li><a>fantasy</a></li><li><a> magic </a></li></ul>
        </body></html>"#
            .to_string()
    }

    fn chapter_page(content: &str, more: bool) -> String {
        format!(
            r#"<html><body><div id="app-container"><main>
            <div class="panel-reading"><pre>{}</pre></div>
            {}
            </main></div></body></html>"#,
            content,
            if more {
                r##"<a class="on-load-more-page" href="#">Continue</a>"##
            } else {
                ""
            }
        )
    }

    fn site() -> Canned {
        Canned::new()
            .page(STORY, &landing())
            .file("https://img.wattpad.com/cover/42-512-k99.jpg", JPEG)
            .page(
                "https://www.wattpad.com/100-the-start/page/1",
                &chapter_page("<p>Once</p>", true),
            )
            .page(
                "https://www.wattpad.com/100-the-start/page/2",
                &chapter_page(
                    "<p>upon</p><figure><img src=\"https://img.wattpad.com/p/1.png\">\
                     <span>overlay</span><figcaption>Art</figcaption></figure>",
                    true,
                ),
            )
            .page(
                "https://www.wattpad.com/100-the-start/page/3",
                &chapter_page("<p>a time</p>", false),
            )
            .page(
                "https://www.wattpad.com/101-the-end/page/1",
                &chapter_page("<p>The end.</p>", false),
            )
            .file("https://img.wattpad.com/p/1.png", PNG)
    }

    #[test]
    fn extracts_metadata() {
        let fetch = site();
        let report = Recorder::new(false);
        let ctx = Context {
            fetch: &fetch,
            report: &report,
        };

        let book = Wattpad.extract(STORY, &ctx).unwrap();

        assert_eq!(book.title, "My Story");
        assert_eq!(book.identifier.as_deref(), Some("42"));
        assert_eq!(book.source.as_deref(), Some("wattpad"));
        assert_eq!(book.authors, vec!["Jane Doe"]);
        assert_eq!(book.status.as_deref(), Some("Ongoing"));
        assert_eq!(book.tags, vec!["fantasy", "magic"]);
        assert_eq!(
            book.description.as_deref(),
            Some("A tale\nof <b>two</b>&#160;parts.<br/>")
        );
        assert_eq!(book.epub_name(), "my-story-wattpad-42.epub");

        let cover = book.cover().unwrap();
        assert_eq!(cover.uid(), "cover");
        assert_eq!(cover.read().unwrap(), JPEG);
    }

    #[test]
    fn chapters_concatenate_pages_in_order() {
        let fetch = site();
        let report = Recorder::new(false);
        let ctx = Context {
            fetch: &fetch,
            report: &report,
        };

        let book = Wattpad.extract(STORY, &ctx).unwrap();

        let chapters = book.chapters();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].title, "The Start");
        assert_eq!(
            chapters[0].content,
            "<p>Once</p><p>upon</p><figure><img src=\"images/0.png\"/></figure><p>a time</p>"
        );
        assert_eq!(chapters[1].title, "The End");
        assert_eq!(chapters[1].content, "<p>The end.</p>");

        assert_eq!(book.images().len(), 1);
        assert_eq!(book.images()[0].read().unwrap(), PNG);

        let pages: Vec<String> = fetch
            .requests()
            .into_iter()
            .filter(|url| url.contains("/page/"))
            .collect();
        assert_eq!(
            pages,
            vec![
                "https://www.wattpad.com/100-the-start/page/1",
                "https://www.wattpad.com/100-the-start/page/2",
                "https://www.wattpad.com/100-the-start/page/3",
                "https://www.wattpad.com/101-the-end/page/1",
            ]
        );
    }

    #[test]
    fn chapter_links_restart_from_story_page() {
        let chapter_link = "https://www.wattpad.com/100-the-start";
        let fetch = site()
            .page(chapter_link, &landing())
            .page("https://www.wattpad.com/story/42", &landing());
        let report = Recorder::new(false);
        let ctx = Context {
            fetch: &fetch,
            report: &report,
        };

        let book = Wattpad.extract(chapter_link, &ctx).unwrap();

        assert_eq!(book.title, "My Story");
        assert_eq!(
            &fetch.requests()[..2],
            &[
                chapter_link.to_string(),
                "https://www.wattpad.com/story/42".to_string()
            ]
        );
        assert_eq!(report.count(Level::Warning), 1);
    }

    #[test]
    fn failed_page_aborts_extraction() {
        let fetch = Canned::new()
            .page(STORY, &landing())
            .file("https://img.wattpad.com/cover/42-512-k99.jpg", JPEG);
        let report = Recorder::new(false);
        let ctx = Context {
            fetch: &fetch,
            report: &report,
        };

        match Wattpad.extract(STORY, &ctx) {
            Err(e) => match e.kind() {
                ErrorKind::Request(_, status, _, url) => {
                    assert_eq!(*status, 404);
                    assert_eq!(url, "https://www.wattpad.com/100-the-start/page/1");
                }
                other => panic!("unexpected error {:?}", other),
            },
            Ok(_) => panic!("extraction should fail"),
        }
    }

    #[test]
    fn missing_story_id_is_reported() {
        let fetch = Canned::new().page(STORY, "<html><body><h1>Oops</h1></body></html>");
        let report = Recorder::new(false);
        let ctx = Context {
            fetch: &fetch,
            report: &report,
        };

        match Wattpad.extract(STORY, &ctx).map(|b| b.title) {
            Err(e) => match e.kind() {
                ErrorKind::MissingElement(css, _) => assert_eq!(css, "button[data-story-id]"),
                other => panic!("unexpected error {:?}", other),
            },
            Ok(title) => panic!("unexpected book {}", title),
        }
    }

    #[test]
    fn cover_url_asks_for_large_size() {
        assert_eq!(
            cover_url("https://img.wattpad.com/cover/42-256-k99.jpg"),
            "https://img.wattpad.com/cover/42-512-k99.jpg"
        );
        assert_eq!(cover_url("https://img.test/plain.jpg"), "https://img.test/plain.jpg");
    }

    #[test]
    fn relative_links_are_resolved() {
        assert_eq!(absolute("/100-x"), "https://www.wattpad.com/100-x");
        assert_eq!(absolute("100-x"), "https://www.wattpad.com/100-x");
        assert_eq!(absolute("https://a.test/b"), "https://a.test/b");
    }
}
