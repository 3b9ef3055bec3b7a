use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use epub_builder::{EpubBuilder, EpubContent, EpubVersion, MetadataOpfV3, ReferenceType, ZipLibrary};
use log::{debug, info};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::chapter::{escape, Chapter, Entry, FrontPage};
use crate::date::Date;
use crate::errors::*;
use crate::fetch::Fetch;
use crate::image_data::ImageData;
use crate::report::Report;

pub const COVER_UID: &str = "cover";

/// What to do when the destination file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    Prompt,
    Overwrite,
    Skip,
}

impl FromStr for OnConflict {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<OnConflict, String> {
        match s.to_lowercase().as_str() {
            "prompt" => Ok(OnConflict::Prompt),
            "overwrite" => Ok(OnConflict::Overwrite),
            "skip" => Ok(OnConflict::Skip),
            other => Err(format!("unknown conflict policy '{}'", other)),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Written(PathBuf),
    Skipped(PathBuf),
    /// No destination was given; the packaged book is returned as is.
    Buffer(Vec<u8>),
}

#[derive(Debug)]
pub struct Book {
    pub title: String,
    pub identifier: Option<String>,
    pub authors: Vec<String>,
    pub source: Option<String>,
    pub language: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub date: Date,
    pub tags: Vec<String>,
    cover: Option<ImageData>,
    images: Vec<ImageData>,
    chapters: Vec<Chapter>,
}

impl Book {
    pub fn new<T: Into<String>>(title: T) -> Book {
        Book {
            title: title.into(),
            identifier: None,
            authors: Vec::new(),
            source: None,
            language: "en".to_string(),
            description: None,
            status: None,
            date: Date::today(),
            tags: Vec::new(),
            cover: None,
            images: Vec::new(),
            chapters: Vec::new(),
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn images(&self) -> &[ImageData] {
        &self.images
    }

    pub fn cover(&self) -> Option<&ImageData> {
        self.cover.as_ref()
    }

    pub fn add_chapter<T: Into<String>, C: Into<String>>(&mut self, title: T, content: C) {
        self.chapters.push(Chapter::new(title, content));
    }

    fn uid_taken(&self, uid: &str) -> bool {
        self.cover.as_ref().map_or(false, |c| c.uid() == uid)
            || self.images.iter().any(|img| img.uid() == uid)
    }

    /// Appends an inline image. Ids must be unique across the cover and images.
    pub fn add_image(&mut self, image: ImageData) -> Result<()> {
        if self.uid_taken(image.uid()) {
            bail!(ErrorKind::DuplicateImage(image.uid().to_string()));
        }
        self.images.push(image);
        Ok(())
    }

    pub fn set_cover(&mut self, image: ImageData) -> Result<()> {
        if self.images.iter().any(|img| img.uid() == image.uid()) {
            bail!(ErrorKind::DuplicateImage(image.uid().to_string()));
        }
        self.cover = Some(image);
        Ok(())
    }

    pub fn cover_from_url(&mut self, url: &str, fetch: &dyn Fetch) -> Result<()> {
        let file = fetch
            .download(url)
            .chain_err(|| format!("Could not download the cover {}", url))?;
        self.set_cover(ImageData::from_temp(file, Some(COVER_UID.to_string())))
    }

    /// Default output file name, e.g. `my-story-wattpad-42.epub`.
    pub fn epub_name(&self) -> String {
        let title = self.title.replace(|c: char| c == '\'' || c == '\u{2019}', "");
        let mut parts: Vec<&str> = title.split_whitespace().collect();
        if let Some(ref source) = self.source {
            parts.push(source.as_str());
        }
        if let Some(ref identifier) = self.identifier {
            parts.push(identifier.as_str());
        }
        let name: String = parts
            .join("-")
            .to_lowercase()
            .chars()
            .filter(|&c| !c.is_ascii() || c.is_ascii_alphanumeric() || c == '-' || c == '_')
            .collect();
        format!("{}.epub", name)
    }

    /// Identifier of the package: explicit or hashed from the title,
    /// prefixed by the source label when there is one.
    pub fn package_id(&self) -> String {
        let identifier = self
            .identifier
            .clone()
            .unwrap_or_else(|| title_id(&self.title));
        match self.source {
            Some(ref source) => format!("{}-{}", source, identifier),
            None => identifier,
        }
    }

    pub fn front_page(&self) -> Option<FrontPage> {
        let description = self.description.as_ref()?;
        Some(FrontPage {
            title: self.title.clone(),
            description: description.clone(),
            tags: self.tags.clone(),
            authors: self.authors.clone(),
            source: self.source.clone(),
            status: self.status.clone(),
            date: self.date.clone(),
        })
    }

    /// Names the chapters in reading order and lists every content entry,
    /// front page first.
    pub fn entries(&mut self) -> Vec<Entry> {
        for (i, chapter) in self.chapters.iter_mut().enumerate() {
            chapter.assign_filename(i + 1);
        }
        let mut entries = Vec::with_capacity(self.chapters.len() + 1);
        if let Some(page) = self.front_page() {
            entries.push(page.to_entry());
        }
        entries.extend(self.chapters.iter().filter_map(Chapter::to_entry));
        entries
    }

    pub fn assemble(&mut self) -> Result<EpubBuilder<ZipLibrary>> {
        let mut epub = EpubBuilder::new(ZipLibrary::new()?)?;
        epub.epub_version(EpubVersion::V30);

        let id = self.package_id();
        epub.set_uuid(Uuid::new_v5(&Uuid::NAMESPACE_URL, id.as_bytes()));
        epub.set_title(self.title.as_str());
        epub.set_lang(self.language.as_str());
        for author in &self.authors {
            epub.add_author(author.as_str());
        }
        if let Some(ref source) = self.source {
            epub.add_metadata_opf(Box::new(MetadataOpfV3::new(
                "dcterms:publisher".to_string(),
                escape(source),
            )));
        }
        debug!("Package {} by {:?}", id, self.authors);

        if let Some(ref description) = self.description {
            if !description.is_empty() {
                epub.add_description(description.as_str());
            }
        }
        for tag in &self.tags {
            epub.metadata("subject", tag.as_str())?;
        }

        if let Some(ref cover) = self.cover {
            let bytes = cover.read().chain_err(|| "Could not read the cover image")?;
            epub.add_cover_image(cover.epub_location()?, Cursor::new(bytes), cover.mime()?)?;
        }

        for image in &self.images {
            let location = image.epub_location()?;
            epub.add_resource(location.as_str(), Cursor::new(image.read()?), image.mime()?)?;
            debug!("Added resource {}", location);
        }

        epub.inline_toc();

        let mut entries = self.entries().into_iter();
        if self.description.is_some() {
            if let Some(front) = entries.next() {
                epub.add_content(
                    EpubContent::new(front.filename.as_str(), front.to_xhtml().as_bytes())
                        .title(front.title.as_str())
                        .reftype(ReferenceType::TitlePage),
                )?;
            }
        }
        for entry in entries {
            epub.add_content(
                EpubContent::new(entry.filename.as_str(), entry.to_xhtml().as_bytes())
                    .title(entry.title.as_str())
                    .reftype(ReferenceType::Text),
            )?;
        }

        Ok(epub)
    }

    /// Packages the book. With a destination, writes it there unless the
    /// file exists and `policy` says otherwise.
    pub fn to_epub(
        &mut self,
        dest: Option<&Path>,
        policy: OnConflict,
        report: &dyn Report,
    ) -> Result<Outcome> {
        if let Some(dest) = dest {
            if dest.exists() && !may_overwrite(dest, policy, report) {
                report.warning(&format!(
                    "The epub file was not written because {} already exists",
                    dest.display()
                ));
                return Ok(Outcome::Skipped(dest.to_path_buf()));
            }
        }

        let mut epub = self.assemble()?;
        let mut buffer = Vec::new();
        epub.generate(&mut buffer)?;
        info!("Generated {} bytes for '{}'", buffer.len(), self.title);

        let dest = match dest {
            Some(dest) => dest,
            None => return Ok(Outcome::Buffer(buffer)),
        };

        write_atomically(dest, &buffer)
            .chain_err(|| format!("Could not write {}", dest.display()))?;
        report.success(&format!(
            "The file {} has been successfully written",
            dest.display()
        ));
        Ok(Outcome::Written(dest.to_path_buf()))
    }
}

fn may_overwrite(dest: &Path, policy: OnConflict, report: &dyn Report) -> bool {
    match policy {
        OnConflict::Overwrite => true,
        OnConflict::Skip => false,
        OnConflict::Prompt => report.confirm(
            &format!("The file {} already exists. Overwrite?", dest.display()),
            false,
        ),
    }
}

/// Writes next to `dest` first so a failure never leaves a truncated book.
fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

/// Name-based UUID of the title, identical across runs and toolchains.
fn title_id(title: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, title.as_bytes())
        .simple()
        .to_string()
}
