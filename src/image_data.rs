use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::errors::*;

/// Enough header bytes for every format `image` can sniff.
const HEADER_LEN: usize = 32;

#[derive(Debug)]
enum Backing {
    Path(PathBuf),
    Temp(NamedTempFile),
}

/// An image stored on the local disk, addressed inside the book by its uid.
#[derive(Debug)]
pub struct ImageData {
    backing: Backing,
    uid: String,
}

impl ImageData {
    pub fn from_path<P: Into<PathBuf>>(path: P, uid: Option<String>) -> ImageData {
        ImageData {
            backing: Backing::Path(path.into()),
            uid: uid.unwrap_or_else(random_uid),
        }
    }

    /// Takes ownership of a downloaded file; it is removed when this value drops.
    pub fn from_temp(file: NamedTempFile, uid: Option<String>) -> ImageData {
        ImageData {
            backing: Backing::Temp(file),
            uid: uid.unwrap_or_else(random_uid),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn path(&self) -> &Path {
        match self.backing {
            Backing::Path(ref path) => path,
            Backing::Temp(ref file) => file.path(),
        }
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        std::fs::read(self.path())
            .chain_err(|| format!("Unable to read image {}", self.path().display()))
    }

    pub fn format(&self) -> Result<ImageFormat> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        File::open(self.path())
            .and_then(|f| f.take(HEADER_LEN as u64).read_to_end(&mut header))
            .chain_err(|| format!("Unable to read image {}", self.path().display()))?;
        image::guess_format(&header).map_err(|_| {
            ErrorKind::UnknownImageFormat(self.path().display().to_string()).into()
        })
    }

    pub fn extension(&self) -> Result<&'static str> {
        let format = self.format()?;
        format
            .extensions_str()
            .first()
            .copied()
            .ok_or_else(|| ErrorKind::UnknownImageFormat(self.path().display().to_string()).into())
    }

    pub fn mime(&self) -> Result<&'static str> {
        Ok(self.format()?.to_mime_type())
    }

    /// Path of the image inside the book, `images/<uid>.<ext>`.
    pub fn epub_location(&self) -> Result<String> {
        Ok(format!("images/{}.{}", self.uid, self.extension()?))
    }
}

fn random_uid() -> String {
    Uuid::new_v4().simple().to_string()
}


#[cfg(test)]
mod tests {
    use super::fixtures::{JPEG, PNG};
    use super::*;
    use std::io::Write;

    fn temp_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn extension_comes_from_content_not_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picture.gif");
        std::fs::write(&path, PNG).unwrap();

        let img = ImageData::from_path(&path, Some("7".to_string()));
        assert_eq!(img.extension().unwrap(), "png");
        assert_eq!(img.mime().unwrap(), "image/png");
        assert_eq!(img.epub_location().unwrap(), "images/7.png");
    }

    #[test]
    fn jpeg_location() {
        let img = ImageData::from_temp(temp_with(JPEG), Some("cover".to_string()));
        assert_eq!(img.epub_location().unwrap(), "images/cover.jpg");
        assert_eq!(img.read().unwrap(), JPEG);
    }

    #[test]
    fn random_uids_differ() {
        let a = ImageData::from_temp(temp_with(PNG), None);
        let b = ImageData::from_temp(temp_with(PNG), None);
        assert_ne!(a.uid(), b.uid());
        assert!(a.epub_location().unwrap().starts_with("images/"));
    }

    #[test]
    fn temp_file_removed_on_drop() {
        let img = ImageData::from_temp(temp_with(PNG), Some("0".to_string()));
        let path = img.path().to_path_buf();
        assert!(path.exists());
        drop(img);
        assert!(!path.exists());
    }

    #[test]
    fn missing_file_fails_to_read() {
        let img = ImageData::from_path("/definitely/not/here.png", None);
        assert!(img.read().is_err());
        assert!(img.epub_location().is_err());
    }

    #[test]
    fn unknown_content_is_rejected() {
        let img = ImageData::from_temp(temp_with(b"plain text, not an image"), None);
        match img.format().unwrap_err().kind() {
            ErrorKind::UnknownImageFormat(_) => {}
            other => panic!("unexpected error {:?}", other),
        }
    }
}
