//! Zipped COLLADA archives (`.zae`)
//!
//! A `.zae` file is a ZIP archive holding one or more COLLADA documents
//! plus a `manifest.xml` whose `<dae_root>` names the document to load.
//! Inside a load session, documents of an archive are addressed as paths
//! below the archive's own URI (`file:///models/car.zae/scene.dae`), so
//! references between them resolve like ordinary relative URIs.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Read, Seek};
use std::path::Path;
use url::Url;
use zip::ZipArchive;

/// Manifest path within the archive
pub const MANIFEST_PATH: &str = "manifest.xml";

/// Whether a path names a `.zae` archive
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zae"))
}

/// An opened `.zae` archive
pub struct Archive<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl<R: Read + Seek> Archive<R> {
    /// Open an archive from a reader
    pub fn open(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        tracing::debug!(entries = archive.len(), "opened archive");
        Ok(Self { archive })
    }

    /// Entry name of the root document
    ///
    /// Taken from the manifest's `<dae_root>`. Archives without a manifest
    /// are accepted if they hold exactly one `.dae` entry.
    pub fn root_document(&mut self) -> Result<String> {
        if self.has_entry(MANIFEST_PATH) {
            let manifest = self.read_to_string(MANIFEST_PATH)?;
            return parse_manifest(&manifest);
        }

        let mut documents = self
            .entry_names()
            .into_iter()
            .filter(|name| name.to_ascii_lowercase().ends_with(".dae"));
        match (documents.next(), documents.next()) {
            (Some(only), None) => Ok(only),
            (None, _) => Err(Error::MissingFile(
                "archive holds no manifest and no .dae document".to_string(),
            )),
            (Some(_), Some(_)) => Err(Error::MissingFile(
                "archive holds no manifest and several .dae documents".to_string(),
            )),
        }
    }

    /// Raw content of an entry
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::MissingFile(name.to_string()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        Ok(content)
    }

    fn read_to_string(&mut self, name: &str) -> Result<String> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| Error::MissingFile(name.to_string()))?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Check if an entry exists
    pub fn has_entry(&mut self, name: &str) -> bool {
        self.archive.by_name(name).is_ok()
    }

    /// All entry names
    pub fn entry_names(&mut self) -> Vec<String> {
        (0..self.archive.len())
            .filter_map(|i| self.archive.by_index(i).ok().map(|f| f.name().to_string()))
            .collect()
    }

    /// Content of the entry a document URI below `base` points at
    pub fn read_document(&mut self, base: &Url, uri: &Url) -> Option<Result<Vec<u8>>> {
        let name = entry_name(base, uri)?;
        tracing::debug!(entry = %name, "reading archive entry");
        Some(self.read(&name))
    }
}

/// URI of the archive as a directory, for resolving entry names
pub fn archive_base(archive_uri: &Url) -> Result<Url> {
    Ok(Url::parse(&format!("{}/", archive_uri.as_str().trim_end_matches('/')))?)
}

/// Entry name of a document URI below `base`, if it is one
pub fn entry_name(base: &Url, uri: &Url) -> Option<String> {
    let mut document = uri.clone();
    document.set_fragment(None);
    let relative = document.as_str().strip_prefix(base.as_str())?;
    match urlencoding::decode(relative) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(relative.to_string()),
    }
}

/// `<dae_root>` of a manifest
fn parse_manifest(manifest: &str) -> Result<String> {
    let mut reader = Reader::from_str(manifest);
    reader.config_mut().trim_text(true);
    let mut in_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                in_root = e.local_name().as_ref() == b"dae_root";
            }
            Ok(Event::Text(ref t)) if in_root => {
                let text = t
                    .decode()
                    .map_err(|e| Error::InvalidXml(format!("manifest: {}", e)))?;
                let root = text.trim();
                let root = root.strip_prefix("./").unwrap_or(root);
                let root = root.strip_prefix('/').unwrap_or(root);
                if root.is_empty() {
                    break;
                }
                return Ok(match urlencoding::decode(root) {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => root.to_string(),
                });
            }
            Ok(Event::End(_)) => in_root = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::InvalidXml(format!("manifest: {}", e))),
            _ => {}
        }
    }

    Err(Error::MissingFile(
        "manifest names no <dae_root> document".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn build(entries: &[(&str, &str)]) -> Cursor<Vec<u8>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn test_manifest_names_root() {
        let manifest = r#"<?xml version="1.0"?><dae_root>./models/scene%20one.dae</dae_root>"#;
        assert_eq!(parse_manifest(manifest).unwrap(), "models/scene one.dae");
        assert!(parse_manifest("<dae_root/>").is_err());
    }

    #[test]
    fn test_root_without_manifest() {
        let mut archive = Archive::open(build(&[("a.dae", "<COLLADA/>"), ("tex.png", "")])).unwrap();
        assert_eq!(archive.root_document().unwrap(), "a.dae");

        let mut ambiguous =
            Archive::open(build(&[("a.dae", "<COLLADA/>"), ("b.dae", "<COLLADA/>")])).unwrap();
        assert!(ambiguous.root_document().is_err());
    }

    #[test]
    fn test_entry_name_below_base() {
        let base = archive_base(&Url::parse("file:///m/car.zae").unwrap()).unwrap();
        let uri = base.join("parts/wheel%20a.dae#hub").unwrap();
        assert_eq!(entry_name(&base, &uri).as_deref(), Some("parts/wheel a.dae"));
        let outside = Url::parse("file:///m/other.dae").unwrap();
        assert_eq!(entry_name(&base, &outside), None);
    }

    #[test]
    fn test_is_archive_path() {
        assert!(is_archive_path(Path::new("scene.ZAE")));
        assert!(!is_archive_path(Path::new("scene.dae")));
    }
}
