use crate::error::DocxError;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main document part of a WordprocessingML package.
pub const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

/// All entries of a .docx zip, held in memory in their original order.
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    entries: Vec<PackageEntry>,
}

impl DocxPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let is_dir = file.is_dir();
            let mut data = Vec::new();
            if !is_dir {
                file.read_to_end(&mut data)?;
            }
            entries.push(PackageEntry { name, data, is_dir });
        }

        log::debug!("Loaded package with {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Builds a package from (part name, content) pairs, in the given order.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: Into<String>,
    {
        let entries = parts
            .into_iter()
            .map(|(name, data)| PackageEntry {
                name: name.into(),
                data,
                is_dir: false,
            })
            .collect();
        Self { entries }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name.as_str())
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| !e.is_dir && e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Part content as text, without a leading byte-order mark.
    pub fn part_str(&self, name: &str) -> Result<String, DocxError> {
        let data = self
            .part(name)
            .ok_or_else(|| DocxError::MissingPart(name.to_string()))?;
        let text = String::from_utf8_lossy(data);
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        self.to_bytes_with(&[])
    }

    /// Writes the package, substituting the content of the named parts.
    pub fn to_bytes_with(&self, replacements: &[(&str, &[u8])]) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            let data = replacements
                .iter()
                .find(|(name, _)| *name == entry.name)
                .map(|(_, data)| *data)
                .unwrap_or(entry.data.as_slice());
            writer.start_file(entry.name.as_str(), options)?;
            writer.write_all(data)?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// SHA-256 hex digest, used to tell whether a stage changed a part.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_package() -> DocxPackage {
        DocxPackage::from_parts(vec![
            ("[Content_Types].xml", b"<Types/>".to_vec()),
            ("word/document.xml", "\u{feff}<w:document/>".as_bytes().to_vec()),
            ("word/media/image1.png", vec![0x89, 0x50, 0x4e, 0x47, 0x00, 0xff]),
        ])
    }

    #[test]
    fn zip_round_trip_keeps_order_and_bytes() {
        let bytes = sample_package().to_bytes().unwrap();
        let package = DocxPackage::from_bytes(&bytes).unwrap();

        let names: Vec<&str> = package.part_names().collect();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "word/document.xml", "word/media/image1.png"]
        );
        assert_eq!(
            package.part("word/media/image1.png").unwrap(),
            &[0x89, 0x50, 0x4e, 0x47, 0x00, 0xff]
        );
    }

    #[test]
    fn replacement_only_touches_named_part() {
        let original = sample_package();
        let bytes = original
            .to_bytes_with(&[(DOCUMENT_PART, b"<w:document><w:body/></w:document>")])
            .unwrap();
        let package = DocxPackage::from_bytes(&bytes).unwrap();

        assert_eq!(
            package.part_str(DOCUMENT_PART).unwrap(),
            "<w:document><w:body/></w:document>"
        );
        assert_eq!(package.part("[Content_Types].xml").unwrap(), b"<Types/>");
    }

    #[test]
    fn part_str_strips_bom_and_reports_missing_parts() {
        let package = sample_package();
        assert_eq!(package.part_str(DOCUMENT_PART).unwrap(), "<w:document/>");
        assert!(matches!(
            package.part_str("word/styles.xml"),
            Err(DocxError::MissingPart(_))
        ));
    }

    #[test]
    fn garbage_bytes_are_not_a_package() {
        let err = DocxPackage::from_bytes(b"definitely not a zip file").unwrap_err();
        assert!(matches!(err, DocxError::Zip(_)));
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        assert_eq!(content_digest(b"abc"), content_digest(b"abc"));
        assert_ne!(content_digest(b"abc"), content_digest(b"abd"));
        assert_eq!(content_digest(b"abc").len(), 64);
    }
}
