// DOCX adapter
//
// Everything that touches WordprocessingML markup lives here:
// - package.rs: zip container, part lookup, content digests
// - xml.rs: owned XML tree parsed and written with quick-xml
// - paragraph.rs: read/write views over a single w:p
// - document.rs: body blocks with stable ids, sections, tables

pub mod document;
pub mod package;
pub mod paragraph;
pub mod xml;

pub use document::{Document, SectionInfo};
pub use package::{content_digest, DocxPackage, DOCUMENT_PART};
pub use paragraph::{page_break_paragraph, Paragraph, ParagraphMut, Spacing};
pub use xml::{XmlDocument, XmlElement, XmlNode};
