use std::path::PathBuf;
use thiserror::Error;

use crate::types::ParagraphId;

/// Errors raised while reading, editing or writing a .docx package.
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid .docx package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("package is missing required part '{0}'")]
    MissingPart(String),

    #[error("document.xml has no <{0}> element")]
    MissingElement(&'static str),

    #[error("unbalanced XML: {0}")]
    Unbalanced(String),

    #[error("attribute {attribute}=\"{value}\" on <{element}> is not a valid number")]
    InvalidNumber {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("paragraph {0} is not part of the document")]
    UnknownParagraph(ParagraphId),

    #[error("document was built from bare XML and has no package to save")]
    NoPackage,
}

/// Input validation errors detected before any stage runs.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{} is not a .docx file", .0.display())]
    WrongExtension(PathBuf),
}
