use super::package::{content_digest, DocxPackage, DOCUMENT_PART};
use super::paragraph::{page_break_paragraph, Paragraph, ParagraphMut};
use super::xml::{XmlDocument, XmlElement, XmlNode};
use crate::error::DocxError;
use crate::types::{ParagraphId, SectionBreakKind};
use std::path::Path;
use uuid::Uuid;

/// A top-level child of `w:body` with a stable identity.
#[derive(Debug, Clone)]
struct BodyBlock {
    id: ParagraphId,
    node: XmlNode,
}

impl BodyBlock {
    fn new(node: XmlNode) -> Self {
        Self {
            id: Uuid::new_v4(),
            node,
        }
    }

    fn paragraph(&self) -> Option<&XmlElement> {
        self.node.as_element().filter(|e| e.is("w:p"))
    }
}

/// One section of the document, in body order.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionInfo {
    /// How this section starts (`w:type` of its own section properties)
    pub kind: SectionBreakKind,
    /// Index and id of the first top-level paragraph inside the section
    pub first_paragraph: Option<(usize, ParagraphId)>,
}

/// An editable .docx document.
///
/// The body is held as a flat list of blocks, each with a UUID assigned at
/// load time, so passes can remove and insert paragraphs by identity rather
/// than by shifting indices. Everything outside `document.xml` is kept
/// byte-for-byte and written back unchanged.
#[derive(Debug, Clone)]
pub struct Document {
    package: Option<DocxPackage>,
    /// `document.xml` with the body's children moved into `blocks`
    xml: XmlDocument,
    blocks: Vec<BodyBlock>,
}

impl Document {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocxError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        let package = DocxPackage::from_bytes(bytes)?;
        let xml = package.part_str(DOCUMENT_PART)?;
        let mut document = Self::from_document_xml(&xml)?;
        document.package = Some(package);
        Ok(document)
    }

    /// Builds a document from `document.xml` alone. Such a document can be
    /// edited and serialized to XML but not saved as a package.
    pub fn from_document_xml(xml: &str) -> Result<Self, DocxError> {
        let mut xml = XmlDocument::parse(xml)?;
        let body = xml
            .root
            .child_mut("w:body")
            .ok_or(DocxError::MissingElement("w:body"))?;
        let blocks = std::mem::take(&mut body.children)
            .into_iter()
            .map(BodyBlock::new)
            .collect();

        Ok(Self {
            package: None,
            xml,
            blocks,
        })
    }

    pub fn to_document_xml(&self) -> Result<String, DocxError> {
        let mut xml = self.xml.clone();
        let body = xml
            .root
            .child_mut("w:body")
            .ok_or(DocxError::MissingElement("w:body"))?;
        body.children = self.blocks.iter().map(|b| b.node.clone()).collect();
        xml.to_xml()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let package = self.package.as_ref().ok_or(DocxError::NoPackage)?;
        let xml = self.to_document_xml()?;
        package.to_bytes_with(&[(DOCUMENT_PART, xml.as_bytes())])
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocxError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// SHA-256 of the serialized `document.xml`.
    pub fn content_digest(&self) -> Result<String, DocxError> {
        Ok(content_digest(self.to_document_xml()?.as_bytes()))
    }

    // ===== PARAGRAPH ACCESS =====

    pub fn paragraphs(&self) -> impl Iterator<Item = Paragraph<'_>> {
        self.blocks
            .iter()
            .filter_map(|block| block.paragraph().map(|p| Paragraph::new(block.id, p)))
    }

    /// Snapshot of paragraph ids in document order.
    pub fn paragraph_ids(&self) -> Vec<ParagraphId> {
        self.paragraphs().map(|p| p.id()).collect()
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    pub fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs().map(|p| p.text()).collect()
    }

    pub fn paragraph(&self, id: ParagraphId) -> Result<Paragraph<'_>, DocxError> {
        self.blocks
            .iter()
            .find(|block| block.id == id)
            .and_then(|block| block.paragraph().map(|p| Paragraph::new(block.id, p)))
            .ok_or(DocxError::UnknownParagraph(id))
    }

    pub fn paragraph_at(&self, index: usize) -> Option<Paragraph<'_>> {
        self.paragraphs().nth(index)
    }

    pub fn paragraph_mut(&mut self, id: ParagraphId) -> Result<ParagraphMut<'_>, DocxError> {
        self.blocks
            .iter_mut()
            .find(|block| block.id == id)
            .and_then(|block| block.node.as_element_mut())
            .filter(|element| element.is("w:p"))
            .map(ParagraphMut::new)
            .ok_or(DocxError::UnknownParagraph(id))
    }

    /// Position of the paragraph among top-level paragraphs.
    pub fn index_of(&self, id: ParagraphId) -> Option<usize> {
        self.paragraphs().position(|p| p.id() == id)
    }

    // ===== STRUCTURE =====

    pub fn remove_paragraph(&mut self, id: ParagraphId) -> Result<(), DocxError> {
        let position = self.block_position(id)?;
        self.blocks.remove(position);
        Ok(())
    }

    /// Inserts `paragraph` directly before `id`, returning the new paragraph's id.
    pub fn insert_paragraph_before(
        &mut self,
        id: ParagraphId,
        paragraph: XmlElement,
    ) -> Result<ParagraphId, DocxError> {
        let position = self.block_position(id)?;
        let block = BodyBlock::new(XmlNode::Element(paragraph));
        let new_id = block.id;
        self.blocks.insert(position, block);
        Ok(new_id)
    }

    pub fn insert_page_break_before(&mut self, id: ParagraphId) -> Result<ParagraphId, DocxError> {
        self.insert_paragraph_before(id, page_break_paragraph())
    }

    fn block_position(&self, id: ParagraphId) -> Result<usize, DocxError> {
        self.blocks
            .iter()
            .position(|block| block.id == id && block.paragraph().is_some())
            .ok_or(DocxError::UnknownParagraph(id))
    }

    // ===== SECTIONS AND TABLES =====

    /// Sections in body order. Each paragraph-level `w:sectPr` closes a
    /// section; the body-level one closes the last.
    pub fn sections(&self) -> Vec<SectionInfo> {
        let mut sections = Vec::new();
        let mut first_paragraph = None;
        let mut paragraph_index = 0;
        let mut closed_by_body = false;

        for block in &self.blocks {
            let Some(element) = block.node.as_element() else {
                continue;
            };
            if element.is("w:p") {
                if first_paragraph.is_none() {
                    first_paragraph = Some((paragraph_index, block.id));
                }
                if let Some(sect) = Paragraph::new(block.id, element).section_properties() {
                    sections.push(SectionInfo {
                        kind: section_kind(sect),
                        first_paragraph: first_paragraph.take(),
                    });
                }
                paragraph_index += 1;
            } else if element.is("w:sectPr") {
                sections.push(SectionInfo {
                    kind: section_kind(element),
                    first_paragraph: first_paragraph.take(),
                });
                closed_by_body = true;
            }
        }

        // Trailing paragraphs with no closing properties use the defaults
        if !closed_by_body && first_paragraph.is_some() {
            sections.push(SectionInfo {
                kind: SectionBreakKind::NextPage,
                first_paragraph,
            });
        }

        sections
    }

    /// Every `w:sectPr`, paragraph-level and body-level.
    pub fn section_properties_mut(&mut self) -> Vec<&mut XmlElement> {
        let mut found = Vec::new();
        for block in &mut self.blocks {
            let Some(element) = block.node.as_element_mut() else {
                continue;
            };
            if element.is("w:sectPr") {
                found.push(element);
            } else if element.is("w:p") {
                if let Some(sect) = element
                    .child_mut("w:pPr")
                    .and_then(|ppr| ppr.child_mut("w:sectPr"))
                {
                    found.push(sect);
                }
            }
        }
        found
    }

    /// Top-level tables.
    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.blocks
            .iter_mut()
            .filter_map(|block| block.node.as_element_mut())
            .filter(|element| element.is("w:tbl"))
    }

    pub fn table_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| block.node.as_element().is_some_and(|e| e.is("w:tbl")))
            .count()
    }
}

fn section_kind(sect: &XmlElement) -> SectionBreakKind {
    SectionBreakKind::from_ooxml(sect.child("w:type").and_then(|t| t.attr("w:val")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#;

    fn doc(body: &str) -> Document {
        Document::from_document_xml(&format!(
            r#"<w:document {NS}><w:body>{body}</w:body></w:document>"#
        ))
        .unwrap()
    }

    fn p(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    #[test]
    fn tables_are_not_paragraphs() {
        let document = doc(&format!(
            "{}<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>{}<w:sectPr/>",
            p("Before"),
            p("Cell"),
            p("After")
        ));
        assert_eq!(document.paragraph_texts(), vec!["Before", "After"]);
        assert_eq!(document.table_count(), 1);
    }

    #[test]
    fn insert_and_remove_by_id() {
        let mut document = doc(&format!("{}{}<w:sectPr/>", p("One"), p("Two")));
        let ids = document.paragraph_ids();

        let inserted = document.insert_page_break_before(ids[1]).unwrap();
        assert_eq!(document.paragraph_count(), 3);
        assert_eq!(document.index_of(inserted), Some(1));
        assert!(document.paragraph(inserted).unwrap().is_page_break_only());

        document.remove_paragraph(ids[0]).unwrap();
        assert_eq!(document.paragraph_texts(), vec!["", "Two"]);
        assert!(matches!(
            document.remove_paragraph(ids[0]),
            Err(DocxError::UnknownParagraph(_))
        ));
    }

    #[test]
    fn serialized_body_keeps_order_and_final_section() {
        let mut document = doc(&format!(
            "{}{}<w:sectPr><w:pgSz w:w=\"11906\"/></w:sectPr>",
            p("A"),
            p("B")
        ));
        let ids = document.paragraph_ids();
        document.insert_page_break_before(ids[1]).unwrap();

        let xml = document.to_document_xml().unwrap();
        let a = xml.find(">A<").unwrap();
        let br = xml.find("w:type=\"page\"").unwrap();
        let b = xml.find(">B<").unwrap();
        let sect = xml.find("<w:sectPr>").unwrap();
        assert!(a < br && br < b && b < sect);
    }

    #[test]
    fn sections_follow_properties_carriers() {
        let document = doc(&format!(
            "{}{}<w:p><w:pPr><w:sectPr><w:type w:val=\"continuous\"/></w:sectPr></w:pPr></w:p>{}<w:p><w:pPr><w:sectPr/></w:pPr></w:p>{}<w:sectPr><w:type w:val=\"oddPage\"/></w:sectPr>",
            p("Title"),
            p("Certificate"),
            p("Chapter 1: Introduction"),
            p("Chapter 2: Background"),
        ));
        let sections = document.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].kind, SectionBreakKind::Continuous);
        assert_eq!(sections[0].first_paragraph.map(|(i, _)| i), Some(0));
        // Absent w:type means next page
        assert_eq!(sections[1].kind, SectionBreakKind::NextPage);
        assert_eq!(sections[1].first_paragraph.map(|(i, _)| i), Some(3));
        assert_eq!(sections[2].kind, SectionBreakKind::OddPage);
        assert_eq!(sections[2].first_paragraph.map(|(i, _)| i), Some(5));
    }

    #[test]
    fn section_properties_are_all_reachable() {
        let mut document = doc(&format!(
            "{}<w:p><w:pPr><w:sectPr/></w:pPr></w:p>{}<w:sectPr/>",
            p("A"),
            p("B")
        ));
        assert_eq!(document.section_properties_mut().len(), 2);
    }

    #[test]
    fn document_without_body_is_rejected() {
        let err = Document::from_document_xml(&format!("<w:document {NS}/>")).unwrap_err();
        assert!(matches!(err, DocxError::MissingElement("w:body")));
    }

    #[test]
    fn bare_xml_document_cannot_be_saved() {
        let document = doc(&p("Only"));
        assert!(matches!(document.to_bytes(), Err(DocxError::NoPackage)));
    }
}
