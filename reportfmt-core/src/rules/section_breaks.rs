use crate::docx::{Document, Paragraph};
use crate::types::{ParagraphId, SectionBreak, SectionBreakKind};

/// Every section boundary that has a paragraph after it, in body order.
/// The first section starts the document and is not a break.
pub fn enumerate_breaks(document: &Document) -> Vec<SectionBreak> {
    document
        .sections()
        .into_iter()
        .skip(1)
        .filter_map(|section| {
            section
                .first_paragraph
                .map(|(index, paragraph_id)| SectionBreak {
                    index,
                    paragraph_id,
                    kind: section.kind,
                })
        })
        .collect()
}

/// True when the paragraph at `index` opens a section that starts on a new page.
pub fn breaks_before(document: &Document, index: usize) -> bool {
    enumerate_breaks(document)
        .iter()
        .any(|b| b.index == index && b.kind.forces_new_page())
}

/// True when one of the `lookback` paragraphs before `index` is an empty
/// paragraph holding a manual page break.
pub fn page_break_before(document: &Document, index: usize, lookback: usize) -> bool {
    let paragraphs: Vec<Paragraph> = document.paragraphs().collect();
    page_break_in_window(&paragraphs, index, lookback)
}

pub fn page_break_in_window(paragraphs: &[Paragraph], index: usize, lookback: usize) -> bool {
    let end = index.min(paragraphs.len());
    let start = end.saturating_sub(lookback);
    paragraphs[start..end]
        .iter()
        .any(|p| p.text().trim().is_empty() && p.has_page_break())
}

/// Section breaks of one document snapshot, keyed by paragraph identity so
/// lookups stay valid while other paragraphs are inserted or removed.
#[derive(Debug, Clone, Default)]
pub struct SectionBreaks {
    breaks: Vec<SectionBreak>,
}

impl SectionBreaks {
    pub fn detect(document: &Document) -> Self {
        Self {
            breaks: enumerate_breaks(document),
        }
    }

    pub fn kind_before(&self, id: ParagraphId) -> Option<SectionBreakKind> {
        self.breaks
            .iter()
            .find(|b| b.paragraph_id == id)
            .map(|b| b.kind)
    }

    /// Next-page, odd-page or even-page break directly before this paragraph.
    pub fn breaks_before(&self, id: ParagraphId) -> bool {
        self.kind_before(id)
            .is_some_and(|kind| kind.forces_new_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Document {
        Document::from_document_xml(&format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        ))
        .unwrap()
    }

    fn p(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t>{text}</w:t></w:r></w:p>"#)
    }

    fn section_end(kind: &str) -> String {
        format!(r#"<w:p><w:pPr><w:sectPr><w:type w:val="{kind}"/></w:sectPr></w:pPr></w:p>"#)
    }

    const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

    #[test]
    fn breaks_anchor_on_first_paragraph_of_next_section() {
        let document = doc(&format!(
            "{}{}{}{}{}<w:sectPr><w:type w:val=\"continuous\"/></w:sectPr>",
            p("Cover"),
            section_end("nextPage"),
            p("Chapter 1: Introduction"),
            section_end("evenPage"),
            p("Appendix")
        ));
        let breaks = enumerate_breaks(&document);
        // Kinds describe how the following section starts
        assert_eq!(breaks.len(), 2);
        assert_eq!(breaks[0].index, 2);
        assert_eq!(breaks[0].kind, SectionBreakKind::EvenPage);
        assert_eq!(breaks[1].index, 4);
        assert_eq!(breaks[1].kind, SectionBreakKind::Continuous);

        assert!(breaks_before(&document, 2));
        assert!(!breaks_before(&document, 4));
        assert!(!breaks_before(&document, 0));
    }

    #[test]
    fn single_section_document_has_no_breaks() {
        let document = doc(&format!("{}{}<w:sectPr/>", p("A"), p("B")));
        assert!(enumerate_breaks(&document).is_empty());
    }

    #[test]
    fn lookup_by_id_survives_insertions() {
        let mut document = doc(&format!(
            "{}<w:p><w:pPr><w:sectPr/></w:pPr></w:p>{}{}<w:sectPr/>",
            p("Front matter"),
            p("Chapter 1"),
            p("Body")
        ));
        let breaks = SectionBreaks::detect(&document);
        let chapter = document.paragraph_ids()[2];
        document
            .insert_page_break_before(document.paragraph_ids()[0])
            .unwrap();
        assert!(breaks.breaks_before(chapter));
        assert_eq!(breaks.kind_before(chapter), Some(SectionBreakKind::NextPage));
    }

    #[test]
    fn page_break_lookback_window() {
        let document = doc(&format!(
            "{}{PAGE_BREAK}{}{}{}{}",
            p("Intro text"),
            p(""),
            p("Chapter 2"),
            p("Filler one"),
            p("Chapter 3")
        ));
        // Page break at 1, headings at 3 and 5
        assert!(page_break_before(&document, 3, 3));
        assert!(!page_break_before(&document, 5, 3));
        assert!(!page_break_before(&document, 3, 1));
        assert!(!page_break_before(&document, 0, 3));
    }

    #[test]
    fn page_break_in_text_paragraph_is_not_counted() {
        let document = doc(&format!(
            r#"<w:p><w:r><w:t>Text</w:t><w:br w:type="page"/></w:r></w:p>{}"#,
            p("Chapter 2")
        ));
        assert!(!page_break_before(&document, 1, 3));
    }
}
