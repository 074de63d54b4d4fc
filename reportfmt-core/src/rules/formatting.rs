use super::engine::{DocumentRule, StageReport};
use crate::classifier::ContentClassifier;
use crate::config::{PageLayout, StyleConfig};
use crate::docx::{Document, ParagraphMut, XmlElement};
use crate::types::{ParagraphId, RoleTag};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

const TWIPS_PER_INCH: f32 = 1440.0;
/// Header and footer distance written when a section has none.
const DEFAULT_HEADER_FOOTER_TWIPS: &str = "720";

/// Child order of `w:sectPr` (CT_SectPr).
const SECTPR_ORDER: &[&str] = &[
    "w:headerReference",
    "w:footerReference",
    "w:footnotePr",
    "w:endnotePr",
    "w:type",
    "w:pgSz",
    "w:pgMar",
    "w:paperSrc",
    "w:pgBorders",
    "w:lnNumType",
    "w:pgNumType",
    "w:cols",
    "w:formProt",
    "w:vAlign",
    "w:noEndnote",
    "w:titlePg",
    "w:textDirection",
    "w:bidi",
    "w:rtlGutter",
    "w:docGrid",
    "w:printerSettings",
    "w:sectPrChange",
];

/// Child order of `w:tblPr` (CT_TblPr).
const TBLPR_ORDER: &[&str] = &[
    "w:tblStyle",
    "w:tblpPr",
    "w:tblOverlap",
    "w:bidiVisual",
    "w:tblStyleRowBandSize",
    "w:tblStyleColBandSize",
    "w:tblW",
    "w:jc",
    "w:tblCellSpacing",
    "w:tblInd",
    "w:tblBorders",
    "w:shd",
    "w:tblLayout",
    "w:tblCellMar",
    "w:tblLook",
    "w:tblCaption",
    "w:tblDescription",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct FormattingReport {
    /// Paragraphs styled per role
    pub styled: BTreeMap<RoleTag, usize>,
    pub sections_updated: usize,
    pub tables_formatted: usize,
}

impl FormattingReport {
    pub fn paragraphs_styled(&self) -> usize {
        self.styled.values().sum()
    }

    pub fn print_summary(&self) {
        println!("🎨 Formatting applied:");
        for (role, count) in &self.styled {
            println!("   {:.<45} {}", role.description(), count);
        }
        println!("   - Sections with page layout: {}", self.sections_updated);
        println!("   - Tables formatted: {}", self.tables_formatted);
    }
}

/// Applies the report template's fonts, sizes, alignment and line spacing by
/// role, plus page geometry and table layout. Paragraph spacing is left to
/// the normalizer.
pub struct StyleFormatter<'a> {
    classifier: &'a ContentClassifier,
    styles: &'a StyleConfig,
}

impl<'a> StyleFormatter<'a> {
    pub fn new(classifier: &'a ContentClassifier, styles: &'a StyleConfig) -> Self {
        Self { classifier, styles }
    }

    pub fn format(&self, document: &mut Document) -> FormattingReport {
        let mut report = FormattingReport::default();

        let plan: Vec<(ParagraphId, RoleTag)> = document
            .paragraphs()
            .map(|p| (p.id(), self.classifier.classify(&p.text())))
            .filter(|(_, role)| *role != RoleTag::Empty)
            .collect();

        for (id, role) in plan {
            let Some(style) = self.styles.roles.get(&role) else {
                continue;
            };
            let Ok(mut paragraph) = document.paragraph_mut(id) else {
                continue;
            };
            // Never strip bold from body text
            paragraph.set_run_format(
                Some(self.styles.font_family.as_str()),
                Some(style.font_size),
                style.bold.then_some(true),
            );
            paragraph.set_alignment(style.alignment.as_ooxml());
            paragraph.set_line_spacing(self.styles.line_spacing);
            *report.styled.entry(role).or_insert(0) += 1;
        }

        for section in document.section_properties_mut() {
            apply_page_layout(section, &self.styles.page);
            report.sections_updated += 1;
        }

        for table in document.tables_mut() {
            self.format_table(table);
            report.tables_formatted += 1;
        }

        log::debug!(
            "Styled {} paragraphs, {} sections, {} tables",
            report.paragraphs_styled(),
            report.sections_updated,
            report.tables_formatted
        );
        report
    }

    fn format_table(&self, table: &mut XmlElement) {
        let tables = &self.styles.tables;
        if tables.center {
            table
                .ensure_leading_child("w:tblPr")
                .ensure_child("w:jc", TBLPR_ORDER)
                .set_attr("w:val", "center");
        }

        let font = self.styles.font_family.as_str();
        let center = tables.center;
        let size = tables.font_size;
        table.visit_mut(&mut |element: &mut XmlElement| {
            if element.is("w:p") {
                let mut paragraph = ParagraphMut::new(element);
                paragraph.set_run_format(Some(font), Some(size), None);
                if center {
                    paragraph.set_alignment("center");
                }
            }
        });
    }
}

fn inches_to_twips(inches: f32) -> String {
    ((inches * TWIPS_PER_INCH).round() as i64).to_string()
}

fn apply_page_layout(section: &mut XmlElement, page: &PageLayout) {
    let size = section.ensure_child("w:pgSz", SECTPR_ORDER);
    let landscape = size.attr("w:orient") == Some("landscape");
    let (width, height) = if landscape {
        (page.page_height, page.page_width)
    } else {
        (page.page_width, page.page_height)
    };
    size.set_attr("w:w", inches_to_twips(width));
    size.set_attr("w:h", inches_to_twips(height));

    let margins = section.ensure_child("w:pgMar", SECTPR_ORDER);
    margins.set_attr("w:top", inches_to_twips(page.top));
    margins.set_attr("w:bottom", inches_to_twips(page.bottom));
    margins.set_attr("w:left", inches_to_twips(page.left));
    margins.set_attr("w:right", inches_to_twips(page.right));
    // Required by the schema
    for key in ["w:header", "w:footer"] {
        if margins.attr(key).is_none() {
            margins.set_attr(key, DEFAULT_HEADER_FOOTER_TWIPS);
        }
    }
    if margins.attr("w:gutter").is_none() {
        margins.set_attr("w:gutter", "0");
    }
}

impl DocumentRule for StyleFormatter<'_> {
    fn apply(&self, document: &mut Document) -> Result<StageReport> {
        Ok(StageReport::Format(self.format(document)))
    }

    fn name(&self) -> &str {
        "Format"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassificationConfig;

    fn doc(body: &str) -> Document {
        Document::from_document_xml(&format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        ))
        .unwrap()
    }

    fn p(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    fn format(document: &mut Document) -> FormattingReport {
        let classifier = ContentClassifier::new(&ClassificationConfig::default()).unwrap();
        let styles = StyleConfig::default();
        StyleFormatter::new(&classifier, &styles).format(document)
    }

    #[test]
    fn headings_and_body_get_their_role_styles() {
        let mut document = doc(&format!(
            "{}{}{}<w:sectPr/>",
            p("Chapter 1: Introduction"),
            p("An ordinary body paragraph."),
            p("")
        ));
        let report = format(&mut document);

        assert_eq!(report.styled[&RoleTag::ChapterHeading], 1);
        assert_eq!(report.styled[&RoleTag::Paragraph], 1);
        assert_eq!(report.paragraphs_styled(), 2);

        let xml = document.to_document_xml().unwrap();
        assert!(xml.contains(r#"<w:sz w:val="32"/>"#));
        assert!(xml.contains(r#"<w:sz w:val="24"/>"#));
        assert!(xml.contains(r#"<w:jc w:val="both"/>"#));
        assert!(xml.contains(r#"w:ascii="Times New Roman""#));

        let heading = document.paragraph_at(0).unwrap();
        assert_eq!(heading.alignment(), Some("left"));
        assert_eq!(heading.line_spacing().unwrap(), Some(1.5));
        assert_eq!(document.paragraph_at(2).unwrap().alignment(), None);
    }

    #[test]
    fn body_bold_is_kept() {
        let mut document = doc(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Important body sentence.</w:t></w:r></w:p><w:sectPr/>"#,
        );
        format(&mut document);
        let xml = document.to_document_xml().unwrap();
        assert!(xml.contains("<w:b/>"));
    }

    #[test]
    fn sections_get_a4_geometry_and_margins() {
        let mut document = doc(&format!(
            r#"{}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/></w:sectPr>"#,
            p("Text")
        ));
        let report = format(&mut document);
        assert_eq!(report.sections_updated, 1);

        let xml = document.to_document_xml().unwrap();
        assert!(xml.contains(r#"w:w="11909""#));
        assert!(xml.contains(r#"w:h="16834""#));
        assert!(xml.contains(r#"w:left="1800""#));
        assert!(xml.contains(r#"w:header="708""#));
    }

    #[test]
    fn landscape_sections_keep_orientation() {
        let mut document = doc(&format!(
            r#"{}<w:sectPr><w:pgSz w:w="15840" w:h="12240" w:orient="landscape"/></w:sectPr>"#,
            p("Wide table page")
        ));
        format(&mut document);
        let xml = document.to_document_xml().unwrap();
        assert!(xml.contains(r#"w:w="16834""#));
        assert!(xml.contains(r#"w:h="11909""#));
        // pgMar created after pgSz
        assert!(xml.find("w:pgSz").unwrap() < xml.find("w:pgMar").unwrap());
    }

    #[test]
    fn tables_are_centered_with_table_font() {
        let mut document = doc(&format!(
            r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tr><w:tc>{}</w:tc></w:tr></w:tbl><w:sectPr/>"#,
            p("Cell value")
        ));
        let report = format(&mut document);
        assert_eq!(report.tables_formatted, 1);

        let xml = document.to_document_xml().unwrap();
        let tbl_w = xml.find("w:tblW").unwrap();
        let jc = xml.find(r#"<w:jc w:val="center"/>"#).unwrap();
        assert!(tbl_w < jc);
        assert!(xml.contains(r#"<w:sz w:val="24"/>"#));
    }
}
