use super::xml::{XmlElement, XmlNode};
use crate::error::DocxError;
use crate::types::ParagraphId;

/// Child order of `w:pPr` (CT_PPr). Word rejects out-of-order properties.
pub const PPR_ORDER: &[&str] = &[
    "w:pStyle",
    "w:keepNext",
    "w:keepLines",
    "w:pageBreakBefore",
    "w:framePr",
    "w:widowControl",
    "w:numPr",
    "w:suppressLineNumbers",
    "w:pBdr",
    "w:shd",
    "w:tabs",
    "w:suppressAutoHyphens",
    "w:kinsoku",
    "w:wordWrap",
    "w:overflowPunct",
    "w:topLinePunct",
    "w:autoSpaceDE",
    "w:autoSpaceDN",
    "w:bidi",
    "w:adjustRightInd",
    "w:snapToGrid",
    "w:spacing",
    "w:ind",
    "w:contextualSpacing",
    "w:mirrorIndents",
    "w:suppressOverlap",
    "w:jc",
    "w:textDirection",
    "w:textAlignment",
    "w:textboxTightWrap",
    "w:outlineLvl",
    "w:divId",
    "w:cnfStyle",
    "w:rPr",
    "w:sectPr",
    "w:pPrChange",
];

/// Child order of `w:rPr` (CT_RPr).
pub const RPR_ORDER: &[&str] = &[
    "w:rStyle",
    "w:rFonts",
    "w:b",
    "w:bCs",
    "w:i",
    "w:iCs",
    "w:caps",
    "w:smallCaps",
    "w:strike",
    "w:dstrike",
    "w:outline",
    "w:shadow",
    "w:emboss",
    "w:imprint",
    "w:noProof",
    "w:snapToGrid",
    "w:vanish",
    "w:webHidden",
    "w:color",
    "w:spacing",
    "w:w",
    "w:kern",
    "w:position",
    "w:sz",
    "w:szCs",
    "w:highlight",
    "w:u",
    "w:effect",
    "w:bdr",
    "w:shd",
    "w:fitText",
    "w:vertAlign",
    "w:rtl",
    "w:cs",
    "w:em",
    "w:lang",
    "w:eastAsianLayout",
    "w:specVanish",
    "w:oMath",
];

/// Elements whose presence makes an otherwise empty paragraph meaningful.
const EMBEDDED_OBJECTS: &[&str] = &[
    "w:drawing",
    "w:pict",
    "w:object",
    "mc:AlternateContent",
    "m:oMath",
    "m:oMathPara",
];

const TWIPS_PER_POINT: f32 = 20.0;
const LINE_UNITS_PER_LINE: f32 = 240.0;

/// Spacing as stored on the paragraph; `None` means not set directly.
///
/// `before_overridden` and `after_overridden` record a `w:*Lines` value or
/// an active `w:*Autospacing` flag. Word renders those instead of
/// `w:before`/`w:after`, so the stored points are not what the reader sees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Spacing {
    pub before: Option<f32>,
    pub after: Option<f32>,
    pub before_overridden: bool,
    pub after_overridden: bool,
}

impl Spacing {
    pub fn before_or_zero(&self) -> f32 {
        self.before.unwrap_or(0.0)
    }

    pub fn after_or_zero(&self) -> f32 {
        self.after.unwrap_or(0.0)
    }
}

/// Read-only view of a top-level `w:p`.
#[derive(Debug, Clone, Copy)]
pub struct Paragraph<'a> {
    id: ParagraphId,
    element: &'a XmlElement,
}

impl<'a> Paragraph<'a> {
    pub fn new(id: ParagraphId, element: &'a XmlElement) -> Self {
        Self { id, element }
    }

    pub fn id(&self) -> ParagraphId {
        self.id
    }

    pub fn element(&self) -> &'a XmlElement {
        self.element
    }

    fn properties(&self) -> Option<&'a XmlElement> {
        self.element.child("w:pPr")
    }

    /// Concatenated run text. Tabs and soft line breaks become `\t` and `\n`.
    pub fn text(&self) -> String {
        let mut text = String::new();
        collect_text(self.element, &mut text);
        text
    }

    /// Empty text with nothing structural inside: safe to delete.
    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
            && !self.has_page_break()
            && self.section_properties().is_none()
            && !self.has_embedded_objects()
    }

    /// Contains a `w:br w:type="page"` in any run.
    pub fn has_page_break(&self) -> bool {
        self.element.elements().any(|child| {
            !child.is("w:pPr")
                && child.any_descendant(&|e: &XmlElement| {
                    e.is("w:br") && e.attr("w:type") == Some("page")
                })
        })
    }

    /// Exists only to carry a manual page break.
    pub fn is_page_break_only(&self) -> bool {
        self.has_page_break()
            && self.text().trim().is_empty()
            && self.section_properties().is_none()
            && !self.has_embedded_objects()
    }

    /// `w:pageBreakBefore` set directly on the paragraph.
    pub fn page_break_before(&self) -> bool {
        self.properties()
            .and_then(|ppr| ppr.child("w:pageBreakBefore"))
            .map(|flag| is_on(flag.attr("w:val")))
            .unwrap_or(false)
    }

    /// Section properties ending the section this paragraph closes.
    pub fn section_properties(&self) -> Option<&'a XmlElement> {
        self.properties().and_then(|ppr| ppr.child("w:sectPr"))
    }

    pub fn has_embedded_objects(&self) -> bool {
        self.element.elements().any(|child| {
            !child.is("w:pPr")
                && child.any_descendant(&|e: &XmlElement| {
                    EMBEDDED_OBJECTS.contains(&e.name.as_str())
                })
        })
    }

    pub fn spacing(&self) -> Result<Spacing, DocxError> {
        let Some(spacing) = self.properties().and_then(|ppr| ppr.child("w:spacing")) else {
            return Ok(Spacing::default());
        };
        Ok(Spacing {
            before: numeric_attr(spacing, "w:before")?.map(|twips| twips / TWIPS_PER_POINT),
            after: numeric_attr(spacing, "w:after")?.map(|twips| twips / TWIPS_PER_POINT),
            before_overridden: is_overridden(spacing, "w:beforeLines", "w:beforeAutospacing"),
            after_overridden: is_overridden(spacing, "w:afterLines", "w:afterAutospacing"),
        })
    }

    /// Line spacing as a multiple of single spacing; `None` for exact or
    /// at-least spacing and when unset.
    pub fn line_spacing(&self) -> Result<Option<f32>, DocxError> {
        let Some(spacing) = self.properties().and_then(|ppr| ppr.child("w:spacing")) else {
            return Ok(None);
        };
        match spacing.attr("w:lineRule") {
            None | Some("auto") => {
                Ok(numeric_attr(spacing, "w:line")?.map(|line| line / LINE_UNITS_PER_LINE))
            }
            Some(_) => Ok(None),
        }
    }

    /// `w:jc` value
    pub fn alignment(&self) -> Option<&'a str> {
        self.properties()
            .and_then(|ppr| ppr.child("w:jc"))
            .and_then(|jc| jc.attr("w:val"))
    }
}

/// Mutable access to a `w:p`.
#[derive(Debug)]
pub struct ParagraphMut<'a> {
    element: &'a mut XmlElement,
}

impl<'a> ParagraphMut<'a> {
    pub fn new(element: &'a mut XmlElement) -> Self {
        Self { element }
    }

    fn spacing_element(&mut self) -> &mut XmlElement {
        self.element
            .ensure_leading_child("w:pPr")
            .ensure_child("w:spacing", PPR_ORDER)
    }

    pub fn set_spacing_before(&mut self, points: f32) {
        let spacing = self.spacing_element();
        spacing.set_attr("w:before", twips(points));
        // Both override w:before when present
        spacing.remove_attr("w:beforeLines");
        spacing.remove_attr("w:beforeAutospacing");
    }

    pub fn set_spacing_after(&mut self, points: f32) {
        let spacing = self.spacing_element();
        spacing.set_attr("w:after", twips(points));
        spacing.remove_attr("w:afterLines");
        spacing.remove_attr("w:afterAutospacing");
    }

    pub fn set_line_spacing(&mut self, multiple: f32) {
        let spacing = self.spacing_element();
        spacing.set_attr(
            "w:line",
            ((multiple * LINE_UNITS_PER_LINE).round() as i64).to_string(),
        );
        spacing.set_attr("w:lineRule", "auto");
    }

    pub fn set_alignment(&mut self, jc: &str) {
        self.element
            .ensure_leading_child("w:pPr")
            .ensure_child("w:jc", PPR_ORDER)
            .set_attr("w:val", jc);
    }

    /// Applies run-level formatting to every run. `bold: None` leaves emphasis alone.
    pub fn set_run_format(
        &mut self,
        font_family: Option<&str>,
        size_points: Option<f32>,
        bold: Option<bool>,
    ) {
        let mut visitor = |element: &mut XmlElement| {
            if element.is("w:r") {
                apply_run_format(element, font_family, size_points, bold);
            }
        };
        for child in self.element.elements_mut() {
            if !child.is("w:pPr") {
                child.visit_mut(&mut visitor);
            }
        }
    }

    /// Replaces all content with a single run holding `text`. Paragraph
    /// properties and the first run's formatting are kept.
    pub fn replace_text(&mut self, text: &str) {
        let first_rpr = first_run_properties(self.element).cloned();
        self.element
            .children
            .retain(|node| matches!(node, XmlNode::Element(e) if e.is("w:pPr")));

        let mut run = XmlElement::new("w:r");
        if let Some(rpr) = first_rpr {
            run = run.with_child(rpr);
        }
        for piece in run_content(text) {
            run = run.with_child(piece);
        }
        self.element.children.push(XmlNode::Element(run));
    }
}

/// A paragraph holding nothing but a forced page break.
pub fn page_break_paragraph() -> XmlElement {
    XmlElement::new("w:p").with_child(
        XmlElement::new("w:r").with_child(XmlElement::new("w:br").with_attr("w:type", "page")),
    )
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for child in element.elements() {
        match child.name.as_str() {
            "w:pPr" | "w:rPr" | "w:del" | "w:moveFrom" => {}
            // Text boxes and drawings belong to their own paragraphs
            "w:drawing" | "w:pict" | "w:object" | "mc:AlternateContent" => {}
            "w:t" => {
                for node in &child.children {
                    if let XmlNode::Text(text) = node {
                        out.push_str(text);
                    }
                }
            }
            "w:tab" => out.push('\t'),
            "w:br" => {
                if !matches!(child.attr("w:type"), Some("page") | Some("column")) {
                    out.push('\n');
                }
            }
            "w:cr" => out.push('\n'),
            _ => collect_text(child, out),
        }
    }
}

fn first_run_properties(element: &XmlElement) -> Option<&XmlElement> {
    for child in element.elements() {
        if child.is("w:pPr") {
            continue;
        }
        if child.is("w:r") {
            return child.child("w:rPr");
        }
        if let Some(rpr) = first_run_properties(child) {
            return Some(rpr);
        }
    }
    None
}

fn run_content(text: &str) -> Vec<XmlElement> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let flush = |current: &mut String, pieces: &mut Vec<XmlElement>| {
        if !current.is_empty() {
            pieces.push(
                XmlElement::new("w:t")
                    .with_attr("xml:space", "preserve")
                    .with_text(current),
            );
            current.clear();
        }
    };
    for c in text.chars() {
        match c {
            '\t' => {
                flush(&mut current, &mut pieces);
                pieces.push(XmlElement::new("w:tab"));
            }
            '\n' => {
                flush(&mut current, &mut pieces);
                pieces.push(XmlElement::new("w:br"));
            }
            _ => current.push(c),
        }
    }
    flush(&mut current, &mut pieces);
    pieces
}

fn apply_run_format(
    run: &mut XmlElement,
    font_family: Option<&str>,
    size_points: Option<f32>,
    bold: Option<bool>,
) {
    let rpr = run.ensure_leading_child("w:rPr");
    if let Some(font) = font_family {
        let fonts = rpr.ensure_child("w:rFonts", RPR_ORDER);
        for key in ["w:ascii", "w:hAnsi", "w:cs", "w:eastAsia"] {
            fonts.set_attr(key, font);
        }
        // Theme fonts win over explicit names
        for key in ["w:asciiTheme", "w:hAnsiTheme", "w:cstheme", "w:eastAsiaTheme"] {
            fonts.remove_attr(key);
        }
    }
    if let Some(size) = size_points {
        let half_points = ((size * 2.0).round() as i64).to_string();
        rpr.ensure_child("w:sz", RPR_ORDER)
            .set_attr("w:val", half_points.clone());
        rpr.ensure_child("w:szCs", RPR_ORDER)
            .set_attr("w:val", half_points);
    }
    match bold {
        Some(true) => {
            rpr.ensure_child("w:b", RPR_ORDER).remove_attr("w:val");
            rpr.ensure_child("w:bCs", RPR_ORDER).remove_attr("w:val");
        }
        Some(false) => {
            rpr.remove_children("w:b");
            rpr.remove_children("w:bCs");
        }
        None => {}
    }
}

fn twips(points: f32) -> String {
    ((points * TWIPS_PER_POINT).round() as i64).to_string()
}

/// Parses a numeric attribute; NaN and infinities count as malformed.
fn numeric_attr(element: &XmlElement, key: &str) -> Result<Option<f32>, DocxError> {
    let Some(value) = element.attr(key) else {
        return Ok(None);
    };
    match value.trim().parse::<f32>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(DocxError::InvalidNumber {
            element: element.name.clone(),
            attribute: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn is_overridden(spacing: &XmlElement, lines: &str, autospacing: &str) -> bool {
    spacing.attr(lines).is_some()
        || spacing
            .attr(autospacing)
            .is_some_and(|value| is_on(Some(value)))
}

/// OOXML on/off values: absent means on.
fn is_on(value: Option<&str>) -> bool {
    !matches!(value, Some("0") | Some("false") | Some("off"))
}
