//! Owned XML tree for WordprocessingML parts.
//!
//! `document.xml` is parsed into plain nodes so paragraphs can be moved,
//! removed and edited before the tree is written back. Comments, CDATA and
//! processing instructions are carried through untouched.

use crate::error::DocxError;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Other(Event<'static>),
}

impl XmlNode {
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    /// Qualified name including prefix, e.g. `w:p`
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, key: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(k, _)| k != key);
        before != self.attributes.len()
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.name == name)
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.child(name).is_some()
    }

    /// Removes every direct child element with this name, returning how many went.
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, XmlNode::Element(e) if e.name == name));
        before - self.children.len()
    }

    /// Returns the named child, creating it at its schema position when missing.
    /// `order` lists sibling names in the sequence the schema requires; names
    /// not in `order` are appended.
    pub fn ensure_child(&mut self, name: &str, order: &[&str]) -> &mut XmlElement {
        let existing = self
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.name == name));
        let position = match existing {
            Some(position) => position,
            None => {
                let position = self.insertion_point(name, order);
                self.children
                    .insert(position, XmlNode::Element(XmlElement::new(name)));
                position
            }
        };
        match &mut self.children[position] {
            XmlNode::Element(element) => element,
            _ => unreachable!("position always refers to an element node"),
        }
    }

    /// Returns the named child, creating it as the first child when missing.
    /// Property containers (`w:pPr`, `w:rPr`, `w:tblPr`) must lead their parent.
    pub fn ensure_leading_child(&mut self, name: &str) -> &mut XmlElement {
        let position = match self
            .children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(e) if e.name == name))
        {
            Some(position) => position,
            None => {
                self.children
                    .insert(0, XmlNode::Element(XmlElement::new(name)));
                0
            }
        };
        match &mut self.children[position] {
            XmlNode::Element(element) => element,
            _ => unreachable!("position always refers to an element node"),
        }
    }

    fn insertion_point(&self, name: &str, order: &[&str]) -> usize {
        let rank = |n: &str| order.iter().position(|o| *o == n);
        let Some(own_rank) = rank(name) else {
            return self.children.len();
        };
        self.children
            .iter()
            .position(|node| match node {
                XmlNode::Element(e) => rank(&e.name).is_some_and(|r| r > own_rank),
                _ => false,
            })
            .unwrap_or(self.children.len())
    }

    /// True when this element or any element below it satisfies `predicate`.
    pub fn any_descendant(&self, predicate: &dyn Fn(&XmlElement) -> bool) -> bool {
        predicate(self) || self.elements().any(|e| e.any_descendant(predicate))
    }

    /// Visits this element and every element below it, depth first.
    pub fn visit_mut(&mut self, visitor: &mut dyn FnMut(&mut XmlElement)) {
        visitor(self);
        for child in self.elements_mut() {
            child.visit_mut(visitor);
        }
    }
}

/// A parsed XML part: declaration and other top-level nodes plus the root element.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
    pub epilog: Vec<XmlNode>,
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self, DocxError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(element_from_start(&e)?),
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        DocxError::Unbalanced("closing tag without an opening tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(e) => {
                    // Whitespace between the declaration and the root is dropped
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(XmlNode::Text(e.unescape()?.into_owned()));
                    }
                }
                Event::Eof => break,
                other => {
                    let node = XmlNode::Other(other.into_owned());
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    } else if root.is_none() {
                        prolog.push(node);
                    } else {
                        epilog.push(node);
                    }
                }
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocxError::Unbalanced(format!("<{}> is never closed", open.name)));
        }
        let root = root.ok_or(DocxError::MissingElement("root"))?;

        Ok(Self {
            prolog,
            root,
            epilog,
        })
    }

    pub fn to_xml(&self) -> Result<String, DocxError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement, DocxError> {
    let mut element = XmlElement::new(&String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), DocxError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(DocxError::Unbalanced(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<(), DocxError> {
    match node {
        XmlNode::Element(element) => write_element(writer, element),
        XmlNode::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
            Ok(())
        }
        XmlNode::Other(event) => {
            writer.write_event(event.clone())?;
            Ok(())
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), DocxError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
