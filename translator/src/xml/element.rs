/*
 * Copyright (c) 2021 gematik GmbH
 * 
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * 
 *    http://www.apache.org/licenses/LICENSE-2.0
 * 
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

use std::borrow::Cow;
use std::str::from_utf8;

use quick_xml::{events::BytesStart, events::Event, Reader};

use super::Error;

/// Owned XML element tree. Namespace declarations are kept apart from the
/// regular attributes so fragments can be detached and re-scoped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub namespaces: Vec<(String, String)>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parses a document, dropping whitespace around text content.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        Self::parse_inner(xml, true)
    }

    /// Parses a document, keeping all text content as written.
    pub fn parse_preserving(xml: &str) -> Result<Self, Error> {
        Self::parse_inner(xml, false)
    }

    fn parse_inner(xml: &str, trim: bool) -> Result<Self, Error> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(trim);
        reader.expand_empty_elements(false);

        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event(&mut buf)? {
                Event::Start(start) => {
                    stack.push(Self::from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = Self::from_start(&start)?;

                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
                Event::End(end) => {
                    let name = from_utf8(end.name())?;
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::UnexpectedEnd(name.to_owned()))?;

                    if element.name != name {
                        return Err(Error::UnexpectedEnd(name.to_owned()));
                    }

                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = text.unescaped()?;
                        let text = from_utf8(&text)?;

                        if !text.is_empty() {
                            parent.push_text(text);
                        }
                    }
                }
                Event::CData(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(from_utf8(&text)?);
                    }
                }
                Event::Eof => break,
                _ => (),
            }

            buf.clear();
        }

        if let Some(element) = stack.pop() {
            return Err(Error::Unclosed(element.name));
        }

        root.ok_or(Error::NoRoot)
    }

    fn from_start(start: &BytesStart) -> Result<Self, Error> {
        let mut element = Self::new(from_utf8(start.name())?);

        for attrib in start.attributes() {
            let attrib = attrib?;
            let key = from_utf8(attrib.key)?;
            let value = attrib.unescaped_value()?;
            let value = from_utf8(&value)?.to_owned();

            if key == "xmlns" {
                element.namespaces.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                element.namespaces.push((prefix.to_owned(), value));
            } else {
                element.attributes.push((key.to_owned(), value));
            }
        }

        Ok(element)
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_owned()));
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.find(':').map(|pos| &self.name[..pos])
    }

    pub fn local_name(&self) -> &str {
        match self.name.find(':') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.push((key.into(), value.into()));

        self
    }

    pub fn with_namespace<P: Into<String>, U: Into<String>>(mut self, prefix: P, uri: U) -> Self {
        self.namespaces.push((prefix.into(), uri.into()));

        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));

        self
    }

    pub fn with_text<T: Into<String>>(mut self, text: T) -> Self {
        self.children.push(Node::Text(text.into()));

        self
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Child elements matching the given local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.local_name() == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.local_name() == name)
    }

    /// Follows a path of local names starting at this element.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter()
            .try_fold(self, |element, name| element.child(name))
    }

    pub fn remove_children(&mut self, name: &str) {
        self.children.retain(|node| match node {
            Node::Element(element) => element.local_name() != name,
            Node::Text(_) => true,
        })
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(element) if element.local_name() == name => Some(element),
            _ => None,
        })
    }

    /// Concatenated text content of this element and its descendants.
    pub fn text(&self) -> Cow<str> {
        match self.children.as_slice() {
            [] => Cow::Borrowed(""),
            [Node::Text(text)] => Cow::Borrowed(text),
            children => {
                let mut text = String::new();
                for child in children {
                    match child {
                        Node::Text(t) => text.push_str(t),
                        Node::Element(e) => text.push_str(&e.text()),
                    }
                }

                Cow::Owned(text)
            }
        }
    }

    /// Clones the child element with the given local name, carrying over the
    /// namespace declarations of this element it does not redeclare itself.
    pub fn detach_child(&self, name: &str) -> Option<Element> {
        let mut child = self.child(name)?.clone();

        for (prefix, uri) in &self.namespaces {
            if !child.namespaces.iter().any(|(p, _)| p == prefix) {
                child.namespaces.push((prefix.clone(), uri.clone()));
            }
        }

        Some(child)
    }

    /// Replaces all namespace declarations of this element.
    pub fn set_namespace<U: Into<String>>(&mut self, uri: U) {
        self.namespaces = vec![(String::new(), uri.into())];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements() {
        let xml = r##"
            <ParentPrescription xmlns="urn:hl7-org:v3" classCode="INFO">
                <id root="A7B86F8D-1D81-FC28-E050-D20AE3A215F0"/>
                <recordTarget typeCode="RCT">
                    <Patient classCode="PAT">
                        <name><given>Jane</given> <family>Smith</family></name>
                    </Patient>
                </recordTarget>
            </ParentPrescription>
        "##;

        let root = Element::parse(xml).unwrap();

        assert_eq!("ParentPrescription", root.name);
        assert_eq!(
            vec![(String::new(), "urn:hl7-org:v3".to_owned())],
            root.namespaces
        );
        assert_eq!(Some("INFO"), root.attribute("classCode"));
        assert_eq!(
            Some("A7B86F8D-1D81-FC28-E050-D20AE3A215F0"),
            root.child("id").and_then(|id| id.attribute("root"))
        );

        let name = root.find(&["recordTarget", "Patient", "name"]).unwrap();
        assert_eq!("JaneSmith", name.text());
    }

    #[test]
    fn keeps_whitespace_when_preserving() {
        let xml = "<a>\n  <b>x</b>\n</a>";

        let trimmed = Element::parse(xml).unwrap();
        let preserved = Element::parse_preserving(xml).unwrap();

        assert_eq!(1, trimmed.children.len());
        assert_eq!(3, preserved.children.len());
    }

    #[test]
    fn unescapes_text_and_attributes() {
        let root = Element::parse(r#"<a b="x &amp; y">&lt;medication&gt;</a>"#).unwrap();

        assert_eq!(Some("x & y"), root.attribute("b"));
        assert_eq!("<medication>", root.text());
    }

    #[test]
    fn matches_on_local_names() {
        let root = Element::parse(
            r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature>"#,
        )
        .unwrap();

        assert_eq!("Signature", root.local_name());
        assert_eq!(Some("ds"), root.prefix());
        assert!(root.child("SignedInfo").is_some());
    }

    #[test]
    fn child_outlives_looked_up_name() {
        let root = Element::parse(r#"<a><id root="1"/><id root="2"/></a>"#).unwrap();

        let id = {
            let name = String::from("id");
            root.child(&name)
        };

        assert_eq!(Some("1"), id.and_then(|id| id.attribute("root")));
        assert_eq!(2, root.children_named("id").count());
    }

    #[test]
    fn detached_children_keep_inherited_namespaces() {
        let root = Element::parse(
            r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"><SignedInfo/></Signature>"#,
        )
        .unwrap();

        let signed_info = root.detach_child("SignedInfo").unwrap();

        assert_eq!(
            vec![(String::new(), "http://www.w3.org/2000/09/xmldsig#".to_owned())],
            signed_info.namespaces
        );
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(Element::parse("<a><b></a></b>").is_err());
        assert!(Element::parse("").is_err());
    }
}
