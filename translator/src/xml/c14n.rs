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

//! Exclusive XML canonicalization (xml-exc-c14n, without comments and
//! without an inclusive namespace prefix list).

use super::element::{Element, Node};

pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

type Namespaces = Vec<(String, String)>;

/// Writes the canonical form of the given element. Namespace declarations the
/// element inherits must be present on the element itself (see
/// [`Element::detach_child`]).
pub fn canonicalize(element: &Element) -> String {
    let mut out = String::new();

    write_element(element, &Namespaces::new(), &Namespaces::new(), &mut out);

    out
}

fn write_element(
    element: &Element,
    in_scope: &Namespaces,
    rendered: &Namespaces,
    out: &mut String,
) {
    let mut scope = in_scope.clone();
    scope.extend(element.namespaces.iter().cloned());

    let mut used = vec![element.prefix().unwrap_or("")];
    for (key, _) in &element.attributes {
        if let Some(prefix) = prefix_of(key) {
            if prefix != "xml" {
                used.push(prefix);
            }
        }
    }
    used.sort_unstable();
    used.dedup();

    let mut rendered = rendered.clone();
    let mut declarations = Vec::new();
    for prefix in used {
        let uri = lookup(&scope, prefix).unwrap_or("");
        let current = lookup(&rendered, prefix).unwrap_or("");

        if uri == current || (!prefix.is_empty() && uri.is_empty()) {
            continue;
        }

        let key = if prefix.is_empty() {
            "xmlns".to_owned()
        } else {
            format!("xmlns:{}", prefix)
        };

        declarations.push((key, uri.to_owned()));
        rendered.push((prefix.to_owned(), uri.to_owned()));
    }

    let mut attributes = element
        .attributes
        .iter()
        .map(|(key, value)| {
            let (uri, local) = match prefix_of(key) {
                Some("xml") => (XML_NAMESPACE, &key[4..]),
                Some(prefix) => (
                    lookup(&scope, prefix).unwrap_or(""),
                    &key[prefix.len() + 1..],
                ),
                None => ("", key.as_str()),
            };

            ((uri, local), key, value)
        })
        .collect::<Vec<_>>();
    attributes.sort_by(|a, b| a.0.cmp(&b.0));

    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &declarations {
        write_attribute(key, value, out);
    }
    for (_, key, value) in attributes {
        write_attribute(key, value, out);
    }
    out.push('>');

    for child in &element.children {
        match child {
            Node::Element(child) => write_element(child, &scope, &rendered, out),
            Node::Text(text) => escape_text(text, out),
        }
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn prefix_of(name: &str) -> Option<&str> {
    name.find(':').map(|pos| &name[..pos])
}

fn lookup<'a>(namespaces: &'a Namespaces, prefix: &str) -> Option<&'a str> {
    namespaces
        .iter()
        .rev()
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
}

fn write_attribute(key: &str, value: &str, out: &mut String) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");

    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }

    out.push('"');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_namespace_only_where_it_changes() {
        let fragment = Element::new("id")
            .with_namespace("", "urn:hl7-org:v3")
            .with_attribute("root", "A7B86F8D")
            .with_child(Element::new("low").with_attribute("value", "1"));

        let document = Element::new("FragmentsToBeHashed")
            .with_child(Element::new("Fragment").with_child(fragment));

        assert_eq!(
            r#"<FragmentsToBeHashed><Fragment><id xmlns="urn:hl7-org:v3" root="A7B86F8D"><low value="1"></low></id></Fragment></FragmentsToBeHashed>"#,
            canonicalize(&document)
        );
    }

    #[test]
    fn sorts_attributes_and_drops_unused_prefixes() {
        let root = Element::parse(
            r#"<a xmlns:x="urn:x" xmlns:unused="urn:unused" z="1" x:b="2" a="3"/>"#,
        )
        .unwrap();

        assert_eq!(
            r#"<a xmlns:x="urn:x" a="3" z="1" x:b="2"></a>"#,
            canonicalize(&root)
        );
    }

    #[test]
    fn escapes_content() {
        let root = Element::new("value")
            .with_attribute("text", "a \"b\" & <c>")
            .with_text("<medication>x & y</medication>");

        assert_eq!(
            r#"<value text="a &quot;b&quot; &amp; &lt;c>">&lt;medication&gt;x &amp; y&lt;/medication&gt;</value>"#,
            canonicalize(&root)
        );
    }

    #[test]
    fn canonicalizes_start_and_end_tags() {
        let input = [
            r#"<doc>"#,
            r#"   <e1   />"#,
            r#"   <e2   ></e2>"#,
            r#"   <e3   name="elem3"   id="elem3"   />"#,
            r#"   <e4   name="elem4"   id="elem4"   ></e4>"#,
            r#"   <e5 a:attr="out" b:attr="sorted" attr2="all" attr="I'm" xmlns:b="http://www.ietf.org" xmlns:a="http://www.w3.org" xmlns="http://example.org"/>"#,
            r#"   <e6 xmlns="" xmlns:a="http://www.w3.org">"#,
            r#"      <e7 xmlns="http://www.ietf.org">"#,
            r#"         <e8 xmlns="" xmlns:a="http://www.w3.org">"#,
            r#"            <e9 xmlns="" xmlns:a="http://www.ietf.org"/>"#,
            r#"         </e8>"#,
            r#"      </e7>"#,
            r#"   </e6>"#,
            r#"</doc>"#,
        ]
        .join("\n");
        let expected = [
            r#"<doc>"#,
            r#"   <e1></e1>"#,
            r#"   <e2></e2>"#,
            r#"   <e3 id="elem3" name="elem3"></e3>"#,
            r#"   <e4 id="elem4" name="elem4"></e4>"#,
            r#"   <e5 xmlns="http://example.org" xmlns:a="http://www.w3.org" xmlns:b="http://www.ietf.org" attr="I'm" attr2="all" b:attr="sorted" a:attr="out"></e5>"#,
            r#"   <e6>"#,
            r#"      <e7 xmlns="http://www.ietf.org">"#,
            r#"         <e8 xmlns="">"#,
            r#"            <e9></e9>"#,
            r#"         </e8>"#,
            r#"      </e7>"#,
            r#"   </e6>"#,
            r#"</doc>"#,
        ]
        .join("\n");

        let root = Element::parse_preserving(&input).unwrap();

        assert_eq!(expected, canonicalize(&root));
    }

    #[test]
    fn escapes_whitespace_and_markup_characters() {
        let root = Element::new("a")
            .with_attribute("v", "a\tb\nc\rd \"e\" & <f> g")
            .with_text("x\r\ny & <z> \"q\"");

        assert_eq!(
            "<a v=\"a&#x9;b&#xA;c&#xD;d &quot;e&quot; &amp; &lt;f> g\">x&#xD;\ny &amp; &lt;z&gt; \"q\"</a>",
            canonicalize(&root)
        );
    }

    #[test]
    fn expands_empty_elements() {
        let root = Element::parse("<doc><e1/><e2 a=\"1\"/></doc>").unwrap();

        assert_eq!(
            r#"<doc><e1></e1><e2 a="1"></e2></doc>"#,
            canonicalize(&root)
        );
        assert_eq!("<e1></e1>", canonicalize(&Element::new("e1")));
    }

    #[test]
    fn canonicalizes_detached_signed_info() {
        let signature = Element::parse(
            r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#">
                <SignedInfo>
                    <CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"/>
                </SignedInfo>
                <SignatureValue>abc</SignatureValue>
            </Signature>"#,
        )
        .unwrap();

        let signed_info = signature.detach_child("SignedInfo").unwrap();

        assert_eq!(
            r#"<SignedInfo xmlns="http://www.w3.org/2000/09/xmldsig#"><CanonicalizationMethod Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"></CanonicalizationMethod></SignedInfo>"#,
            canonicalize(&signed_info)
        );
    }
}
