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

use crate::{
    hl7v3::prescription::ParentPrescription,
    xml::{canonicalize, ser::to_string, Element, Node, HL7V3_NAMESPACE},
};

use super::Error;

/// Parts of a parent prescription covered by the prescriber's signature.
/// Every fragment is a standalone copy in the HL7v3 namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct Fragments {
    pub id: Element,
    pub time: Element,
    pub agent_person: Element,
    pub record_target: Element,
    pub line_items: Vec<Element>,
}

impl Fragments {
    pub fn from_parent_prescription(
        parent_prescription: &ParentPrescription,
    ) -> Result<Self, Error> {
        let xml = to_string(parent_prescription)?;
        let root = Element::parse(&xml)?;

        Self::extract(&root)
    }

    /// Extracts the fragments from a `ParentPrescription` element, either
    /// freshly serialized or taken from a received message.
    pub fn extract(parent_prescription: &Element) -> Result<Self, Error> {
        let prescription = parent_prescription
            .find(&["pertinentInformation1", "pertinentPrescription"])
            .ok_or(Error::MissingElement("pertinentPrescription"))?;
        let author = prescription
            .child("author")
            .ok_or(Error::MissingElement("author"))?;

        let line_items = prescription
            .children_named("pertinentInformation2")
            .filter_map(|pertinent_information| pertinent_information.child("pertinentLineItem"))
            .map(line_item_fragment)
            .collect();

        Ok(Self {
            id: namespaced(prescription.child("id"), "id")?,
            time: namespaced(author.child("time"), "time")?,
            agent_person: namespaced(author.child("AgentPerson"), "AgentPerson")?,
            record_target: namespaced(parent_prescription.child("recordTarget"), "recordTarget")?,
            line_items,
        })
    }

    /// Value of the signing time fragment.
    pub fn time_value(&self) -> Option<&str> {
        self.time.attribute("value")
    }

    /// Canonical form of the fragments the digest is calculated from.
    pub fn to_hashable(&self) -> String {
        let fragment = |elements: Vec<Element>| {
            elements
                .into_iter()
                .fold(Element::new("Fragment"), Element::with_child)
        };

        let mut document = Element::new("FragmentsToBeHashed")
            .with_child(fragment(vec![self.time.clone(), self.id.clone()]))
            .with_child(fragment(vec![self.agent_person.clone()]))
            .with_child(fragment(vec![self.record_target.clone()]));

        for line_item in &self.line_items {
            document = document.with_child(fragment(vec![line_item.clone()]));
        }

        canonicalize(&document)
    }
}

fn namespaced(element: Option<&Element>, name: &'static str) -> Result<Element, Error> {
    let mut element = element.cloned().ok_or(Error::MissingElement(name))?;
    element.set_namespace(HL7V3_NAMESPACE);

    Ok(element)
}

/// Line items may change their repeat number low bound and their status
/// after signing, both are left out of the fragment.
fn line_item_fragment(line_item: &Element) -> Element {
    let mut line_item = line_item.clone();

    if let Some(repeat_number) = line_item.child_mut("repeatNumber") {
        repeat_number.remove_children("low");
    }

    line_item.children.retain(|node| match node {
        Node::Element(element) => element.child("pertinentItemStatus").is_none(),
        Node::Text(_) => true,
    });
    line_item.set_namespace(HL7V3_NAMESPACE);

    line_item
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::read_to_string;

    use resources::Bundle;
    use serde_json::from_str;

    use crate::{
        hl7v3::{
            codes::{Code, Identifier, ITEM_STATUS},
            core::{Interval, NumericValue, Timestamp},
            envelope::{Asids, Payload, SendMessagePayload},
        },
        translation::convert_parent_prescription,
    };

    fn parent_prescription() -> ParentPrescription {
        let json = read_to_string("./examples/prescription-order.json").unwrap();
        let bundle: Bundle = from_str(&json).unwrap();

        let mut parent_prescription = convert_parent_prescription(&bundle).unwrap();
        parent_prescription.pertinent_information1.value_mut().author.time =
            Some(Timestamp::new("20210507102030"));

        parent_prescription
    }

    #[test]
    fn extracts_fragments_in_line_item_order() {
        let parent_prescription = parent_prescription();

        let fragments = Fragments::from_parent_prescription(&parent_prescription).unwrap();

        assert_eq!(
            Some(parent_prescription.prescription().id[0].root.as_str()),
            fragments.id.attribute("root")
        );
        assert_eq!(Some("20210507102030"), fragments.time_value());
        assert_eq!(2, fragments.line_items.len());

        let line_item_ids = fragments
            .line_items
            .iter()
            .filter_map(|line_item| line_item.child("id"))
            .filter_map(|id| id.attribute("root"))
            .collect::<Vec<_>>();
        assert_eq!(
            vec![
                "A54219B8-F741-4C47-B662-E4F8DFA49AB6",
                "A2A6B2F3-7AD4-4B5C-9B7B-1A4E0F2B4F6C"
            ],
            line_item_ids
        );
    }

    #[test]
    fn hashable_form_declares_namespace_per_fragment() {
        let fragments = Fragments::from_parent_prescription(&parent_prescription()).unwrap();

        let hashable = fragments.to_hashable();

        assert!(hashable.starts_with(
            r#"<FragmentsToBeHashed><Fragment><time xmlns="urn:hl7-org:v3" value="20210507102030"></time><id xmlns="urn:hl7-org:v3" root=""#
        ));
        assert!(hashable.contains(r#"<Fragment><AgentPerson xmlns="urn:hl7-org:v3""#));
        assert!(hashable.contains(r#"<Fragment><recordTarget xmlns="urn:hl7-org:v3""#));
        assert_eq!(2, hashable.matches("<Fragment><pertinentLineItem").count());
        assert!(hashable.ends_with("</Fragment></FragmentsToBeHashed>"));
    }

    #[test]
    fn fragments_survive_sending_and_later_status_changes() {
        let parent_prescription = parent_prescription();
        let original = Fragments::from_parent_prescription(&parent_prescription).unwrap();

        let mut sent = parent_prescription;
        for line_item in sent.pertinent_information1.value_mut().pertinent_information2.iter_mut() {
            let mut changed = line_item.value().clone().with_item_status(Code::new(ITEM_STATUS, "0001"));
            changed.repeat_number = Some(Interval {
                low: NumericValue::new("2"),
                high: NumericValue::new("6"),
            });
            *line_item.value_mut() = changed;
        }
        let mut expected = original;
        for line_item in expected.line_items.iter_mut() {
            let high = Element::new("high").with_attribute("value", "6");
            let repeat_number = Element::new("repeatNumber").with_child(high);

            let position = line_item
                .children
                .iter()
                .position(|node| matches!(node, Node::Element(e) if e.name == "product"))
                .unwrap();
            line_item.children.insert(position, Node::Element(repeat_number));
        }

        let envelope = SendMessagePayload::new(
            Identifier::global("a0b0c0d0-0000-4000-8000-000000000002"),
            Timestamp::new("20210507102031"),
            Asids {
                from: "200000001285",
                to: "567456789789",
            },
            None,
            Payload::ParentPrescription(Box::new(sent)),
        );
        let xml = to_string(&envelope).unwrap();
        let root = Element::parse(&xml).unwrap();
        let received = root
            .find(&["ControlActEvent", "subject", "ParentPrescription"])
            .unwrap();

        let actual = Fragments::extract(received).unwrap();

        assert_eq!(expected, actual);
        assert_eq!(expected.to_hashable(), actual.to_hashable());
    }
}
