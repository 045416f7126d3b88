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

use serde::Serialize;

use crate::xml::Element;

use super::Fragments;

/// What the prescriber is about to sign, in a form fit for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningSummary {
    pub prescription_start_date: String,
    pub patient_name: String,
    pub patient_dob: String,
    pub patient_gender: String,
    pub patient_nhs_number: String,
    pub patient_address: String,
    pub prescriber_name: String,
    pub prescriber_code: String,
    pub prescriber_org: String,
    pub prescriber_address: String,
    pub medication: Vec<SummaryMedication>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryMedication {
    pub name: String,
    pub quantity: String,
    pub dose: String,
}

impl Fragments {
    /// Summary of the signed fragments. Elements missing from the fragments
    /// are shown as empty text.
    pub fn summary(&self) -> SigningSummary {
        let patient = self.record_target.child("Patient");
        let patient_person = patient.and_then(|patient| patient.child("patientPerson"));

        let prescriber = &self.agent_person;
        let organization = prescriber.child("representedOrganization");

        let organization_name = text(organization.and_then(|o| o.child("name")));
        let organization_code = attribute(organization.and_then(|o| o.child("id")), "extension");

        SigningSummary {
            prescription_start_date: attribute(Some(&self.time), "value"),
            patient_name: name(patient_person.and_then(|person| person.child("name"))),
            patient_dob: attribute(patient_person.and_then(|p| p.child("birthTime")), "value"),
            patient_gender: gender(
                patient_person.and_then(|p| p.child("administrativeGenderCode")),
            ),
            patient_nhs_number: attribute(patient.and_then(|p| p.child("id")), "extension"),
            patient_address: address(patient.and_then(|p| p.child("addr"))),
            prescriber_name: name(prescriber.find(&["agentPerson", "name"])),
            prescriber_code: attribute(prescriber.child("id"), "extension"),
            prescriber_org: format!("{} ({})", organization_name, organization_code),
            prescriber_address: address(organization.and_then(|o| o.child("addr"))),
            medication: self.line_items.iter().map(medication).collect(),
        }
    }
}

fn medication(line_item: &Element) -> SummaryMedication {
    SummaryMedication {
        name: attribute(
            line_item.find(&[
                "product",
                "manufacturedProduct",
                "manufacturedRequestedMaterial",
                "code",
            ]),
            "displayName",
        ),
        quantity: attribute(
            line_item.find(&["component", "lineItemQuantity", "quantity"]),
            "value",
        ),
        dose: text(line_item.find(&[
            "pertinentInformation2",
            "pertinentDosageInstructions",
            "value",
        ])),
    }
}

fn attribute(element: Option<&Element>, name: &str) -> String {
    element
        .and_then(|element| element.attribute(name))
        .unwrap_or_default()
        .to_owned()
}

fn text(element: Option<&Element>) -> String {
    element
        .map(|element| element.text().into_owned())
        .unwrap_or_default()
}

fn joined<I>(parts: I, separator: &str) -> String
where
    I: IntoIterator<Item = String>,
{
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn all_text(element: &Element, name: &str) -> String {
    joined(element.children_named(name).map(|e| e.text().into_owned()), " ")
}

fn name(name: Option<&Element>) -> String {
    match name {
        Some(name) => joined(
            vec![
                all_text(name, "prefix"),
                all_text(name, "given"),
                all_text(name, "family"),
            ],
            " ",
        ),
        None => String::new(),
    }
}

fn address(addr: Option<&Element>) -> String {
    match addr {
        Some(addr) => joined(
            vec![all_text(addr, "streetAddressLine"), all_text(addr, "postalCode")],
            ", ",
        ),
        None => String::new(),
    }
}

fn gender(code: Option<&Element>) -> String {
    let gender = match code.and_then(|code| code.attribute("code")) {
        Some("1") => "Male",
        Some("2") => "Female",
        Some("9") => "Other",
        _ => "Unknown",
    };

    gender.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::read_to_string;

    use resources::Bundle;
    use serde_json::from_str;

    use crate::{hl7v3::core::Timestamp, translation::convert_parent_prescription};

    fn fragments() -> Fragments {
        let json = read_to_string("./examples/prescription-order.json").unwrap();
        let bundle: Bundle = from_str(&json).unwrap();

        let mut parent_prescription = convert_parent_prescription(&bundle).unwrap();
        parent_prescription.pertinent_information1.value_mut().author.time =
            Some(Timestamp::new("20210507102030"));

        Fragments::from_parent_prescription(&parent_prescription).unwrap()
    }

    #[test]
    fn summarizes_patient() {
        let summary = fragments().summary();

        assert_eq!("20210507102030", summary.prescription_start_date);
        assert_eq!("MISS ETTA CORY", summary.patient_name);
        assert_eq!("19990104", summary.patient_dob);
        assert_eq!("Female", summary.patient_gender);
        assert_eq!("9453740519", summary.patient_nhs_number);
        assert_eq!(
            "123 Dale Avenue Long Eaton Nottingham, NG10 1NP",
            summary.patient_address
        );
    }

    #[test]
    fn summarizes_prescriber() {
        let summary = fragments().summary();

        assert_eq!("DR THOMAS EDWARDS", summary.prescriber_name);
        assert_eq!("100102238986", summary.prescriber_code);
        assert_eq!("HALLGARTH SURGERY (A83008)", summary.prescriber_org);
        assert!(summary.prescriber_address.ends_with(", DL4 2HP"));
    }

    #[test]
    fn summarizes_medication_in_line_item_order() {
        let summary = fragments().summary();

        assert_eq!(
            vec![
                SummaryMedication {
                    name: "Paracetamol 500mg soluble tablets".into(),
                    quantity: "100".into(),
                    dose: "4 times a day - Oral".into(),
                },
                SummaryMedication {
                    name: "Amoxicillin 250mg capsules".into(),
                    quantity: "20".into(),
                    dose: "3 times a day for 10 days".into(),
                },
            ],
            summary.medication
        );
    }

    #[test]
    fn missing_elements_are_empty() {
        let mut fragments = fragments();
        fragments.record_target = Element::new("recordTarget");

        let summary = fragments.summary();

        assert_eq!("", summary.patient_name);
        assert_eq!("Unknown", summary.patient_gender);
        assert_eq!("", summary.patient_address);
    }
}
