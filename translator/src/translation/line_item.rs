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

use std::collections::BTreeMap;

use quick_xml::events::BytesText;
use regex::Regex;
use resources::{dosage::Dosage, misc::Quantity, Bundle, MedicationRequest};
use serde::Serialize;

use crate::hl7v3::{
    codes::{Code, Identifier, PRESCRIPTION_ENDORSEMENT},
    core::{Interval, NumericValue, QuantityInAlternativeUnits},
    line_item::LineItem,
};

use super::{
    dosage,
    resolve::{
        codeable_concept_coding, extension_or_none, identifier_value, medication_coding,
        only_element_or_none, required, ExtensionExt,
    },
    Error,
};

pub const ORDER_ITEM_NUMBER_SYSTEM: &str = "https://fhir.nhs.uk/Id/prescription-order-item-number";
const CONTROLLED_DRUG_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-ControlledDrug";
const ENDORSEMENT_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionEndorsement";
const ENDORSEMENT_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/medicationrequest-endorsement";
const CONTROLLED_DRUG_PREFIX: &str = "CD: ";

lazy_static! {
    static ref MEDICATION_TAG: Regex = Regex::new(r"^\s*<medication>(.*?)</medication>").unwrap();
    static ref PATIENT_INFO_TAG: Regex =
        Regex::new(r"^\s*<patientInfo>(.*?)</patientInfo>").unwrap();
}

/// Parts of the additional instructions of a line item.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalInstructions {
    pub medication: Vec<String>,
    pub patient_info: Vec<String>,
    pub controlled_drug_words: String,
    pub additional_instructions: String,
}

impl AdditionalInstructions {
    /// Renders the parts into the text carried by the line item. Medication
    /// and patient info entries are emitted as escaped tags in front of the
    /// free text.
    pub fn assemble(&self) -> String {
        let mut ret = String::new();

        for medication in &self.medication {
            ret.push_str("<medication>");
            ret.push_str(&escape(medication));
            ret.push_str("</medication>");
        }

        for patient_info in &self.patient_info {
            ret.push_str("<patientInfo>");
            ret.push_str(&escape(patient_info));
            ret.push_str("</patientInfo>");
        }

        let controlled_drug = if self.controlled_drug_words.is_empty() {
            None
        } else {
            Some(format!("{}{}", CONTROLLED_DRUG_PREFIX, self.controlled_drug_words))
        };
        let text = controlled_drug
            .into_iter()
            .chain(Some(self.additional_instructions.clone()))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        ret.push_str(&escape(&text));

        ret
    }
}

/// Splits the text of an additional instructions block into its parts.
pub fn parse_additional_instructions(text: &str) -> AdditionalInstructions {
    let mut ret = AdditionalInstructions::default();
    let mut text = text;

    loop {
        if let Some(captures) = MEDICATION_TAG.captures(text) {
            ret.medication.push(unescape(&captures[1]));
            text = &text[captures[0].len()..];
        } else if let Some(captures) = PATIENT_INFO_TAG.captures(text) {
            ret.patient_info.push(unescape(&captures[1]));
            text = &text[captures[0].len()..];
        } else {
            break;
        }
    }

    let text = unescape(text);
    match text.strip_prefix(CONTROLLED_DRUG_PREFIX) {
        Some(rest) => match rest.find('\n') {
            Some(pos) => {
                ret.controlled_drug_words = rest[..pos].to_owned();
                ret.additional_instructions = rest[pos + 1..].to_owned();
            }
            None => ret.controlled_drug_words = rest.to_owned(),
        },
        None => ret.additional_instructions = text,
    }

    ret
}

fn escape(text: &str) -> String {
    let text = BytesText::from_plain_str(text);

    String::from_utf8_lossy(text.escaped()).into_owned()
}

fn unescape(text: &str) -> String {
    match BytesText::from_escaped_str(text).unescaped() {
        Ok(unescaped) => String::from_utf8_lossy(&unescaped).into_owned(),
        Err(_) => text.to_owned(),
    }
}

/// Dosage text of a line item. Multiple instructions must be sequenced; the
/// texts of one sequence are taken together, sequences one after another.
pub fn dosage_instructions(dosages: &[Dosage]) -> Result<String, Error> {
    const FHIR_PATH: &str = "MedicationRequest.dosageInstruction";

    match dosages {
        [] => Err(Error::invalid("Dosage instructions not provided", FHIR_PATH)),
        [dosage] => {
            let text = required(
                dosage.text.as_deref(),
                "MedicationRequest.dosageInstruction.text",
            )?;

            Ok(text.to_owned())
        }
        dosages => {
            let mut groups = BTreeMap::<i64, Vec<&str>>::new();

            for dosage in dosages {
                let sequence = dosage
                    .sequence
                    .as_ref()
                    .and_then(|sequence| sequence.as_integer())
                    .ok_or_else(|| {
                        Error::invalid("Dosage instructions lacking complete sequencing", FHIR_PATH)
                    })?;

                groups
                    .entry(sequence)
                    .or_default()
                    .push(dosage.text.as_deref().unwrap_or_default());
            }

            Ok(groups
                .into_iter()
                .map(|(_, texts)| texts.join(", and "))
                .collect::<Vec<_>>()
                .join(", then "))
        }
    }
}

/// Quantity with a SNOMED unit code, used for requested and supplied items.
pub fn convert_quantity(
    quantity: &Quantity,
    fhir_path: &str,
) -> Result<QuantityInAlternativeUnits, Error> {
    let value = required(quantity.value.as_ref(), &format!("{}.value", fhir_path))?.to_string();
    let code = required(quantity.code.as_deref(), &format!("{}.code", fhir_path))?;
    let unit = Code::snomed(code).with_display_opt(quantity.unit.as_deref());

    Ok(QuantityInAlternativeUnits::new(value.clone(), value, unit))
}

fn controlled_drug_words(request: &MedicationRequest) -> Result<Option<&str>, Error> {
    let controlled_drug = match extension_or_none(
        &request.extension,
        CONTROLLED_DRUG_URL,
        "MedicationRequest.extension",
    )? {
        Some(extension) => extension,
        None => return Ok(None),
    };

    let fhir_path = format!(
        "MedicationRequest.extension(\"{}\").extension",
        CONTROLLED_DRUG_URL
    );
    let words = match extension_or_none(controlled_drug.extensions(), "quantityWords", &fhir_path)?
    {
        Some(extension) => extension.value_string(&fhir_path)?,
        None => return Ok(None),
    };

    Ok(Some(words).filter(|words| !words.is_empty()))
}

fn endorsements(request: &MedicationRequest) -> Result<Vec<Code>, Error> {
    let fhir_path = format!(
        "MedicationRequest.extension(\"{}\").valueCodeableConcept",
        ENDORSEMENT_URL
    );

    request
        .extension
        .iter()
        .filter(|extension| extension.url == ENDORSEMENT_URL)
        .map(|extension| {
            let concept = extension.codeable_concept().ok_or_else(|| {
                Error::invalid(
                    format!(
                        "Extension {} is expected to have a valueCodeableConcept.",
                        ENDORSEMENT_URL
                    ),
                    fhir_path.as_str(),
                )
            })?;
            let coding = codeable_concept_coding(Some(concept), ENDORSEMENT_SYSTEM, &fhir_path)?;
            let code = required(coding.code.as_deref(), &format!("{}.coding.code", fhir_path))?;

            Ok(Code::new(PRESCRIPTION_ENDORSEMENT, code))
        })
        .collect()
}

/// Line item of a parent prescription. Medication list and patient info
/// entries are only passed for the first item of a prescription.
pub fn convert_line_item(
    bundle: &Bundle,
    request: &MedicationRequest,
    repeat_number: Option<&Interval<NumericValue>>,
    medication_list: &[String],
    patient_info: &[String],
) -> Result<LineItem, Error> {
    let id = identifier_value(
        &request.identifier,
        ORDER_ITEM_NUMBER_SYSTEM,
        "MedicationRequest.identifier",
    )?;

    let coding = medication_coding(
        bundle,
        request.medication_codeable_concept.as_ref(),
        request.medication_reference.as_ref(),
    )?;
    let code = required(
        coding.code.as_deref(),
        "MedicationRequest.medicationCodeableConcept.coding.code",
    )?;
    let medication = Code::snomed(code).with_display_opt(coding.display.as_deref());

    let dispense_request = required(
        request.dispense_request.as_ref(),
        "MedicationRequest.dispenseRequest",
    )?;
    let quantity = required(
        dispense_request.quantity.as_ref(),
        "MedicationRequest.dispenseRequest.quantity",
    )?;
    let quantity = convert_quantity(quantity, "MedicationRequest.dispenseRequest.quantity")?;

    dosage::audit(&request.dosage_instruction);
    let dosage_text = dosage_instructions(&request.dosage_instruction)?;

    let note = only_element_or_none(&request.note, "MedicationRequest.note", None)?;
    let additional_instructions = AdditionalInstructions {
        medication: medication_list.to_vec(),
        patient_info: patient_info.to_vec(),
        controlled_drug_words: controlled_drug_words(request)?.unwrap_or_default().to_owned(),
        additional_instructions: note.map(|note| note.text.clone()).unwrap_or_default(),
    }
    .assemble();

    let mut ret = LineItem::new(Identifier::global(id), medication, quantity, dosage_text);
    ret.repeat_number = repeat_number.cloned();

    if !additional_instructions.is_empty() {
        ret = ret.with_additional_instructions(additional_instructions);
    }

    for endorsement in endorsements(request)? {
        ret = ret.with_endorsement(endorsement);
    }

    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{from_value, json};

    use crate::hl7v3::codes::SNOMED;

    fn request(extra: serde_json::Value) -> MedicationRequest {
        let mut value = json!({
            "resourceType": "MedicationRequest",
            "identifier": [
                {
                    "system": "https://fhir.nhs.uk/Id/prescription-order-item-number",
                    "value": "a54219b8-f741-4c47-b662-e4f8dfa49ab6"
                }
            ],
            "medicationCodeableConcept": {
                "coding": [
                    { "system": "http://snomed.info/sct", "code": "322237000", "display": "Paracetamol 500mg soluble tablets" }
                ]
            },
            "dosageInstruction": [ { "text": "4 times a day - Oral" } ],
            "dispenseRequest": {
                "quantity": { "value": 100, "unit": "tablet", "system": "http://snomed.info/sct", "code": "428673006" }
            }
        });

        if let (Some(target), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                target.insert(key.clone(), value.clone());
            }
        }

        from_value(value).unwrap()
    }

    fn bundle() -> Bundle {
        from_value(json!({ "resourceType": "Bundle", "entry": [] })).unwrap()
    }

    #[test]
    fn converts_medication_request() {
        let repeat_number = Interval {
            low: NumericValue::new("1"),
            high: NumericValue::new("6"),
        };

        let actual =
            convert_line_item(&bundle(), &request(json!({})), Some(&repeat_number), &[], &[])
                .unwrap();

        assert_eq!(Identifier::global("a54219b8-f741-4c47-b662-e4f8dfa49ab6"), actual.id);
        assert_eq!(
            &Code::new(SNOMED, "322237000").with_display("Paracetamol 500mg soluble tablets"),
            actual.medication()
        );
        assert_eq!("100", actual.quantity().value);
        assert_eq!("428673006", actual.quantity().translation.code);
        assert_eq!(Some("4 times a day - Oral"), actual.dosage_instructions());
        assert_eq!(None, actual.additional_instructions());
        assert_eq!(Some(repeat_number), actual.repeat_number);
    }

    #[test]
    fn assembles_additional_instructions() {
        let request = request(json!({
            "extension": [
                {
                    "url": "https://fhir.nhs.uk/StructureDefinition/Extension-DM-ControlledDrug",
                    "extension": [ { "url": "quantityWords", "valueString": "one hundred" } ]
                }
            ],
            "note": [ { "text": "Take with water" } ]
        }));

        let actual = convert_line_item(
            &bundle(),
            &request,
            None,
            &["Bendroflumethiazide 2.5mg".into()],
            &["Due for review".into()],
        )
        .unwrap();

        assert_eq!(
            Some("<medication>Bendroflumethiazide 2.5mg</medication><patientInfo>Due for review</patientInfo>CD: one hundred\nTake with water"),
            actual.additional_instructions()
        );
    }

    #[test]
    fn converts_endorsements() {
        let request = request(json!({
            "extension": [
                {
                    "url": "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionEndorsement",
                    "valueCodeableConcept": {
                        "coding": [ { "system": "https://fhir.nhs.uk/CodeSystem/medicationrequest-endorsement", "code": "SLS" } ]
                    }
                }
            ]
        }));

        let actual = convert_line_item(&bundle(), &request, None, &[], &[]).unwrap();

        assert_eq!(1, actual.pertinent_information3.len());
        assert_eq!(
            &Code::new(PRESCRIPTION_ENDORSEMENT, "SLS"),
            actual.pertinent_information3[0].value().value.as_ref().unwrap()
        );
    }

    #[test]
    fn multiple_notes_are_too_many_values() {
        let request = request(json!({
            "note": [ { "text": "a" }, { "text": "b" } ]
        }));

        let err = convert_line_item(&bundle(), &request, None, &[], &[]).unwrap_err();

        assert_eq!(Some("MedicationRequest.note"), err.fhir_path());
    }

    #[test]
    fn sequences_dosage_instructions() {
        let dosages: Vec<Dosage> = from_value(json!([
            { "sequence": 2, "text": "1 tablet daily" },
            { "sequence": 1, "text": "2 tablets daily" },
            { "sequence": 1, "text": "1 tablet as required" }
        ]))
        .unwrap();

        assert_eq!(
            "2 tablets daily, and 1 tablet as required, then 1 tablet daily",
            dosage_instructions(&dosages).unwrap()
        );
    }

    #[test]
    fn unsequenced_dosage_instructions_are_invalid() {
        let dosages: Vec<Dosage> = from_value(json!([
            { "sequence": 1, "text": "2 tablets daily" },
            { "text": "1 tablet as required" }
        ]))
        .unwrap();

        assert_eq!(
            Error::invalid(
                "Dosage instructions lacking complete sequencing",
                "MedicationRequest.dosageInstruction"
            ),
            dosage_instructions(&dosages).unwrap_err()
        );
        assert!(dosage_instructions(&[]).is_err());
    }

    #[test]
    fn parses_controlled_drug_words() {
        let actual = parse_additional_instructions("CD: twenty eight\nAdditional instructions");

        assert_eq!(
            AdditionalInstructions {
                medication: vec![],
                patient_info: vec![],
                controlled_drug_words: "twenty eight".into(),
                additional_instructions: "Additional instructions".into(),
            },
            actual
        );
    }

    #[test]
    fn parses_tags_in_any_order() {
        let actual = parse_additional_instructions(
            "<patientInfo>Review &amp; repeat</patientInfo><medication>Salbutamol</medication>Shake well",
        );

        assert_eq!(vec!["Salbutamol"], actual.medication);
        assert_eq!(vec!["Review & repeat"], actual.patient_info);
        assert_eq!("", actual.controlled_drug_words);
        assert_eq!("Shake well", actual.additional_instructions);
    }

    #[test]
    fn assembled_text_parses_back() {
        let instructions = AdditionalInstructions {
            medication: vec!["Aspirin <75mg>".into()],
            patient_info: vec![],
            controlled_drug_words: "ten".into(),
            additional_instructions: "With food".into(),
        };

        assert_eq!(instructions, parse_additional_instructions(&instructions.assemble()));
    }
}
