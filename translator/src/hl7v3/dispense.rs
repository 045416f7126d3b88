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

use super::{
    agent::{AgentOrganization, Participant},
    codes::{Code, Identifier, ITEM_STATUS, NOT_DISPENSED_REASON, PRESCRIPTION_STATUS},
    core::{
        ActRef, Annotation, Interval, Null, NumericValue, QuantityInAlternativeUnits,
        Relationship, Timestamp,
    },
    line_item::{administration_code, dispensing_code, ManufacturedProduct},
    patient::Patient,
    prescription::{prescription_id, CareRecordElementCategory},
};

/// SNOMED code of dispense notification and claim messages.
pub fn dispensed_medication_code() -> Code {
    Code::snomed("163541000000107")
        .with_display("Dispensed Medication - FocusActOrEvent (administrative concept)")
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispenseNotification {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    pub code: Code,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Timestamp,

    #[serde(rename = "typeId")]
    pub type_id: Identifier,

    #[serde(rename = "recordTarget")]
    pub record_target: Relationship<Patient>,

    #[serde(rename = "primaryInformationRecipient")]
    pub primary_information_recipient: Relationship<AgentOrganization>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<SupplyHeader>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Relationship<CareRecordElementCategory>,

    #[serde(rename = "replacementOf")]
    pub replacement_of: Option<Relationship<ActRef>>,

    #[serde(rename = "sequelTo")]
    pub sequel_to: Relationship<ActRef>,
}

impl DispenseNotification {
    pub fn new(
        id: Identifier,
        effective_time: Timestamp,
        record_target: Relationship<Patient>,
        recipient: Identifier,
        supply_header: SupplyHeader,
        release_event_id: Identifier,
    ) -> Self {
        let category = CareRecordElementCategory::new(
            supply_header
                .supplied_line_items()
                .map(|item| ActRef::new("SBADM", "PRMS", item.id.clone())),
        );

        Self {
            class_code: "INFO",
            mood_code: "EVN",
            id,
            code: dispensed_medication_code(),
            effective_time,
            type_id: Identifier::type_id("PORX_MT024001UK31"),
            record_target,
            primary_information_recipient: Relationship::new(
                "PRCP",
                "AgentOrg",
                AgentOrganization::new(recipient),
            )
            .context_control("ON"),
            pertinent_information1: Relationship::new(
                "PERT",
                "pertinentSupplyHeader",
                supply_header,
            )
            .context_conduction(true)
            .template("CSAB_RM-NPfITUK10.pertinentInformation"),
            pertinent_information2: Relationship::new(
                "PERT",
                "pertinentCareRecordElementCategory",
                category,
            )
            .template("CSAB_RM-NPfITUK10.pertinentInformation1"),
            replacement_of: None,
            sequel_to: sequel_to(release_event_id),
        }
    }
}

/// Dispensed prescription: one supplied line item per prescribed item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SupplyHeader {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    pub code: Code,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Null,

    #[serde(rename = "repeatNumber")]
    pub repeat_number: Option<Interval<NumericValue>>,

    pub author: Participant,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Vec<Relationship<SuppliedLineItem>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Option<Relationship<Annotation<Code>>>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Relationship<Annotation<Code>>,

    #[serde(rename = "pertinentInformation4")]
    pub pertinent_information4: Relationship<Annotation<Identifier>>,

    #[serde(rename = "inFulfillmentOf")]
    pub in_fulfillment_of: Relationship<ActRef>,
}

impl SupplyHeader {
    pub fn new(
        id: Identifier,
        author: Participant,
        prescription_status: Relationship<Annotation<Code>>,
        short_form_id: &str,
        original_prescription_id: Identifier,
    ) -> Self {
        Self {
            class_code: "SBADM",
            mood_code: "EVN",
            id,
            code: Code::snomed("225426007"),
            effective_time: Null::NOT_APPLICABLE,
            repeat_number: None,
            author,
            pertinent_information1: Vec::new(),
            pertinent_information2: None,
            pertinent_information3: prescription_status,
            pertinent_information4: prescription_id(short_form_id),
            in_fulfillment_of: original_prescription_ref(original_prescription_id),
        }
    }

    pub fn supplied_line_items(&self) -> impl Iterator<Item = &SuppliedLineItem> {
        self.pertinent_information1.iter().map(Relationship::value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuppliedLineItem {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    pub code: Code,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Null,

    #[serde(rename = "repeatNumber")]
    pub repeat_number: Option<Interval<NumericValue>>,

    pub consumable: Relationship<ManufacturedProduct>,

    pub component: Vec<Relationship<SuppliedLineItemQuantity>>,

    pub component1: Relationship<SupplyRequest>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Relationship<Annotation<Code>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Option<Relationship<Annotation<Code>>>,

    #[serde(rename = "inFulfillmentOf")]
    pub in_fulfillment_of: Relationship<ActRef>,
}

impl SuppliedLineItem {
    pub fn new(
        id: Identifier,
        requested_medication: Code,
        requested_quantity: QuantityInAlternativeUnits,
        status: Relationship<Annotation<Code>>,
        original_item_id: Identifier,
    ) -> Self {
        Self {
            class_code: "SBADM",
            mood_code: "PRMS",
            id,
            code: administration_code(),
            effective_time: Null::NOT_APPLICABLE,
            repeat_number: None,
            consumable: Relationship::new(
                "CSM",
                "requestedManufacturedProduct",
                ManufacturedProduct::new("manufacturedRequestedMaterial", requested_medication),
            )
            .context_control("OP"),
            component: Vec::new(),
            component1: Relationship::new(
                "COMP",
                "supplyRequest",
                SupplyRequest {
                    class_code: "SPLY",
                    mood_code: "RQO",
                    code: dispensing_code(),
                    quantity: requested_quantity,
                },
            )
            .seperatable(false),
            pertinent_information3: status,
            pertinent_information2: None,
            in_fulfillment_of: original_item_ref(original_item_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SuppliedLineItemQuantity {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub code: Code,

    pub quantity: QuantityInAlternativeUnits,

    pub product: Relationship<ManufacturedProduct>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<Annotation<String>>,
}

impl SuppliedLineItemQuantity {
    pub fn new(
        quantity: QuantityInAlternativeUnits,
        medication: Code,
        supply_instructions: String,
    ) -> Self {
        Self {
            class_code: "SPLY",
            mood_code: "EVN",
            code: dispensing_code(),
            quantity,
            product: supplied_product(medication),
            pertinent_information1: Relationship::pertinent(
                "pertinentSupplyInstructions",
                false,
                Annotation::new("SI", supply_instructions),
            ),
        }
    }

    pub fn into_component(self) -> Relationship<SuppliedLineItemQuantity> {
        Relationship::new("COMP", "suppliedLineItemQuantity", self).seperatable(false)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SupplyRequest {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub code: Code,

    pub quantity: QuantityInAlternativeUnits,
}

pub fn supplied_product(medication: Code) -> Relationship<ManufacturedProduct> {
    Relationship::new(
        "PRD",
        "suppliedManufacturedProduct",
        ManufacturedProduct::new("manufacturedSuppliedMaterial", medication),
    )
    .context_control("OP")
}

pub fn item_status(code: &str, display: Option<&str>) -> Relationship<Annotation<Code>> {
    let status = Code::new(ITEM_STATUS, code).with_display_opt(display);

    Relationship::pertinent("pertinentItemStatus", false, Annotation::new("IS", status))
}

pub fn prescription_status(code: &str, display: Option<&str>) -> Relationship<Annotation<Code>> {
    let status = Code::new(PRESCRIPTION_STATUS, code).with_display_opt(display);

    Relationship::pertinent(
        "pertinentPrescriptionStatus",
        false,
        Annotation::new("PS", status),
    )
}

pub fn non_dispensing_reason(code: &str, display: Option<&str>) -> Relationship<Annotation<Code>> {
    Relationship::pertinent(
        "pertinentNonDispensingReason",
        false,
        Annotation::new(
            "NDR",
            Code::new(NOT_DISPENSED_REASON, code).with_display_opt(display),
        ),
    )
}

pub fn original_prescription_ref(id: Identifier) -> Relationship<ActRef> {
    fulfillment("priorOriginalPrescriptionRef", id)
}

pub fn original_item_ref(id: Identifier) -> Relationship<ActRef> {
    fulfillment("priorOriginalItemRef", id)
}

fn fulfillment(name: &'static str, id: Identifier) -> Relationship<ActRef> {
    Relationship::new("FLFS", name, ActRef::new("SBADM", "RQO", id))
        .inversion(false)
        .negation(false)
        .seperatable(true)
        .template("CSAB_RM-NPfITUK10.sourceOf1")
}

/// Line item of a supply header, either supplied or claimed.
pub fn supplied_line_item<T>(item: T) -> Relationship<T> {
    Relationship::new("PERT", "pertinentSuppliedLineItem", item)
        .context_conduction(true)
        .inversion(false)
        .negation(false)
        .seperatable(false)
        .template("CSAB_RM-NPfITUK10.sourceOf2")
}

pub fn replacement_of(message_id: Identifier) -> Relationship<ActRef> {
    Relationship::new("RPLC", "priorMessageRef", ActRef::new("INFO", "EVN", message_id))
}

pub fn sequel_to(release_event_id: Identifier) -> Relationship<ActRef> {
    Relationship::new(
        "SEQL",
        "priorPrescriptionReleaseEventRef",
        ActRef::new("INFO", "RQO", release_event_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::xml::{ser::to_string, test::trim_xml_str};

    #[test]
    fn serialize_fulfillment_references() {
        #[derive(Serialize)]
        struct SupplyHeader {
            #[serde(rename = "inFulfillmentOf")]
            in_fulfillment_of: Relationship<ActRef>,

            #[serde(rename = "sequelTo")]
            sequel_to: Relationship<ActRef>,
        }

        let header = SupplyHeader {
            in_fulfillment_of: original_prescription_ref(Identifier::global(
                "a5b9dc81-ccf4-4dab-b887-3d88e557febb",
            )),
            sequel_to: sequel_to(Identifier::global("c0b6f1bd-8fa8-4ba9-9df3-5e5a4cfb0a73")),
        };

        let actual = trim_xml_str(&to_string(&header).unwrap());
        let expected = trim_xml_str(
            r##"
            <SupplyHeader>
                <inFulfillmentOf typeCode="FLFS" inversionInd="false" negationInd="false">
                    <seperatableInd value="true"/>
                    <templateId root="2.16.840.1.113883.2.1.3.2.4.18.2" extension="CSAB_RM-NPfITUK10.sourceOf1"/>
                    <priorOriginalPrescriptionRef classCode="SBADM" moodCode="RQO">
                        <id root="A5B9DC81-CCF4-4DAB-B887-3D88E557FEBB"/>
                    </priorOriginalPrescriptionRef>
                </inFulfillmentOf>
                <sequelTo typeCode="SEQL">
                    <priorPrescriptionReleaseEventRef classCode="INFO" moodCode="RQO">
                        <id root="C0B6F1BD-8FA8-4BA9-9DF3-5E5A4CFB0A73"/>
                    </priorPrescriptionReleaseEventRef>
                </sequelTo>
            </SupplyHeader>
        "##,
        );

        assert_eq!(actual, expected);
    }

    #[test]
    fn serialize_supplied_quantity() {
        #[derive(Serialize)]
        struct SuppliedLineItem {
            component: Vec<Relationship<SuppliedLineItemQuantity>>,
        }

        let quantity = QuantityInAlternativeUnits::new(
            "28".into(),
            "28".into(),
            Code::snomed("3317411000001100").with_display("dose"),
        );
        let item = SuppliedLineItem {
            component: vec![SuppliedLineItemQuantity::new(
                quantity,
                Code::snomed("39720311000001101").with_display("Paracetamol 500mg soluble tablets"),
                "1 tablet - once a day".into(),
            )
            .into_component()],
        };

        let actual = trim_xml_str(&to_string(&item).unwrap());
        let expected = trim_xml_str(
            r##"
            <SuppliedLineItem>
                <component typeCode="COMP">
                    <seperatableInd value="false"/>
                    <suppliedLineItemQuantity classCode="SPLY" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.15" code="373784005" displayName="Dispensing medication (procedure)"/>
                        <quantity value="28" unit="1">
                            <translation value="28" codeSystem="2.16.840.1.113883.2.1.3.2.4.15" code="3317411000001100" displayName="dose"/>
                        </quantity>
                        <product typeCode="PRD" contextControlCode="OP">
                            <suppliedManufacturedProduct classCode="MANU">
                                <manufacturedSuppliedMaterial classCode="MMAT" determinerCode="KIND">
                                    <code codeSystem="2.16.840.1.113883.2.1.3.2.4.15" code="39720311000001101" displayName="Paracetamol 500mg soluble tablets"/>
                                </manufacturedSuppliedMaterial>
                            </suppliedManufacturedProduct>
                        </product>
                        <pertinentInformation1 typeCode="PERT" contextConductionInd="true">
                            <seperatableInd value="false"/>
                            <pertinentSupplyInstructions classCode="OBS" moodCode="EVN">
                                <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="SI"/>
                                <value>1 tablet - once a day</value>
                            </pertinentSupplyInstructions>
                        </pertinentInformation1>
                    </suppliedLineItemQuantity>
                </component>
            </SuppliedLineItem>
        "##,
        );

        assert_eq!(actual, expected);
    }
}
