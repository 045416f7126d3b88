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
    codes::{Code, Identifier, CHARGE_EXEMPTION, DISPENSING_ENDORSEMENT, PRESCRIPTION_ANNOTATION},
    core::{
        ActRef, Annotation, BooleanValue, Interval, Null, NumericValue,
        QuantityInAlternativeUnits, Relationship, Timestamp,
    },
    dispense::{dispensed_medication_code, original_prescription_ref, sequel_to, supplied_product},
    line_item::{administration_code, dispensing_code, ManufacturedProduct},
    prescription::prescription_id,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispenseClaim {
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

    #[serde(rename = "primaryInformationRecipient")]
    pub primary_information_recipient: Relationship<AgentOrganization>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<ClaimSupplyHeader>,

    #[serde(rename = "replacementOf")]
    pub replacement_of: Option<Relationship<ActRef>>,

    pub coverage: Option<Relationship<ChargeExempt>>,

    #[serde(rename = "sequelTo")]
    pub sequel_to: Relationship<ActRef>,
}

impl DispenseClaim {
    pub fn new(
        id: Identifier,
        effective_time: Timestamp,
        recipient: Identifier,
        supply_header: ClaimSupplyHeader,
        charge_exempt: Option<ChargeExempt>,
        release_event_id: Identifier,
    ) -> Self {
        Self {
            class_code: "INFO",
            mood_code: "EVN",
            id,
            code: dispensed_medication_code(),
            effective_time,
            type_id: Identifier::type_id("PORX_MT142001UK31"),
            primary_information_recipient: Relationship::new(
                "PRCP",
                "AgentOrg",
                AgentOrganization::new(recipient),
            ),
            pertinent_information1: Relationship::new(
                "PERT",
                "pertinentSupplyHeader",
                supply_header,
            )
            .context_conduction(true)
            .template("CSAB_RM-NPfITUK10.pertinentInformation"),
            replacement_of: None,
            coverage: charge_exempt.map(coverage),
            sequel_to: sequel_to(release_event_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimSupplyHeader {
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

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Vec<Relationship<ClaimLineItem>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Option<Relationship<Annotation<Code>>>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Relationship<Annotation<Code>>,

    #[serde(rename = "pertinentInformation4")]
    pub pertinent_information4: Relationship<Annotation<Identifier>>,

    #[serde(rename = "inFulfillmentOf")]
    pub in_fulfillment_of: Relationship<ActRef>,

    #[serde(rename = "legalAuthenticator")]
    pub legal_authenticator: Participant,
}

impl ClaimSupplyHeader {
    pub fn new(
        id: Identifier,
        legal_authenticator: Participant,
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
            pertinent_information1: Vec::new(),
            pertinent_information2: None,
            pertinent_information3: prescription_status,
            pertinent_information4: prescription_id(short_form_id),
            in_fulfillment_of: original_prescription_ref(original_prescription_id),
            legal_authenticator,
        }
    }

    pub fn line_items(&self) -> impl Iterator<Item = &ClaimLineItem> {
        self.pertinent_information1.iter().map(Relationship::value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimLineItem {
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

    pub component: Vec<Relationship<ClaimLineItemQuantity>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Option<Relationship<Annotation<Code>>>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Relationship<Annotation<Code>>,

    #[serde(rename = "inFulfillmentOf")]
    pub in_fulfillment_of: Relationship<ActRef>,
}

impl ClaimLineItem {
    pub fn new(
        id: Identifier,
        status: Relationship<Annotation<Code>>,
        in_fulfillment_of: Relationship<ActRef>,
    ) -> Self {
        Self {
            class_code: "SBADM",
            mood_code: "PRMS",
            id,
            code: administration_code(),
            effective_time: Null::NOT_APPLICABLE,
            repeat_number: None,
            component: Vec::new(),
            pertinent_information2: None,
            pertinent_information3: status,
            in_fulfillment_of,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClaimLineItemQuantity {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub code: Code,

    pub quantity: QuantityInAlternativeUnits,

    pub product: Relationship<ManufacturedProduct>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<Annotation<BooleanValue>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Vec<Relationship<Annotation<Code>>>,
}

impl ClaimLineItemQuantity {
    pub fn new(quantity: QuantityInAlternativeUnits, medication: Code, charge_paid: bool) -> Self {
        Self {
            class_code: "SPLY",
            mood_code: "EVN",
            code: dispensing_code(),
            quantity,
            product: supplied_product(medication),
            pertinent_information1: Relationship::pertinent(
                "pertinentChargePayment",
                false,
                Annotation::new("CP", BooleanValue::from(charge_paid)),
            ),
            pertinent_information2: Vec::new(),
        }
    }

    pub fn with_endorsement(mut self, code: &str, text: Option<&str>) -> Self {
        let mut endorsement = Annotation::new("DE", Code::new(DISPENSING_ENDORSEMENT, code));
        endorsement.text = text.map(ToOwned::to_owned);

        self.pertinent_information2.push(Relationship::pertinent(
            "pertinentDispensingEndorsement",
            true,
            endorsement,
        ));

        self
    }

    pub fn into_component(self) -> Relationship<ClaimLineItemQuantity> {
        Relationship::new("COMP", "suppliedLineItemQuantity", self).seperatable(false)
    }
}

/// Charge exemption of the claim, optionally with the evidence seen by the
/// dispenser.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChargeExempt {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    #[serde(rename = "attrib=negationInd")]
    pub negation_ind: bool,

    pub code: Code,

    pub value: Code,

    pub authorization: Option<Relationship<Annotation<Code>>>,
}

impl ChargeExempt {
    pub fn new(exempt: bool, exemption: &str) -> Self {
        Self {
            class_code: "OBS",
            mood_code: "EVN",
            negation_ind: !exempt,
            code: Code::new(PRESCRIPTION_ANNOTATION, "EX"),
            value: Code::new(CHARGE_EXEMPTION, exemption),
            authorization: None,
        }
    }

    pub fn with_evidence_seen(mut self, seen: bool) -> Self {
        self.authorization = Some(
            Relationship::new(
                "AUTH",
                "authorizingEvidenceSeen",
                Annotation::empty("ES").negated(!seen),
            )
            .context_conduction(true)
            .seperatable(false),
        );

        self
    }
}

pub fn coverage(charge_exempt: ChargeExempt) -> Relationship<ChargeExempt> {
    Relationship::new("COVBY", "coveringChargeExempt", charge_exempt)
        .context_conduction(true)
        .seperatable(false)
}
