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
    codes::{Code, Identifier},
    core::{
        ActRef, Annotation, BooleanValue, Interval, IntervalUnanchored, Null, NumericValue,
        Relationship, Timestamp,
    },
    line_item::LineItem,
    patient::Patient,
};

/// Parent prescription: the common administration part of every item on a
/// prescription, plus the patient it is prescribed for.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParentPrescription {
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

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<Prescription>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Relationship<CareRecordElementCategory>,
}

impl ParentPrescription {
    pub fn new(
        id: Identifier,
        effective_time: Timestamp,
        record_target: Relationship<Patient>,
        prescription: Prescription,
    ) -> Self {
        let category = CareRecordElementCategory::new(
            prescription
                .line_items()
                .map(|line_item| ActRef::new("SBADM", "RQO", line_item.id.clone())),
        );

        Self {
            class_code: "INFO",
            mood_code: "EVN",
            id,
            code: Code::snomed("163501000000109")
                .with_display("Prescription - FocusActOrEvent (record artifact)"),
            effective_time,
            type_id: Identifier::type_id("PORX_MT132004UK31"),
            record_target,
            pertinent_information1: Relationship::new("PERT", "pertinentPrescription", prescription)
                .context_conduction(true)
                .template("CSAB_RM-NPfITUK10.pertinentInformation"),
            pertinent_information2: Relationship::new(
                "PERT",
                "pertinentCareRecordElementCategory",
                category,
            )
            .template("CSAB_RM-NPfITUK10.pertinentInformation1"),
        }
    }

    pub fn prescription(&self) -> &Prescription {
        self.pertinent_information1.value()
    }
}

/// Groups the clinical statements of a message into a care record element
/// category.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CareRecordElementCategory {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub code: Code,

    pub component: Vec<Relationship<ActRef>>,
}

impl CareRecordElementCategory {
    pub fn new<I: IntoIterator<Item = ActRef>>(act_refs: I) -> Self {
        Self {
            class_code: "CATEGORY",
            mood_code: "EVN",
            code: Code::snomed("185361000000102")
                .with_display("Medication - care record element (record artifact)"),
            component: act_refs
                .into_iter()
                .map(|act_ref| Relationship::new("COMP", "actRef", act_ref))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prescription {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    /// Global id followed by the short form prescription id.
    pub id: Vec<Identifier>,

    pub code: Code,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Null,

    #[serde(rename = "repeatNumber")]
    pub repeat_number: Option<Interval<NumericValue>>,

    pub performer: Option<Relationship<AgentOrganization>>,

    pub author: Participant,

    #[serde(rename = "responsibleParty")]
    pub responsible_party: Participant,

    pub component1: Option<Relationship<DaysSupply>>,

    #[serde(rename = "pertinentInformation7")]
    pub pertinent_information7: Option<Relationship<Annotation<Timestamp>>>,

    #[serde(rename = "pertinentInformation5")]
    pub pertinent_information5: Relationship<Annotation<Code>>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<Annotation<Code>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Vec<Relationship<LineItem>>,

    #[serde(rename = "pertinentInformation8")]
    pub pertinent_information8: Relationship<Annotation<BooleanValue>>,

    #[serde(rename = "pertinentInformation4")]
    pub pertinent_information4: Relationship<Annotation<Code>>,
}

impl Prescription {
    pub fn line_items(&self) -> impl Iterator<Item = &LineItem> {
        self.pertinent_information2.iter().map(Relationship::value)
    }

    pub fn short_form_id(&self) -> Option<&str> {
        self.id.get(1).and_then(|id| id.extension.as_deref())
    }
}

pub fn performer(organization: Identifier) -> Relationship<AgentOrganization> {
    Relationship::new("PRF", "AgentOrgSDS", AgentOrganization::new(organization))
        .context_control("OP")
}

pub fn treatment_type(code: Code) -> Relationship<Annotation<Code>> {
    Relationship::pertinent(
        "pertinentPrescriptionTreatmentType",
        false,
        Annotation::new("PTT", code),
    )
}

pub fn dispensing_site_preference(code: Code) -> Relationship<Annotation<Code>> {
    Relationship::pertinent(
        "pertinentDispensingSitePreference",
        true,
        Annotation::new("DSP", code),
    )
}

pub fn prescription_type(code: Code) -> Relationship<Annotation<Code>> {
    Relationship::pertinent("pertinentPrescriptionType", false, Annotation::new("PT", code))
}

pub fn review_date(date: Timestamp) -> Relationship<Annotation<Timestamp>> {
    Relationship::pertinent("pertinentReviewDate", false, Annotation::new("RD", date))
}

pub fn token_issued(issued: bool) -> Relationship<Annotation<BooleanValue>> {
    Relationship::pertinent(
        "pertinentTokenIssued",
        false,
        Annotation::new("TI", BooleanValue::from(issued)),
    )
}

/// Short form prescription id annotation (`PID`).
pub fn prescription_id<T: Into<String>>(short_form_id: T) -> Relationship<Annotation<Identifier>> {
    Relationship::pertinent(
        "pertinentPrescriptionID",
        false,
        Annotation::new("PID", Identifier::short_form(short_form_id)),
    )
}

pub fn line_item(line_item: LineItem) -> Relationship<LineItem> {
    Relationship::new("PERT", "pertinentLineItem", line_item)
        .inversion(false)
        .context_conduction(true)
        .negation(false)
        .seperatable(true)
        .template("CSAB_RM-NPfITUK10.sourceOf2")
}

/// Supply part of a prescription: the validity period and expected supply
/// duration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DaysSupply {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub code: Code,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Option<Interval<Timestamp>>,

    #[serde(rename = "expectedUseTime")]
    pub expected_use_time: Option<IntervalUnanchored>,
}

impl DaysSupply {
    pub fn new(
        effective_time: Option<Interval<Timestamp>>,
        expected_use_time: Option<IntervalUnanchored>,
    ) -> Self {
        Self {
            class_code: "SPLY",
            mood_code: "RQO",
            code: Code::snomed("373784005").with_display("Dispensing medication (procedure)"),
            effective_time,
            expected_use_time,
        }
    }

    pub fn into_component(self) -> Relationship<DaysSupply> {
        Relationship::new("COMP", "daysSupply", self).seperatable(true)
    }
}
