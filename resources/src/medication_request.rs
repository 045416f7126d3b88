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

use serde::Deserialize;

use crate::{
    dosage::Dosage,
    misc::{CodeableConcept, Extension, Identifier, Period, Quantity, Reference},
    primitives::Decimal,
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationRequest {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub identifier: Vec<Identifier>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub status_reason: Option<CodeableConcept>,

    #[serde(default)]
    pub intent: Option<String>,

    #[serde(default)]
    pub category: Vec<CodeableConcept>,

    #[serde(default)]
    pub medication_codeable_concept: Option<CodeableConcept>,

    #[serde(default)]
    pub medication_reference: Option<Reference>,

    #[serde(default)]
    pub subject: Option<Reference>,

    #[serde(default)]
    pub authored_on: Option<String>,

    #[serde(default)]
    pub requester: Option<Reference>,

    #[serde(default)]
    pub group_identifier: Option<GroupIdentifier>,

    #[serde(default)]
    pub course_of_therapy_type: Option<CodeableConcept>,

    #[serde(default)]
    pub note: Vec<Annotation>,

    #[serde(default)]
    pub dosage_instruction: Vec<Dosage>,

    #[serde(default)]
    pub dispense_request: Option<DispenseRequest>,

    #[serde(default)]
    pub based_on: Vec<BasedOn>,
}

/// Prescription identifier shared by all line items of one prescription;
/// carries the long form id as an extension.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GroupIdentifier {
    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Annotation {
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseRequest {
    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub validity_period: Option<Period>,

    #[serde(default)]
    pub number_of_repeats_allowed: Option<Decimal>,

    #[serde(default)]
    pub quantity: Option<Quantity>,

    #[serde(default)]
    pub expected_supply_duration: Option<Quantity>,

    #[serde(default)]
    pub performer: Option<Reference>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BasedOn {
    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub identifier: Option<Identifier>,
}
