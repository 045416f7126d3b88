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
    misc::{CodeableConcept, Extension, Identifier, Quantity, Reference},
    Resource,
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationDispense {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub contained: Vec<Resource>,

    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub identifier: Vec<Identifier>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub status_reason_codeable_concept: Option<CodeableConcept>,

    #[serde(default)]
    pub medication_codeable_concept: Option<CodeableConcept>,

    #[serde(default)]
    pub medication_reference: Option<Reference>,

    #[serde(default)]
    pub subject: Option<Reference>,

    #[serde(default)]
    pub performer: Vec<Performer>,

    #[serde(default)]
    pub authorizing_prescription: Vec<Reference>,

    #[serde(default, rename = "type")]
    pub type_: Option<CodeableConcept>,

    #[serde(default)]
    pub quantity: Option<Quantity>,

    #[serde(default)]
    pub when_prepared: Option<String>,

    #[serde(default)]
    pub when_handed_over: Option<String>,

    #[serde(default)]
    pub dosage_instruction: Vec<Dosage>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Performer {
    pub actor: Reference,
}
