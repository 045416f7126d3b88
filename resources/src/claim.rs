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
    misc::{CodeableConcept, Extension, Identifier, Quantity, Reference},
    Resource,
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub contained: Vec<Resource>,

    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub identifier: Vec<Identifier>,

    #[serde(default)]
    pub created: Option<String>,

    #[serde(default)]
    pub patient: Option<Reference>,

    #[serde(default)]
    pub provider: Option<Reference>,

    #[serde(default)]
    pub prescription: Option<ClaimPrescription>,

    #[serde(default)]
    pub insurance: Vec<Insurance>,

    #[serde(default)]
    pub item: Vec<ClaimItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ClaimPrescription {
    #[serde(default)]
    pub extension: Vec<Extension>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Insurance {
    pub coverage: Reference,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimItem {
    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub program_code: Vec<CodeableConcept>,

    #[serde(default)]
    pub detail: Vec<ClaimItemDetail>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimItemDetail {
    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub modifier: Vec<CodeableConcept>,

    #[serde(default)]
    pub program_code: Vec<CodeableConcept>,

    #[serde(default)]
    pub sub_detail: Vec<ClaimItemSubDetail>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimItemSubDetail {
    #[serde(default)]
    pub product_or_service: CodeableConcept,

    #[serde(default)]
    pub quantity: Option<Quantity>,
}
