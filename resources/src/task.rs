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
    misc::{CodeableConcept, Extension, Identifier, Reference},
    Resource,
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub contained: Vec<Resource>,

    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub identifier: Vec<Identifier>,

    pub status: Status,

    #[serde(default)]
    pub status_reason: Option<CodeableConcept>,

    #[serde(default)]
    pub group_identifier: Option<Identifier>,

    #[serde(default)]
    pub focus: Option<Reference>,

    #[serde(default, rename = "for")]
    pub for_: Option<Reference>,

    #[serde(default)]
    pub authored_on: Option<String>,

    #[serde(default)]
    pub requester: Option<Reference>,

    #[serde(default)]
    pub owner: Option<Reference>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Draft,
    Requested,
    Received,
    Accepted,
    Rejected,
    Ready,
    Cancelled,
    InProgress,
    OnHold,
    Failed,
    Completed,
    EnteredInError,
}

impl Default for Status {
    fn default() -> Self {
        Self::Draft
    }
}
