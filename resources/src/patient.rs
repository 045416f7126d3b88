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

use crate::misc::{Address, ContactPoint, Extension, HumanName, Identifier, Reference};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub identifier: Vec<Identifier>,

    #[serde(default)]
    pub name: Vec<HumanName>,

    #[serde(default)]
    pub telecom: Vec<ContactPoint>,

    #[serde(default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub birth_date: Option<String>,

    #[serde(default)]
    pub address: Vec<Address>,

    #[serde(default)]
    pub general_practitioner: Vec<Reference>,
}
