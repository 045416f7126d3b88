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

use crate::misc::{ContactPoint, Identifier, Reference};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthcareService {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub identifier: Vec<Identifier>,

    #[serde(default)]
    pub provided_by: Option<Reference>,

    #[serde(default)]
    pub location: Vec<Reference>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub telecom: Vec<ContactPoint>,
}
