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

use crate::misc::{Coding, Reference};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Provenance {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub target: Vec<Reference>,

    #[serde(default)]
    pub recorded: Option<String>,

    #[serde(default)]
    pub signature: Vec<Signature>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Signature {
    #[serde(default, rename = "type")]
    pub type_: Vec<Coding>,

    #[serde(default)]
    pub when: Option<String>,

    #[serde(default)]
    pub who: Option<Reference>,

    #[serde(default)]
    pub data: Option<String>,
}
