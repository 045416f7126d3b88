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

use crate::{misc::Identifier, Resource};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Parameters {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub parameter: Vec<Parameter>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,

    #[serde(default)]
    pub value_identifier: Option<Identifier>,

    #[serde(default)]
    pub value_string: Option<String>,

    #[serde(default)]
    pub resource: Option<Resource>,
}
