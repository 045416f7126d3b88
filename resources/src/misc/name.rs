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

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct HumanName {
    #[serde(default, rename = "use")]
    pub use_: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub family: Option<String>,

    #[serde(default)]
    pub given: Vec<String>,

    #[serde(default)]
    pub prefix: Vec<String>,

    #[serde(default)]
    pub suffix: Vec<String>,
}
