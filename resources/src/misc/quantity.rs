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

use crate::primitives::Decimal;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Quantity {
    #[serde(default)]
    pub value: Option<Decimal>,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub system: Option<String>,

    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Range {
    #[serde(default)]
    pub low: Option<Quantity>,

    #[serde(default)]
    pub high: Option<Quantity>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Ratio {
    #[serde(default)]
    pub numerator: Option<Quantity>,

    #[serde(default)]
    pub denominator: Option<Quantity>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Period {
    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub end: Option<String>,
}
