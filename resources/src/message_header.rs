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

use crate::misc::{Coding, Extension, Reference};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub extension: Vec<Extension>,

    #[serde(default)]
    pub event_coding: Option<Coding>,

    #[serde(default)]
    pub sender: Option<Reference>,

    #[serde(default)]
    pub focus: Vec<Reference>,

    #[serde(default)]
    pub response: Option<Response>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Response {
    pub identifier: String,

    #[serde(default)]
    pub code: Option<String>,
}

/// Message event codes that select the interaction built from a bundle.
pub mod event_codes {
    pub const PRESCRIPTION: &str = "prescription-order";
    pub const CANCELLATION: &str = "prescription-order-update";
    pub const DISPENSE: &str = "dispense-notification";
}
