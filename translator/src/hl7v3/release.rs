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

use serde::Serialize;

use super::{
    agent::Participant,
    codes::Identifier,
    core::{Annotation, Relationship, Timestamp},
    prescription::prescription_id,
};

/// Request to release the prescriptions nominated to a dispensing site.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NominatedPrescriptionReleaseRequest {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Timestamp,

    pub author: Participant,
}

impl NominatedPrescriptionReleaseRequest {
    pub fn new(id: Identifier, effective_time: Timestamp, author: Participant) -> Self {
        Self {
            class_code: "INFO",
            mood_code: "RQO",
            id,
            effective_time,
            author,
        }
    }
}

/// Request to release a single prescription presented by the patient.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientPrescriptionReleaseRequest {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Timestamp,

    pub author: Participant,

    #[serde(rename = "pertinentInformation")]
    pub pertinent_information: Relationship<Annotation<Identifier>>,
}

impl PatientPrescriptionReleaseRequest {
    pub fn new(
        id: Identifier,
        effective_time: Timestamp,
        author: Participant,
        short_form_id: &str,
    ) -> Self {
        Self {
            class_code: "INFO",
            mood_code: "RQO",
            id,
            effective_time,
            author,
            pertinent_information: prescription_id(short_form_id),
        }
    }
}
