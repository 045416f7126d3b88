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
    codes::{Code, Identifier, PATIENT_CARE_PROVISION_TYPE},
    core::{Address, Name, Relationship, Telecom, Timestamp},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Patient {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    pub id: Identifier,

    pub addr: Vec<Address>,

    pub telecom: Vec<Telecom>,

    #[serde(rename = "patientPerson")]
    pub patient_person: Option<PatientPerson>,
}

impl Patient {
    pub fn new(id: Identifier) -> Self {
        Self {
            class_code: "PAT",
            id,
            addr: Vec::new(),
            telecom: Vec::new(),
            patient_person: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientPerson {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=determinerCode")]
    pub determiner_code: &'static str,

    pub name: Vec<Name>,

    #[serde(rename = "administrativeGenderCode")]
    pub administrative_gender_code: Code,

    #[serde(rename = "birthTime")]
    pub birth_time: Timestamp,

    #[serde(rename = "playedProviderPatient")]
    pub played_provider_patient: ProviderPatient,
}

impl PatientPerson {
    pub fn new(
        name: Vec<Name>,
        administrative_gender_code: Code,
        birth_time: Timestamp,
        general_practitioner: Identifier,
    ) -> Self {
        Self {
            class_code: "PSN",
            determiner_code: "INSTANCE",
            name,
            administrative_gender_code,
            birth_time,
            played_provider_patient: ProviderPatient::new(general_practitioner),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProviderPatient {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "subjectOf")]
    pub subject_of: Relationship<PatientCareProvision>,
}

impl ProviderPatient {
    fn new(general_practitioner: Identifier) -> Self {
        let provider = HealthCareProvider {
            class_code: "PROV",
            id: general_practitioner,
        };

        let provision = PatientCareProvision {
            class_code: "PCPR",
            mood_code: "EVN",
            code: Code::new(PATIENT_CARE_PROVISION_TYPE, "1"),
            responsible_party: Relationship::new("RESP", "healthCareProvider", provider),
        };

        Self {
            class_code: "PAT",
            subject_of: Relationship::new("SBJ", "patientCareProvision", provision),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientCareProvision {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub code: Code,

    #[serde(rename = "responsibleParty")]
    pub responsible_party: Relationship<HealthCareProvider>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthCareProvider {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    pub id: Identifier,
}

/// `recordTarget` carrying the full patient demographics.
pub fn record_target(patient: Patient) -> Relationship<Patient> {
    Relationship::new("RCT", "Patient", patient)
}

/// `recordTarget` referencing the patient by NHS number only.
pub fn record_target_reference(nhs_number: &str) -> Relationship<Patient> {
    Relationship::new("RCT", "patient", Patient::new(Identifier::nhs_number(nhs_number)))
}
