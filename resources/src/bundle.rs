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

use serde::{de::Error as DeError, Deserialize, Deserializer};
use serde_json::{from_value, Value};

use crate::{
    misc::Identifier, Claim, CommunicationRequest, HealthcareService, List, Location, Medication,
    MedicationDispense, MedicationRequest, MessageHeader, Organization, Parameters, Patient,
    Practitioner, PractitionerRole, Provenance, Task,
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub identifier: Option<Identifier>,

    #[serde(default, rename = "type")]
    pub type_: Option<String>,

    #[serde(default)]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default)]
    pub full_url: Option<String>,

    pub resource: Resource,
}

/// Inbound resource, discriminated by its `resourceType`.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    Bundle(Box<Bundle>),
    Claim(Claim),
    CommunicationRequest(CommunicationRequest),
    HealthcareService(HealthcareService),
    List(List),
    Location(Location),
    Medication(Medication),
    MedicationDispense(MedicationDispense),
    MedicationRequest(MedicationRequest),
    MessageHeader(MessageHeader),
    Organization(Organization),
    Parameters(Parameters),
    Patient(Patient),
    Practitioner(Practitioner),
    PractitionerRole(PractitionerRole),
    Provenance(Provenance),
    Task(Task),
    Other(String),
}

impl Resource {
    pub fn resource_type(&self) -> &str {
        match self {
            Self::Bundle(_) => "Bundle",
            Self::Claim(_) => "Claim",
            Self::CommunicationRequest(_) => "CommunicationRequest",
            Self::HealthcareService(_) => "HealthcareService",
            Self::List(_) => "List",
            Self::Location(_) => "Location",
            Self::Medication(_) => "Medication",
            Self::MedicationDispense(_) => "MedicationDispense",
            Self::MedicationRequest(_) => "MedicationRequest",
            Self::MessageHeader(_) => "MessageHeader",
            Self::Organization(_) => "Organization",
            Self::Parameters(_) => "Parameters",
            Self::Patient(_) => "Patient",
            Self::Practitioner(_) => "Practitioner",
            Self::PractitionerRole(_) => "PractitionerRole",
            Self::Provenance(_) => "Provenance",
            Self::Task(_) => "Task",
            Self::Other(resource_type) => resource_type,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Bundle(r) => r.id.as_deref(),
            Self::Claim(r) => r.id.as_deref(),
            Self::CommunicationRequest(r) => r.id.as_deref(),
            Self::HealthcareService(r) => r.id.as_deref(),
            Self::List(r) => r.id.as_deref(),
            Self::Location(r) => r.id.as_deref(),
            Self::Medication(r) => r.id.as_deref(),
            Self::MedicationDispense(r) => r.id.as_deref(),
            Self::MedicationRequest(r) => r.id.as_deref(),
            Self::MessageHeader(r) => r.id.as_deref(),
            Self::Organization(r) => r.id.as_deref(),
            Self::Parameters(r) => r.id.as_deref(),
            Self::Patient(r) => r.id.as_deref(),
            Self::Practitioner(r) => r.id.as_deref(),
            Self::PractitionerRole(r) => r.id.as_deref(),
            Self::Provenance(r) => r.id.as_deref(),
            Self::Task(r) => r.id.as_deref(),
            Self::Other(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let resource_type = value
            .get("resourceType")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field("resourceType"))?
            .to_owned();

        macro_rules! variant {
            ($variant:ident) => {
                from_value(value)
                    .map(Resource::$variant)
                    .map_err(D::Error::custom)
            };
        }

        match resource_type.as_str() {
            "Bundle" => from_value(value)
                .map(|bundle| Resource::Bundle(Box::new(bundle)))
                .map_err(D::Error::custom),
            "Claim" => variant!(Claim),
            "CommunicationRequest" => variant!(CommunicationRequest),
            "HealthcareService" => variant!(HealthcareService),
            "List" => variant!(List),
            "Location" => variant!(Location),
            "Medication" => variant!(Medication),
            "MedicationDispense" => variant!(MedicationDispense),
            "MedicationRequest" => variant!(MedicationRequest),
            "MessageHeader" => variant!(MessageHeader),
            "Organization" => variant!(Organization),
            "Parameters" => variant!(Parameters),
            "Patient" => variant!(Patient),
            "Practitioner" => variant!(Practitioner),
            "PractitionerRole" => variant!(PractitionerRole),
            "Provenance" => variant!(Provenance),
            "Task" => variant!(Task),
            _ => Ok(Resource::Other(resource_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::primitives::Decimal;

    #[test]
    fn dispatches_on_resource_type() {
        let bundle: Bundle = serde_json::from_str(
            r#"{
                "resourceType": "Bundle",
                "identifier": { "system": "https://tools.ietf.org/html/rfc4122", "value": "aef77afb-7e3c-427a-8657-2c427f71a272" },
                "entry": [
                    {
                        "fullUrl": "urn:uuid:1",
                        "resource": { "resourceType": "Patient", "gender": "female" }
                    },
                    {
                        "fullUrl": "urn:uuid:2",
                        "resource": { "resourceType": "Binary", "id": "x" }
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(2, bundle.entry.len());
        match &bundle.entry[0].resource {
            Resource::Patient(patient) => assert_eq!(Some("female"), patient.gender.as_deref()),
            other => panic!("Unexpected resource: {:?}", other),
        }
        assert_eq!("Binary", bundle.entry[1].resource.resource_type());
    }

    #[test]
    fn keeps_decimals_in_nested_resources() {
        let resource: Resource = serde_json::from_str(
            r#"{
                "resourceType": "MedicationRequest",
                "dispenseRequest": {
                    "quantity": { "value": 28.000, "unit": "tablet" }
                }
            }"#,
        )
        .unwrap();

        let request = match resource {
            Resource::MedicationRequest(request) => request,
            other => panic!("Unexpected resource: {:?}", other),
        };
        let quantity = request.dispense_request.unwrap().quantity.unwrap();
        assert_eq!(Some(Decimal::from("28.000")), quantity.value);
    }

    #[test]
    fn missing_resource_type_fails() {
        assert!(serde_json::from_str::<Resource>(r#"{ "id": "x" }"#).is_err());
    }
}
