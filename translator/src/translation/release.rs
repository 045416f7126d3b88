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

use resources::Parameters;
use uuid::Uuid;

use crate::hl7v3::{
    agent::{AgentPerson, AgentPersonPerson, Organization, Participant},
    codes::{Code, Identifier, ORGANIZATION_TYPE, SDS_JOB_ROLE},
    core::{Name, Telecom, TelecomUse},
    release::{NominatedPrescriptionReleaseRequest, PatientPrescriptionReleaseRequest},
    Payload,
};

use super::{
    dates::now,
    resolve::{identifier_parameter, identifier_parameter_or_none},
    Error,
};

const OWNER_PARAMETER: &str = "owner";
const GROUP_IDENTIFIER_PARAMETER: &str = "group-identifier";

const PLACEHOLDER_ROLE_PROFILE: &str = "100102238986";
const PLACEHOLDER_JOB_ROLE: &str = "R8000";
const PLACEHOLDER_TELECOM: &str = "01234567890";
const PLACEHOLDER_PROFESSIONAL_CODE: &str = "G9999999";
const UNSPECIFIED_ORGANIZATION_TYPE: &str = "999";

/// Release request of a dispensing site. A `group-identifier` parameter
/// releases the single prescription presented by the patient, otherwise all
/// prescriptions nominated to the owner are released.
pub fn convert_release_request(parameters: &Parameters) -> Result<Payload, Error> {
    let owner = identifier_parameter(parameters, OWNER_PARAMETER)?;

    let id = Identifier::global(&Uuid::new_v4().to_string());
    let author = release_author(&owner.value);

    match identifier_parameter_or_none(parameters, GROUP_IDENTIFIER_PARAMETER)? {
        Some(group_identifier) => Ok(Payload::PatientRelease(PatientPrescriptionReleaseRequest::new(
            id,
            now(),
            author,
            &group_identifier.value,
        ))),
        None => Ok(Payload::NominatedRelease(NominatedPrescriptionReleaseRequest::new(
            id,
            now(),
            author,
        ))),
    }
}

/// Author of a release request. The user is a fixed placeholder acting for
/// the owner organization.
fn release_author(ods_code: &str) -> Participant {
    let mut person =
        AgentPersonPerson::new(Identifier::professional_code(PLACEHOLDER_PROFESSIONAL_CODE));
    person.name = Some(Name {
        prefix: vec!["DR".into()],
        given: vec!["Thomas".into()],
        family: Some("Edwards".into()),
        ..Default::default()
    });

    let mut organization = Organization::new(Identifier::sds_organization(ods_code));
    organization.code = Some(Code::new(ORGANIZATION_TYPE, UNSPECIFIED_ORGANIZATION_TYPE));

    let mut agent_person = AgentPerson::new(person, organization);
    agent_person.id = Some(Identifier::sds_role_profile(PLACEHOLDER_ROLE_PROFILE));
    agent_person.code = Some(Code::new(SDS_JOB_ROLE, PLACEHOLDER_JOB_ROLE));
    agent_person.telecom = vec![Telecom::new(
        Some(TelecomUse::Workplace),
        Some(PLACEHOLDER_TELECOM),
    )];

    Participant::new("AUT", agent_person)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{from_value, json};

    use crate::hl7v3::Interaction;

    fn parameters(group_identifier: Option<&str>) -> Parameters {
        let mut parameter = vec![json!({
            "name": "owner",
            "valueIdentifier": {
                "system": "https://fhir.nhs.uk/Id/ods-organization-code",
                "value": "VNFKT"
            }
        })];
        if let Some(value) = group_identifier {
            parameter.push(json!({
                "name": "group-identifier",
                "valueIdentifier": {
                    "system": "https://fhir.nhs.uk/Id/prescription-order-number",
                    "value": value
                }
            }));
        }

        from_value(json!({ "resourceType": "Parameters", "parameter": parameter })).unwrap()
    }

    #[test]
    fn releases_nominated_prescriptions_of_owner() {
        let payload = convert_release_request(&parameters(None)).unwrap();

        assert_eq!(Interaction::NominatedRelease, payload.interaction());
        match payload {
            Payload::NominatedRelease(request) => {
                let agent_person = &request.author.agent_person;
                assert_eq!(
                    Identifier::sds_organization("VNFKT"),
                    agent_person.represented_organization.id
                );
                assert_eq!(
                    Some(Identifier::sds_role_profile("100102238986")),
                    agent_person.id
                );
                assert_eq!(
                    Some("tel:01234567890"),
                    agent_person.telecom[0].value.as_deref()
                );
            }
            other => panic!("Unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn releases_single_prescription_for_patient() {
        let payload = convert_release_request(&parameters(Some("88AF6C-C81007-00001C"))).unwrap();

        match payload {
            Payload::PatientRelease(request) => assert_eq!(
                Some(Identifier::short_form("88AF6C-C81007-00001C")),
                request.pertinent_information.value().value
            ),
            other => panic!("Unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn owner_is_required() {
        let parameters: Parameters =
            from_value(json!({ "resourceType": "Parameters", "parameter": [] })).unwrap();

        let err = convert_release_request(&parameters).unwrap_err();

        assert_eq!(Some("Parameters.parameter"), err.fhir_path());
    }
}
