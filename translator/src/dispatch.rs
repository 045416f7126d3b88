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

use log::info;
use resources::{task::Status, Bundle, Resource, Task};

use crate::{
    hl7v3::{
        agent::AgentPersonSds,
        codes::Identifier,
        envelope::{Asids, Payload, SendMessagePayload},
    },
    translation::{
        convert_cancellation, convert_dispense_claim, convert_dispense_notification,
        convert_dispense_proposal_return, convert_parent_prescription, convert_release_request,
        convert_withdraw,
        dates::now,
        resolve::{bundle_id, claim_id, message_header, task_id},
        Error,
    },
    xml::ser::to_string,
};

pub const PRESCRIPTION_ORDER_EVENT: &str = "prescription-order";
pub const PRESCRIPTION_ORDER_UPDATE_EVENT: &str = "prescription-order-update";
pub const DISPENSE_NOTIFICATION_EVENT: &str = "dispense-notification";

/// Routing and authorship supplied by the caller of a translation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    pub from_asid: String,
    pub to_asid: String,
    pub sds_user_id: Option<String>,
    pub sds_role_id: Option<String>,
}

impl Headers {
    /// Person authorship of the control act. Messages without both SDS ids
    /// are authored by the sending system only.
    fn author(&self) -> Option<AgentPersonSds> {
        match (&self.sds_user_id, &self.sds_role_id) {
            (Some(user_id), Some(role_id)) => Some(AgentPersonSds::new(
                Identifier::sds_role_profile(role_id.as_str()),
                Identifier::sds_unique_id(user_id.as_str()),
                None,
            )),
            _ => None,
        }
    }
}

/// Converts an inbound resource into its interaction payload. Returns the
/// message id the payload is sent with.
pub fn create_payload(resource: &Resource) -> Result<(Identifier, Payload), Error> {
    match resource {
        Resource::Bundle(bundle) => create_bundle_payload(bundle),
        Resource::Task(task) => create_task_payload(task),
        Resource::Claim(claim) => {
            let id = Identifier::global(claim_id(claim)?);
            let payload = Payload::DispenseClaim(Box::new(convert_dispense_claim(claim)?));

            Ok((id, payload))
        }
        Resource::Parameters(parameters) => {
            let payload = convert_release_request(parameters)?;
            let id = match &payload {
                Payload::NominatedRelease(request) => request.id.clone(),
                Payload::PatientRelease(request) => request.id.clone(),
                other => {
                    return Err(Error::invalid(
                        format!("Unexpected release interaction '{}'.", other.interaction().id()),
                        "Parameters",
                    ))
                }
            };

            Ok((id, payload))
        }
        other => Err(Error::invalid(
            format!("Unsupported resource type '{}'.", other.resource_type()),
            "resourceType",
        )),
    }
}

fn create_bundle_payload(bundle: &Bundle) -> Result<(Identifier, Payload), Error> {
    let event = message_header(bundle)?
        .event_coding
        .as_ref()
        .and_then(|coding| coding.code.as_deref())
        .ok_or_else(|| {
            Error::missing(
                "Missing required field MessageHeader.eventCoding.code.",
                "MessageHeader.eventCoding.code",
            )
        })?;

    let payload = match event {
        PRESCRIPTION_ORDER_EVENT => {
            Payload::ParentPrescription(Box::new(convert_parent_prescription(bundle)?))
        }
        PRESCRIPTION_ORDER_UPDATE_EVENT => {
            Payload::CancellationRequest(Box::new(convert_cancellation(bundle)?))
        }
        DISPENSE_NOTIFICATION_EVENT => {
            Payload::DispenseNotification(Box::new(convert_dispense_notification(bundle)?))
        }
        event => {
            return Err(Error::invalid(
                format!("Unsupported message event '{}'.", event),
                "MessageHeader.eventCoding.code",
            ))
        }
    };

    Ok((Identifier::global(bundle_id(bundle)?), payload))
}

fn create_task_payload(task: &Task) -> Result<(Identifier, Payload), Error> {
    let payload = match task.status {
        Status::Rejected => {
            Payload::DispenseProposalReturn(Box::new(convert_dispense_proposal_return(task)?))
        }
        Status::InProgress => Payload::Withdraw(Box::new(convert_withdraw(task)?)),
        _ => {
            return Err(Error::invalid(
                "Task.status must be one of 'rejected' or 'in-progress'.",
                "Task.status",
            ))
        }
    };

    Ok((Identifier::global(task_id(task)?), payload))
}

/// Converts an inbound resource and wraps it into the transmission envelope.
pub fn create_send_message_payload(
    resource: &Resource,
    headers: &Headers,
) -> Result<SendMessagePayload, Error> {
    let (id, payload) = create_payload(resource)?;

    info!(
        "Creating HL7v3 payload from FHIR resource (id={}, interaction={})",
        id.root,
        payload.interaction().id()
    );

    Ok(SendMessagePayload::new(
        id,
        now(),
        Asids {
            from: &headers.from_asid,
            to: &headers.to_asid,
        },
        headers.author(),
        payload,
    ))
}

/// Translates an inbound resource into the XML message sent to the backbone.
pub fn translate(resource: &Resource, headers: &Headers) -> Result<String, Error> {
    let envelope = create_send_message_payload(resource, headers)?;

    Ok(to_string(&envelope)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::read_to_string;

    use resources::OperationOutcome;
    use serde_json::{from_str, from_value, json};

    use crate::hl7v3::envelope::Interaction;

    fn resource(name: &str) -> Resource {
        let json = read_to_string(format!("./examples/{}.json", name)).unwrap();

        from_str(&json).unwrap()
    }

    fn headers() -> Headers {
        Headers {
            from_asid: "200000001285".into(),
            to_asid: "567456789789".into(),
            sds_user_id: None,
            sds_role_id: None,
        }
    }

    fn change_event(bundle: Resource, code: &str) -> Resource {
        let mut bundle = match bundle {
            Resource::Bundle(bundle) => bundle,
            other => panic!("Unexpected resource: {:?}", other),
        };
        for entry in bundle.entry.iter_mut() {
            if let Resource::MessageHeader(header) = &mut entry.resource {
                if let Some(coding) = header.event_coding.as_mut() {
                    coding.code = Some(code.to_owned());
                }
            }
        }

        Resource::Bundle(bundle)
    }

    #[test]
    fn dispatches_bundles_on_message_event() {
        let cases = vec![
            ("prescription-order", Interaction::ParentPrescriptionUrgent),
            ("cancellation", Interaction::CancelRequest),
            ("dispense-notification", Interaction::DispenseNotification),
        ];

        for (name, interaction) in cases {
            let (_, payload) = create_payload(&resource(name)).unwrap();

            assert_eq!(interaction, payload.interaction(), "{}", name);
        }
    }

    #[test]
    fn bundle_payload_id_is_bundle_identifier() {
        let (id, _) = create_payload(&resource("prescription-order")).unwrap();

        assert_eq!(Identifier::global("aef77afb-7e3c-427a-8657-2c427f71a272"), id);
    }

    #[test]
    fn dispatches_claims() {
        let (id, payload) = create_payload(&resource("dispense-claim")).unwrap();

        assert_eq!(Interaction::DispenseClaimInformation, payload.interaction());
        assert_eq!(Identifier::global("be807dac-9dcf-45cf-91d6-70d9d58dcf34"), id);
    }

    #[test]
    fn dispatches_release_requests_on_group_identifier() {
        let nominated: Resource = from_value(json!({
            "resourceType": "Parameters",
            "parameter": [{
                "name": "owner",
                "valueIdentifier": {
                    "system": "https://fhir.nhs.uk/Id/ods-organization-code",
                    "value": "VNFKT"
                }
            }]
        }))
        .unwrap();
        let patient: Resource = from_value(json!({
            "resourceType": "Parameters",
            "parameter": [
                {
                    "name": "owner",
                    "valueIdentifier": {
                        "system": "https://fhir.nhs.uk/Id/ods-organization-code",
                        "value": "VNFKT"
                    }
                },
                {
                    "name": "group-identifier",
                    "valueIdentifier": {
                        "system": "https://fhir.nhs.uk/Id/prescription-order-number",
                        "value": "18B064-A99968-4BCAA3"
                    }
                }
            ]
        }))
        .unwrap();

        let (nominated_id, nominated) = create_payload(&nominated).unwrap();
        let (_, patient) = create_payload(&patient).unwrap();

        assert_eq!(Interaction::NominatedRelease, nominated.interaction());
        assert_eq!(Interaction::PatientRelease, patient.interaction());
        match nominated {
            Payload::NominatedRelease(request) => assert_eq!(request.id, nominated_id),
            other => panic!("Unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_message_event() {
        let bundle = change_event(resource("prescription-order"), "prescription-order-response");

        let err = create_payload(&bundle).unwrap_err();

        assert_eq!(
            Error::invalid(
                "Unsupported message event 'prescription-order-response'.",
                "MessageHeader.eventCoding.code"
            ),
            err
        );
    }

    #[test]
    fn rejects_tasks_in_other_states() {
        let task: Resource = from_value(json!({
            "resourceType": "Task",
            "status": "completed"
        }))
        .unwrap();

        let err = create_payload(&task).unwrap_err();

        assert_eq!(Some("Task.status"), err.fhir_path());
    }

    #[test]
    fn rejects_unsupported_resources() {
        let patient: Resource = from_value(json!({ "resourceType": "Patient" })).unwrap();

        let outcome = OperationOutcome::from(&create_payload(&patient).unwrap_err());

        assert_eq!(
            Some("Unsupported resource type 'Patient'."),
            outcome.issue[0].diagnostics.as_deref()
        );
    }

    #[test]
    fn wraps_payload_into_envelope() {
        let envelope = create_send_message_payload(&resource("cancellation"), &headers()).unwrap();

        assert_eq!(Identifier::global("0c8d4a43-9eb9-4b53-8a8c-b3a1d4f3c6c2"), envelope.id);
        assert_eq!(Interaction::CancelRequest, envelope.interaction);
        assert_eq!(None, envelope.control_act_event.author);
        assert_eq!(
            Identifier::accredited_system("200000001285"),
            envelope.sender.value().id
        );
        assert_eq!(
            Identifier::accredited_system("567456789789"),
            envelope.receiver.value().id
        );
    }

    #[test]
    fn envelope_is_authored_by_sds_user_when_given() {
        let headers = Headers {
            sds_user_id: Some("555086689106".into()),
            sds_role_id: Some("555086718101".into()),
            ..headers()
        };

        let xml = translate(&resource("prescription-order"), &headers).unwrap();

        assert!(xml.starts_with(r#"<PORX_IN020101SM31 xmlns="urn:hl7-org:v3">"#));
        assert!(xml.contains(r#"<id root="AEF77AFB-7E3C-427A-8657-2C427F71A272"/>"#));
        assert!(xml.contains(r#"extension="555086689106""#));
        assert!(xml.contains(r#"extension="555086718101""#));
    }

    #[test]
    fn headers_need_both_sds_ids_for_person_authorship() {
        let headers = Headers {
            sds_user_id: Some("555086689106".into()),
            ..headers()
        };

        assert_eq!(None, headers.author());
    }
}
