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

use std::slice::from_ref;

use resources::{misc::Reference, Organization as FhirOrganization, PractitionerRole, Task};

use crate::hl7v3::{
    patient::record_target_reference,
    task::{DispenseProposalReturn, EtpWithdraw, EtpWithdrawBuilder},
    Identifier,
};

use super::{
    dates::to_hl7_date_time,
    demographics::NHS_NUMBER_SYSTEM,
    dispense::incremented,
    practitioner::convert_withdraw_author,
    prescription::EPS_REPEAT_INFORMATION_URL,
    resolve::{
        codeable_concept_coding, extension, extension_or_none, identifier_value, required,
        resolve_contained, task_id, ExtensionExt, MESSAGE_ID_SYSTEM,
    },
    Error,
};

const PRESCRIPTION_ORDER_NUMBER_SYSTEM: &str = "https://fhir.nhs.uk/Id/prescription-order-number";
const WITHDRAW_REASON_SYSTEM: &str =
    "https://fhir.nhs.uk/CodeSystem/EPS-task-dispense-withdraw-reason";
const RETURN_REASON_SYSTEM: &str =
    "https://fhir.nhs.uk/CodeSystem/EPS-task-dispense-return-status-reason";

/// Withdrawal of the last dispense notification sent for a prescription.
pub fn convert_withdraw(task: &Task) -> Result<EtpWithdraw, Error> {
    let id = task_id(task)?;
    let authored_on = required(task.authored_on.as_deref(), "Task.authoredOn")?;
    let (role, organization) = contained_requester(task)?;

    let for_ = required(task.for_.as_ref(), "Task.for")?;
    let nhs_number = identifier_value(
        for_.identifier().map(from_ref).unwrap_or_default(),
        NHS_NUMBER_SYSTEM,
        "Task.for.identifier",
    )?;

    let (reason_code, reason_display) = status_reason(task, WITHDRAW_REASON_SYSTEM)?;

    let builder = EtpWithdrawBuilder {
        id: Identifier::global(id),
        effective_time: to_hl7_date_time(authored_on, "Task.authoredOn")?,
        record_target: record_target_reference(nhs_number),
        author: convert_withdraw_author(role, organization)?,
        repeat_instance: repeat_instance(task)?,
        short_form_id: short_form_id(task)?.to_owned(),
        dispense_notification_id: focus_message_id(task)?.to_owned(),
        reason_code: reason_code.to_owned(),
        reason_display: reason_display.map(ToOwned::to_owned),
    };

    Ok(builder.build())
}

/// Return of a released prescription the dispenser rejected. The focus of
/// the task names the release response being reversed.
pub fn convert_dispense_proposal_return(task: &Task) -> Result<DispenseProposalReturn, Error> {
    let id = task_id(task)?;
    let authored_on = required(task.authored_on.as_deref(), "Task.authoredOn")?;
    let (role, organization) = contained_requester(task)?;

    Ok(DispenseProposalReturn::new(
        Identifier::global(id),
        to_hl7_date_time(authored_on, "Task.authoredOn")?,
        convert_withdraw_author(role, organization)?,
        short_form_id(task)?,
        status_reason(task, RETURN_REASON_SYSTEM)?,
        focus_message_id(task)?,
    ))
}

fn contained_requester(task: &Task) -> Result<(&PractitionerRole, &FhirOrganization), Error> {
    let role: &PractitionerRole = match &task.requester {
        Some(reference @ Reference::Pointer { .. }) => {
            resolve_contained(&task.contained, reference, "Task.requester")?
        }
        _ => {
            return Err(Error::invalid(
                "task.requester should be a reference to contained.practitionerRole",
                "task.requester",
            ))
        }
    };

    let organization = match &role.organization {
        Some(reference @ Reference::Pointer { .. }) => resolve_contained(
            &task.contained,
            reference,
            "task.contained(\"PractitionerRole\").organization",
        )?,
        _ => {
            return Err(Error::invalid(
                "practitionerRole.organization should be a Reference",
                "task.contained(\"PractitionerRole\").organization",
            ))
        }
    };

    Ok((role, organization))
}

fn short_form_id(task: &Task) -> Result<&str, Error> {
    let group_identifier = required(task.group_identifier.as_ref(), "Task.groupIdentifier")?;

    identifier_value(
        from_ref(group_identifier),
        PRESCRIPTION_ORDER_NUMBER_SYSTEM,
        "Task.groupIdentifier",
    )
}

fn focus_message_id(task: &Task) -> Result<&str, Error> {
    let focus = required(task.focus.as_ref(), "Task.focus")?;

    identifier_value(
        focus.identifier().map(from_ref).unwrap_or_default(),
        MESSAGE_ID_SYSTEM,
        "Task.focus.identifier",
    )
}

fn status_reason<'a>(task: &'a Task, system: &str) -> Result<(&'a str, Option<&'a str>), Error> {
    let coding = codeable_concept_coding(task.status_reason.as_ref(), system, "Task.statusReason")?;
    let code = required(coding.code.as_deref(), "Task.statusReason.coding.code")?;

    Ok((code, coding.display.as_deref()))
}

/// Repeat instance being withdrawn: the one after the repeats issued so far.
fn repeat_instance(task: &Task) -> Result<Option<String>, Error> {
    let repeat_information = match extension_or_none(
        &task.extension,
        EPS_REPEAT_INFORMATION_URL,
        "Task.extension(\"EPS-Repeat-Information\")",
    )? {
        Some(repeat_information) => repeat_information,
        None => return Ok(None),
    };

    let fhir_path = format!("Task.extension(\"{}\").extension", EPS_REPEAT_INFORMATION_URL);
    let issued = extension(repeat_information.extensions(), "numberOfRepeatsIssued", &fhir_path)?
        .value_integer(&fhir_path)?;

    incremented(issued, &fhir_path).map(Some)
}
