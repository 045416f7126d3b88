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

use resources::{Bundle, MedicationRequest};

use crate::hl7v3::{
    cancellation::{CancellationRequest, CancellationRequestBuilder},
    patient::record_target,
    Identifier,
};

use super::{
    dates::now,
    demographics::convert_patient,
    line_item::ORDER_ITEM_NUMBER_SYSTEM,
    practitioner::{convert_author, convert_responsible_party},
    prescription::PRESCRIPTION_ID_URL,
    resolve::{
        bundle_id, codeable_concept_coding, extension, identifier_value, patient, required,
        resources_of_type, ExtensionExt,
    },
    Error,
};

const STATUS_REASON_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/medicationrequest-status-reason";

/// Cancellation of the line item named by the first medication request of
/// the bundle.
pub fn convert_cancellation(bundle: &Bundle) -> Result<CancellationRequest, Error> {
    let request: &MedicationRequest = required(
        resources_of_type::<MedicationRequest>(bundle).next(),
        "Bundle.entry",
    )?;

    let group_identifier = required(
        request.group_identifier.as_ref(),
        "MedicationRequest.groupIdentifier",
    )?;
    let short_form_id = required(
        group_identifier.value.as_deref(),
        "MedicationRequest.groupIdentifier.value",
    )?;

    let fhir_path = "MedicationRequest.groupIdentifier.extension";
    let original_prescription_id =
        extension(&group_identifier.extension, PRESCRIPTION_ID_URL, fhir_path)?
            .value_identifier(fhir_path)?;

    let line_item_id = identifier_value(
        &request.identifier,
        ORDER_ITEM_NUMBER_SYSTEM,
        "MedicationRequest.identifier",
    )?;

    let reason = codeable_concept_coding(
        request.status_reason.as_ref(),
        STATUS_REASON_SYSTEM,
        "MedicationRequest.statusReason",
    )?;
    let reason_code = required(
        reason.code.as_deref(),
        "MedicationRequest.statusReason.coding.code",
    )?;
    let reason_display = required(
        reason.display.as_deref(),
        "MedicationRequest.statusReason.coding.display",
    )?;

    let builder = CancellationRequestBuilder {
        id: Identifier::global(bundle_id(bundle)?),
        effective_time: now(),
        record_target: record_target(convert_patient(patient(bundle)?)?),
        author: convert_author(bundle, request, true)?,
        responsible_party: convert_responsible_party(bundle, request, true)?,
        short_form_id: short_form_id.to_owned(),
        line_item_id: line_item_id.to_owned(),
        original_prescription_id: original_prescription_id.value.clone(),
        reason_code: reason_code.to_owned(),
        reason_display: reason_display.to_owned(),
    };

    Ok(builder.build())
}
