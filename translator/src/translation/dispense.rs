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

use log::debug;
use resources::{
    misc::{Extension, Reference},
    Bundle, MedicationDispense, MedicationRequest, MessageHeader, Organization as FhirOrganization,
    Patient, PractitionerRole,
};

use crate::hl7v3::{
    core::{ActRef, Annotation, Interval, NumericValue, Relationship},
    dispense::{
        item_status, non_dispensing_reason, prescription_status, replacement_of, supplied_line_item,
        DispenseNotification, SuppliedLineItem, SuppliedLineItemQuantity, SupplyHeader,
    },
    patient::record_target_reference,
    Code, Identifier,
};

use super::{
    dates::to_hl7_date_time,
    demographics::{nhs_number, NHS_NUMBER_SYSTEM},
    dosage,
    line_item::{convert_quantity, ORDER_ITEM_NUMBER_SYSTEM},
    practitioner::convert_dispense_author,
    prescription::{EPS_REPEAT_INFORMATION_URL, PRESCRIPTION_ID_URL, UK_CORE_REPEAT_INFORMATION_URL},
    resolve::{
        bundle_id, codeable_concept_coding, codeable_concept_coding_or_none, extension,
        extension_or_none, identifier_value, medication_coding, message_header, only_element,
        only_element_or_none, required, resolve_contained, resolve_reference, resources_of_type,
        ExtensionExt,
    },
    Error,
};

pub const DISPENSE_ITEM_NUMBER_SYSTEM: &str =
    "https://fhir.nhs.uk/Id/prescription-dispense-item-number";
pub const LINE_ITEM_STATUS_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/medicationdispense-type";
pub const TASK_BUSINESS_STATUS_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-TaskBusinessStatus";
pub const REPLACEMENT_OF_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-replacementOf";

const NON_DISPENSING_REASON_SYSTEM: &str =
    "https://fhir.nhs.uk/CodeSystem/medicationdispense-status-reason";
const NON_DISPENSING_REASON_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionNonDispensingReason";
const ORGANISATION_RELATIONSHIPS_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-ODS-OrganisationRelationships";

/// Repeat interval of a dispense event from an EPS repeat information
/// extension. Dispense notifications count the current issue, so both
/// bounds are incremented.
pub fn repeat_information(
    repeat_information: &Extension,
    fhir_path: &str,
    increment: bool,
) -> Result<Interval<NumericValue>, Error> {
    let fhir_path = format!("{}(\"{}\").extension", fhir_path, EPS_REPEAT_INFORMATION_URL);
    let extensions = repeat_information.extensions();

    let issued =
        extension(extensions, "numberOfRepeatsIssued", &fhir_path)?.value_integer(&fhir_path)?;
    let allowed =
        extension(extensions, "numberOfRepeatsAllowed", &fhir_path)?.value_integer(&fhir_path)?;

    if increment {
        Ok(Interval {
            low: NumericValue::new(incremented(issued, &fhir_path)?),
            high: NumericValue::new(incremented(allowed, &fhir_path)?),
        })
    } else {
        Ok(Interval {
            low: NumericValue::new(issued),
            high: NumericValue::new(allowed),
        })
    }
}

pub fn incremented(value: &str, fhir_path: &str) -> Result<String, Error> {
    value
        .parse::<u64>()
        .map(|value| (value + 1).to_string())
        .map_err(|_| Error::invalid(format!("Expected an integer but got '{}'.", value), fhir_path))
}

/// Reference to the message an amendment replaces.
pub fn convert_replacement_of(
    extensions: &[Extension],
    fhir_path: &str,
) -> Result<Option<Relationship<ActRef>>, Error> {
    match extension_or_none(extensions, REPLACEMENT_OF_URL, fhir_path)? {
        Some(extension) => {
            let identifier = extension.value_identifier(fhir_path)?;

            Ok(Some(replacement_of(Identifier::global(&identifier.value))))
        }
        None => Ok(None),
    }
}

/// Coded value of a coding extension, as `(code, display)`.
pub fn coding_extension<'a>(
    extensions: &'a [Extension],
    url: &str,
    fhir_path: &str,
) -> Result<(&'a str, Option<&'a str>), Error> {
    let coding = extension(extensions, url, fhir_path)?.value_coding(fhir_path)?;
    let code = required(coding.code.as_deref(), &format!("{}.valueCoding.code", fhir_path))?;

    Ok((code, coding.display.as_deref()))
}

fn release_event_id(header: &MessageHeader) -> Result<Identifier, Error> {
    let response = required(header.response.as_ref(), "MessageHeader.response")?;

    Ok(Identifier::global(&response.identifier))
}

fn contained_request(dispense: &MedicationDispense) -> Result<&MedicationRequest, Error> {
    let reference = required(
        dispense.authorizing_prescription.first(),
        "MedicationDispense.authorizingPrescription",
    )?;

    resolve_contained(
        &dispense.contained,
        reference,
        "MedicationDispense.authorizingPrescription",
    )
}

fn contained_role(dispense: &MedicationDispense) -> Result<&PractitionerRole, Error> {
    let performer = required(dispense.performer.first(), "MedicationDispense.performer")?;

    resolve_contained(
        &dispense.contained,
        &performer.actor,
        "MedicationDispense.performer.actor",
    )
}

fn dispensing_organization<'a>(
    bundle: &'a Bundle,
    role: &PractitionerRole,
) -> Result<&'a FhirOrganization, Error> {
    match &role.organization {
        Some(reference @ Reference::Pointer { .. }) => resolve_reference(bundle, reference),
        _ => Err(Error::invalid(
            "fhirContainedPractitionerRole.organization should be a Reference",
            "resource(\"MedicationDispense\").contained(\"organization\")",
        )),
    }
}

/// ODS code of the organization reimbursing the dispenser.
fn reimbursement_authority(organization: &FhirOrganization) -> Result<&str, Error> {
    let relationships = extension_or_none(
        &organization.extension,
        ORGANISATION_RELATIONSHIPS_URL,
        "Organization.extension",
    )?
    .ok_or_else(|| {
        Error::invalid(
            "The dispense notification is missing the reimbursement authority and it should be provided.",
            "Organization.extension",
        )
    })?;

    let fhir_path = "Organization.extension[0].extension[0]";
    let authority =
        extension_or_none(relationships.extensions(), "reimbursementAuthority", fhir_path)?
            .ok_or_else(|| {
                Error::invalid(
                    "The dispense notification is missing the ODS code for the reimbursement authority and it should be provided.",
                    fhir_path,
                )
            })?;

    Ok(authority.value_identifier(fhir_path)?.value.as_str())
}

fn patient_nhs_number<'a>(
    bundle: &'a Bundle,
    dispense: &'a MedicationDispense,
) -> Result<&'a str, Error> {
    let patient = only_element_or_none(
        resources_of_type::<Patient>(bundle),
        "Bundle.entry",
        Some("resource.resourceType == 'Patient'"),
    )?;

    match patient {
        Some(patient) => nhs_number(patient),
        None => {
            let subject = required(dispense.subject.as_ref(), "MedicationDispense.subject")?;
            let identifier =
                required(subject.identifier(), "MedicationDispense.subject.identifier")?;
            if identifier.system != NHS_NUMBER_SYSTEM {
                debug!("Dispense subject identified by {}", identifier.system);
            }

            Ok(identifier.value.as_str())
        }
    }
}

/// Repeat interval of a supplied line item: the prescriptions issued so far
/// out of the repeats allowed plus the original issue.
fn line_item_repeat_number(
    request: &MedicationRequest,
) -> Result<Option<Interval<NumericValue>>, Error> {
    let fhir_path = "MedicationDispense.contained.MedicationRequest.extension";
    let repeat_information = match extension_or_none(
        &request.extension,
        UK_CORE_REPEAT_INFORMATION_URL,
        fhir_path,
    )? {
        Some(repeat_information) => repeat_information,
        None => return Ok(None),
    };

    let fhir_path = format!("{}(\"{}\").extension", fhir_path, UK_CORE_REPEAT_INFORMATION_URL);
    let issued = match extension_or_none(
        repeat_information.extensions(),
        "numberOfPrescriptionsIssued",
        &fhir_path,
    )? {
        Some(issued) => issued.value_integer(&fhir_path)?,
        None => return Ok(None),
    };

    let allowed = request
        .dispense_request
        .as_ref()
        .and_then(|dispense_request| dispense_request.number_of_repeats_allowed.as_ref())
        .ok_or_else(|| {
            Error::invalid(
                "Number of repeats allowed is required.",
                "MedicationDispense.contained.MedicationRequest.dispenseRequest.numberOfRepeatsAllowed",
            )
        })?;

    Ok(Some(Interval {
        low: NumericValue::new(issued),
        high: NumericValue::new(incremented(
            allowed.as_str(),
            "MedicationDispense.contained.MedicationRequest.dispenseRequest.numberOfRepeatsAllowed",
        )?),
    }))
}

/// Dispensing instructions of a dispense. The narrated dosage is only
/// audited.
fn supply_instructions(dispense: &MedicationDispense) -> Result<String, Error> {
    dosage::audit(&dispense.dosage_instruction);

    let dosage = only_element(
        &dispense.dosage_instruction,
        "MedicationDispense.dosageInstruction",
        None,
    )?;
    let text = required(
        dosage.text.as_deref(),
        "MedicationDispense.dosageInstruction.text",
    )?;

    Ok(text.to_owned())
}

fn convert_supplied_quantity(
    bundle: &Bundle,
    dispense: &MedicationDispense,
) -> Result<SuppliedLineItemQuantity, Error> {
    let quantity = required(dispense.quantity.as_ref(), "MedicationDispense.quantity")?;
    let medication = medication_coding(
        bundle,
        dispense.medication_codeable_concept.as_ref(),
        dispense.medication_reference.as_ref(),
    )?;
    let medication_code = required(
        medication.code.as_deref(),
        "MedicationDispense.medicationCodeableConcept.coding.code",
    )?;

    Ok(SuppliedLineItemQuantity::new(
        convert_quantity(quantity, "MedicationDispense.quantity")?,
        Code::snomed(medication_code).with_display_opt(medication.display.as_deref()),
        supply_instructions(dispense)?,
    ))
}

fn convert_supplied_line_item(
    bundle: &Bundle,
    dispense: &MedicationDispense,
    request: &MedicationRequest,
) -> Result<SuppliedLineItem, Error> {
    let item_number = identifier_value(
        &dispense.identifier,
        DISPENSE_ITEM_NUMBER_SYSTEM,
        "MedicationDispense.identifier",
    )?;
    let original_item_id = identifier_value(
        &request.identifier,
        ORDER_ITEM_NUMBER_SYSTEM,
        "MedicationDispense.contained[0].identifier",
    )?;

    let requested_medication = medication_coding(
        bundle,
        request.medication_codeable_concept.as_ref(),
        request.medication_reference.as_ref(),
    )?;
    let requested_code = required(
        requested_medication.code.as_deref(),
        "MedicationRequest.medicationCodeableConcept.coding.code",
    )?;
    let requested_quantity = request
        .dispense_request
        .as_ref()
        .and_then(|dispense_request| dispense_request.quantity.as_ref());
    let requested_quantity = required(
        requested_quantity,
        "MedicationDispense.contained.MedicationRequest.dispenseRequest.quantity",
    )?;

    let status = codeable_concept_coding(
        dispense.type_.as_ref(),
        LINE_ITEM_STATUS_SYSTEM,
        "MedicationDispense.type",
    )?;
    let status_code = required(status.code.as_deref(), "MedicationDispense.type.coding.code")?;

    let mut ret = SuppliedLineItem::new(
        Identifier::global(item_number),
        Code::snomed(requested_code).with_display_opt(requested_medication.display.as_deref()),
        convert_quantity(
            requested_quantity,
            "MedicationDispense.contained.MedicationRequest.dispenseRequest.quantity",
        )?,
        item_status(status_code, status.display.as_deref()),
        Identifier::global(original_item_id),
    );
    ret.repeat_number = line_item_repeat_number(request)?;
    ret.component
        .push(convert_supplied_quantity(bundle, dispense)?.into_component());

    let reason = codeable_concept_coding_or_none(
        dispense.status_reason_codeable_concept.as_ref(),
        NON_DISPENSING_REASON_SYSTEM,
        "MedicationDispense.statusReasonCodeableConcept",
    )?;
    if let Some(reason) = reason {
        let code = required(
            reason.code.as_deref(),
            "MedicationDispense.statusReasonCodeableConcept.coding.code",
        )?;
        ret.pertinent_information2 = Some(non_dispensing_reason(code, reason.display.as_deref()));
    }

    Ok(ret)
}

/// Supplied line items, one per prescribed item. Dispenses of the same
/// prescribed item add further quantities to its line item.
fn convert_supplied_line_items(
    bundle: &Bundle,
    dispenses: &[&MedicationDispense],
) -> Result<Vec<SuppliedLineItem>, Error> {
    let mut ret: Vec<SuppliedLineItem> = Vec::new();

    for dispense in dispenses {
        let request = contained_request(dispense)?;
        let original_item_id = Identifier::global(identifier_value(
            &request.identifier,
            ORDER_ITEM_NUMBER_SYSTEM,
            "MedicationDispense.contained[0].identifier",
        )?);

        let existing = ret
            .iter_mut()
            .find(|item| item.in_fulfillment_of.value().id == original_item_id);
        match existing {
            Some(item) => item
                .component
                .push(convert_supplied_quantity(bundle, dispense)?.into_component()),
            None => ret.push(convert_supplied_line_item(bundle, dispense, request)?),
        }
    }

    Ok(ret)
}

/// Non dispensing reason of the whole prescription. Only given if every
/// dispense carries one, and all of them must agree.
fn prescription_non_dispensing_reason(
    dispenses: &[&MedicationDispense],
) -> Result<Option<Relationship<Annotation<Code>>>, Error> {
    const FHIR_PATH: &str = "MedicationDispense.extension:prescriptionNonDispensingReason";

    let mut reasons = Vec::new();
    for dispense in dispenses {
        match extension_or_none(
            &dispense.extension,
            NON_DISPENSING_REASON_URL,
            "MedicationDispense.extension",
        )? {
            Some(reason) => reasons.push(reason.value_coding(FHIR_PATH)?),
            None => return Ok(None),
        }
    }

    let first = match reasons.first() {
        Some(first) => *first,
        None => return Ok(None),
    };
    if reasons.iter().any(|reason| reason.code != first.code) {
        return Err(Error::invalid(
            "Expected all MedicationDispenses to have the same value for MedicationDispense.extension:prescriptionNonDispensingReason",
            FHIR_PATH,
        ));
    }

    let code = required(first.code.as_deref(), FHIR_PATH)?;

    Ok(Some(non_dispensing_reason(code, first.display.as_deref())))
}

fn convert_supply_header(
    bundle: &Bundle,
    message_id: &str,
    dispenses: &[&MedicationDispense],
    role: &PractitionerRole,
    organization: &FhirOrganization,
) -> Result<SupplyHeader, Error> {
    let first = dispenses[0];
    let request = contained_request(first)?;

    let group_identifier = required(
        request.group_identifier.as_ref(),
        "MedicationDispense.contained.MedicationRequest.groupIdentifier",
    )?;
    let short_form_id = required(
        group_identifier.value.as_deref(),
        "MedicationDispense.contained.MedicationRequest.groupIdentifier.value",
    )?;
    let fhir_path = "MedicationRequest.groupIdentifier.extension.valueIdentifier";
    let original_prescription_id =
        extension(&group_identifier.extension, PRESCRIPTION_ID_URL, fhir_path)?
            .value_identifier(fhir_path)?;

    let (status_code, status_display) = coding_extension(
        &first.extension,
        TASK_BUSINESS_STATUS_URL,
        "MedicationDispense.extension",
    )?;

    let mut ret = SupplyHeader::new(
        Identifier::global(message_id),
        convert_dispense_author(role, organization)?,
        prescription_status(status_code, status_display),
        short_form_id,
        Identifier::global(&original_prescription_id.value),
    );

    let fhir_path = "MedicationDispense.contained.MedicationRequest.basedOn.extension";
    let based_on_extensions = request
        .based_on
        .first()
        .map(|based_on| based_on.extension.as_slice())
        .unwrap_or_default();
    if let Some(info) =
        extension_or_none(based_on_extensions, EPS_REPEAT_INFORMATION_URL, fhir_path)?
    {
        ret.repeat_number = Some(repeat_information(info, fhir_path, true)?);
    }

    ret.pertinent_information1 = convert_supplied_line_items(bundle, dispenses)?
        .into_iter()
        .map(supplied_line_item)
        .collect();
    ret.pertinent_information2 = prescription_non_dispensing_reason(dispenses)?;

    Ok(ret)
}

/// Dispense notification of a dispense bundle: the medication dispenses of
/// a released prescription, grouped into supplied line items.
pub fn convert_dispense_notification(bundle: &Bundle) -> Result<DispenseNotification, Error> {
    let message_id = bundle_id(bundle)?;
    let header = message_header(bundle)?;

    let dispenses = resources_of_type::<MedicationDispense>(bundle).collect::<Vec<_>>();
    let first = *required(dispenses.first(), "Bundle.entry")?;

    let role = contained_role(first)?;
    let organization = dispensing_organization(bundle, role)?;
    let payor = reimbursement_authority(organization)?;

    let when_handed_over = required(
        first.when_handed_over.as_deref(),
        "MedicationDispense.whenHandedOver",
    )?;

    let supply_header = convert_supply_header(bundle, message_id, &dispenses, role, organization)?;

    let mut ret = DispenseNotification::new(
        Identifier::global(message_id),
        to_hl7_date_time(when_handed_over, "MedicationDispense.whenHandedOver")?,
        record_target_reference(patient_nhs_number(bundle, first)?),
        Identifier::sds_organization(payor),
        supply_header,
        release_event_id(header)?,
    );
    ret.replacement_of = convert_replacement_of(&header.extension, "MessageHeader.extension")?;

    Ok(ret)
}
