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

use resources::{
    claim::{ClaimItem, ClaimItemDetail, ClaimItemSubDetail},
    misc::{CodeableConcept, Extension, Reference},
    Claim, Organization as FhirOrganization, PractitionerRole,
};

use crate::hl7v3::{
    claim::{ChargeExempt, ClaimLineItem, ClaimLineItemQuantity, ClaimSupplyHeader, DispenseClaim},
    dispense::{
        item_status, non_dispensing_reason, original_item_ref, prescription_status, replacement_of,
        supplied_line_item,
    },
    Code, Identifier,
};

use super::{
    dates::to_hl7_date_time,
    dispense::{
        repeat_information, LINE_ITEM_STATUS_SYSTEM, REPLACEMENT_OF_URL, TASK_BUSINESS_STATUS_URL,
    },
    line_item::convert_quantity,
    practitioner::convert_legal_authenticator,
    prescription::EPS_REPEAT_INFORMATION_URL,
    resolve::{
        claim_id, codeable_concept_coding, codeable_concept_coding_or_none, coding_for_system,
        extension, extension_or_none, only_element, required, resolve_contained, ExtensionExt,
        SNOMED_SYSTEM,
    },
    Error,
};

const TASK_BUSINESS_STATUS_REASON_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-TaskBusinessStatusReason";
const CLAIM_SEQUENCE_IDENTIFIER_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-ClaimSequenceIdentifier";
const CLAIM_MEDICATION_REQUEST_REFERENCE_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-ClaimMedicationRequestReference";
const GROUP_IDENTIFIER_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-GroupIdentifier";

const CHARGE_EXEMPTION_SYSTEM: &str =
    "https://fhir.nhs.uk/CodeSystem/prescription-charge-exemption";
const EXEMPTION_EVIDENCE_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/DM-exemption-evidence";
const PRESCRIPTION_CHARGE_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/DM-prescription-charge";
const ENDORSEMENT_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/medicationdispense-endorsement";

const NOT_EXEMPT: &str = "0001";
const EVIDENCE_SEEN: &str = "evidence-seen";

/// Release event of a claim. The message is mandatory but never evaluated
/// by the receiver.
const PLACEHOLDER_RELEASE_EVENT_ID: &str = "ffffffff-ffff-4fff-bfff-ffffffffffff";

/// Dispense claim of a single claim item, one claim line item per item
/// detail.
pub fn convert_dispense_claim(claim: &Claim) -> Result<DispenseClaim, Error> {
    let message_id = claim_id(claim)?;
    let created = required(claim.created.as_deref(), "Claim.created")?;

    let insurance = only_element(&claim.insurance, "Claim.insurance", None)?;
    let payor = required(
        insurance.coverage.identifier(),
        "Claim.insurance.coverage.identifier",
    )?;

    let item = only_element(&claim.item, "Claim.item", None)?;

    let mut ret = DispenseClaim::new(
        Identifier::global(message_id),
        to_hl7_date_time(created, "Claim.created")?,
        Identifier::sds_organization(&payor.value),
        convert_supply_header(claim, item, message_id, created)?,
        convert_charge_exempt(item)?,
        Identifier::global(PLACEHOLDER_RELEASE_EVENT_ID),
    );

    if let Some(replaced) =
        extension_or_none(&claim.extension, REPLACEMENT_OF_URL, "Claim.extension")?
    {
        let identifier = replaced.value_identifier("Claim.extension")?;
        ret.replacement_of = Some(replacement_of(Identifier::global(&identifier.value)));
    }

    Ok(ret)
}

fn convert_charge_exempt(item: &ClaimItem) -> Result<Option<ChargeExempt>, Error> {
    let exemption = codeable_concept_coding_or_none(
        &item.program_code,
        CHARGE_EXEMPTION_SYSTEM,
        "Claim.item.programCode",
    )?;
    let exemption = match exemption {
        Some(exemption) => exemption,
        None => return Ok(None),
    };
    let code = required(exemption.code.as_deref(), "Claim.item.programCode.coding.code")?;

    let mut ret = ChargeExempt::new(code != NOT_EXEMPT, code);

    let evidence = codeable_concept_coding_or_none(
        &item.program_code,
        EXEMPTION_EVIDENCE_SYSTEM,
        "Claim.item.programCode",
    )?;
    if let Some(evidence) = evidence {
        ret = ret.with_evidence_seen(evidence.code.as_deref() == Some(EVIDENCE_SEEN));
    }

    Ok(Some(ret))
}

fn contained_provider(claim: &Claim) -> Result<(&PractitionerRole, &FhirOrganization), Error> {
    let provider = required(claim.provider.as_ref(), "Claim.provider")?;
    let role: &PractitionerRole = resolve_contained(&claim.contained, provider, "Claim.provider")?;

    let organization = match &role.organization {
        Some(reference @ Reference::Pointer { .. }) => resolve_contained(
            &claim.contained,
            reference,
            "Claim.contained(\"PractitionerRole\").organization",
        )?,
        _ => {
            return Err(Error::invalid(
                "practitioner.organization should be a reference",
                "Claim.contained(\"PractitionerRole\").organization",
            ))
        }
    };

    Ok((role, organization))
}

/// Short form and long form id of the claimed prescription.
fn prescription_ids(claim: &Claim) -> Result<(&str, &str), Error> {
    let prescription = required(claim.prescription.as_ref(), "Claim.prescription")?;
    let group_identifier = extension(
        &prescription.extension,
        GROUP_IDENTIFIER_URL,
        "Claim.prescription.extension",
    )?;

    let fhir_path = format!("Claim.prescription.extension(\"{}\").extension", GROUP_IDENTIFIER_URL);
    let short_form = extension(group_identifier.extensions(), "shortForm", &fhir_path)?
        .value_identifier(&fhir_path)?;
    let long_form = extension(group_identifier.extensions(), "UUID", &fhir_path)?
        .value_identifier(&fhir_path)?;

    Ok((short_form.value.as_str(), long_form.value.as_str()))
}

fn status_reason<'a>(
    extensions: &'a [Extension],
    fhir_path: &str,
) -> Result<Option<&'a str>, Error> {
    match extension_or_none(extensions, TASK_BUSINESS_STATUS_REASON_URL, fhir_path)? {
        Some(reason) => {
            let coding = reason.value_coding(fhir_path)?;
            let code = required(
                coding.code.as_deref(),
                &format!("{}.valueCoding.code", fhir_path),
            )?;

            Ok(Some(code))
        }
        None => Ok(None),
    }
}

fn convert_supply_header(
    claim: &Claim,
    item: &ClaimItem,
    message_id: &str,
    created: &str,
) -> Result<ClaimSupplyHeader, Error> {
    let (role, organization) = contained_provider(claim)?;
    let (short_form_id, long_form_id) = prescription_ids(claim)?;

    let status = extension(&item.extension, TASK_BUSINESS_STATUS_URL, "Claim.item.extension")?
        .value_coding("Claim.item.extension")?;
    let status_code = required(status.code.as_deref(), "Claim.item.extension.valueCoding.code")?;

    let mut ret = ClaimSupplyHeader::new(
        Identifier::global(message_id),
        convert_legal_authenticator(role, organization, created)?,
        prescription_status(status_code, status.display.as_deref()),
        short_form_id,
        Identifier::global(long_form_id),
    );

    let fhir_path = "Claim.item.detail.extension";
    if let Some(first) = item.detail.first() {
        if let Some(info) =
            extension_or_none(&first.extension, EPS_REPEAT_INFORMATION_URL, fhir_path)?
        {
            ret.repeat_number = Some(repeat_information(info, fhir_path, false)?);
        }
    }

    ret.pertinent_information2 = status_reason(&item.extension, "Claim.item.extension")?
        .map(|code| non_dispensing_reason(code, None));

    ret.pertinent_information1 = item
        .detail
        .iter()
        .map(|detail| convert_line_item(detail).map(supplied_line_item))
        .collect::<Result<_, _>>()?;

    Ok(ret)
}

fn convert_line_item(detail: &ClaimItemDetail) -> Result<ClaimLineItem, Error> {
    let fhir_path = "Claim.item.detail.extension";

    let sequence_id = extension(&detail.extension, CLAIM_SEQUENCE_IDENTIFIER_URL, fhir_path)?
        .value_identifier(fhir_path)?;

    let status = codeable_concept_coding(
        &detail.modifier,
        LINE_ITEM_STATUS_SYSTEM,
        "Claim.item.detail.modifier",
    )?;
    let status_code = required(status.code.as_deref(), "Claim.item.detail.modifier.coding.code")?;

    let request = extension(&detail.extension, CLAIM_MEDICATION_REQUEST_REFERENCE_URL, fhir_path)?
        .value_reference(fhir_path)?;
    let request_id = required(
        request.identifier(),
        "Claim.item.detail.extension.valueReference.identifier",
    )?;

    let mut ret = ClaimLineItem::new(
        Identifier::global(&sequence_id.value),
        item_status(status_code, status.display.as_deref()),
        original_item_ref(Identifier::global(&request_id.value)),
    );

    if let Some(info) = extension_or_none(
        &detail.extension,
        EPS_REPEAT_INFORMATION_URL,
        fhir_path,
    )? {
        ret.repeat_number = Some(repeat_information(info, fhir_path, false)?);
    }

    ret.pertinent_information2 =
        status_reason(&detail.extension, fhir_path)?.map(|code| non_dispensing_reason(code, None));

    let charge_paid = charge_paid(detail)?;
    let endorsements = endorsements(detail);
    for sub_detail in &detail.sub_detail {
        let quantity = convert_line_item_quantity(sub_detail, charge_paid, &endorsements)?;
        ret.component.push(quantity.into_component());
    }

    Ok(ret)
}

fn charge_paid(detail: &ClaimItemDetail) -> Result<bool, Error> {
    let charge = codeable_concept_coding(
        &detail.program_code,
        PRESCRIPTION_CHARGE_SYSTEM,
        "Claim.item.detail.programCode",
    )?;

    match charge.code.as_deref() {
        Some("paid-once") | Some("paid-twice") => Ok(true),
        Some("not-paid") => Ok(false),
        _ => Err(Error::invalid(
            "Unsupported prescription charge code",
            "Claim.item.detail.programCode",
        )),
    }
}

/// Dispensing endorsements with their supporting text.
fn endorsements(detail: &ClaimItemDetail) -> Vec<(&str, Option<&str>)> {
    detail
        .program_code
        .iter()
        .filter_map(|concept: &CodeableConcept| {
            concept
                .coding
                .iter()
                .find(|coding| coding.is_system(ENDORSEMENT_SYSTEM))
                .and_then(|coding| coding.code.as_deref())
                .map(|code| (code, concept.text.as_deref()))
        })
        .collect()
}

fn convert_line_item_quantity(
    sub_detail: &ClaimItemSubDetail,
    charge_paid: bool,
    endorsements: &[(&str, Option<&str>)],
) -> Result<ClaimLineItemQuantity, Error> {
    let quantity = required(
        sub_detail.quantity.as_ref(),
        "Claim.item.detail.subDetail.quantity",
    )?;

    let product = coding_for_system(
        &sub_detail.product_or_service.coding,
        SNOMED_SYSTEM,
        "Claim.item.detail.subDetail.productOrService.coding",
    )?;
    let product_code = required(
        product.code.as_deref(),
        "Claim.item.detail.subDetail.productOrService.coding.code",
    )?;

    let mut ret = ClaimLineItemQuantity::new(
        convert_quantity(quantity, "Claim.item.detail.subDetail.quantity")?,
        Code::snomed(product_code).with_display_opt(product.display.as_deref()),
        charge_paid,
    );
    for (code, text) in endorsements {
        ret = ret.with_endorsement(code, *text);
    }

    Ok(ret)
}
