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

use std::collections::BTreeSet;

use chrono::Utc;
use resources::{
    misc::{Extension, Period, Quantity},
    Bundle, CommunicationRequest, List, MedicationRequest,
};

use crate::hl7v3::{
    codes::{Code, Identifier, TreatmentType, DISPENSING_SITE_PREFERENCE, PRESCRIPTION_TYPE},
    core::{Interval, IntervalUnanchored, Null, NumericValue, Timestamp},
    line_item::administration_code,
    patient::record_target,
    prescription::{
        dispensing_site_preference, line_item, performer, prescription_type, review_date,
        token_issued, treatment_type, DaysSupply, ParentPrescription, Prescription,
    },
};

use super::{
    dates::{date_time_to_hl7_date, is_future_dated, to_hl7_date, to_hl7_date_time},
    demographics::convert_patient,
    line_item::convert_line_item,
    practitioner::{convert_author, convert_responsible_party},
    resolve::{
        bundle_id, extension, extension_or_none, patient, required, resolve_reference,
        resources_of_type, ExtensionExt,
    },
    Error,
};

pub const PRESCRIPTION_ID_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionId";
const PRESCRIPTION_TYPE_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionType";
const PERFORMER_SITE_TYPE_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PerformerSiteType";
pub const EPS_REPEAT_INFORMATION_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-RepeatInformation";
pub const UK_CORE_REPEAT_INFORMATION_URL: &str =
    "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-MedicationRepeatInformation";

const ACUTE: &str = "acute";
const CONTINUOUS: &str = "continuous";
const CONTINUOUS_REPEAT_DISPENSING: &str = "continuous-repeat-dispensing";

/// Course of therapy shared by all medication requests of a prescription.
/// Acute items may be mixed with repeat prescribing items, in which case the
/// prescription is acute.
pub fn course_of_therapy_type(requests: &[&MedicationRequest]) -> Result<TreatmentType, Error> {
    let codes = requests
        .iter()
        .filter_map(|request| request.course_of_therapy_type.as_ref())
        .flat_map(|concept| concept.coding.iter())
        .filter_map(|coding| coding.code.as_deref())
        .collect::<BTreeSet<_>>();

    let unhandled = |code: &str| {
        Error::invalid(
            format!("Unhandled course of therapy type code '{}'.", code),
            "MedicationRequest.courseOfTherapyType.coding.code",
        )
    };

    if codes.len() == 2 && codes.contains(ACUTE) && codes.contains(CONTINUOUS) {
        return Ok(TreatmentType::Acute);
    }

    let mut iter = codes.iter();
    match (iter.next(), iter.next()) {
        (Some(&ACUTE), None) => Ok(TreatmentType::Acute),
        (Some(&CONTINUOUS), None) => Ok(TreatmentType::ContinuousRepeatPrescribing),
        (Some(&CONTINUOUS_REPEAT_DISPENSING), None) => {
            Ok(TreatmentType::ContinuousRepeatDispensing)
        }
        (Some(code), None) => Err(unhandled(code)),
        (None, _) => Err(Error::missing(
            "Required field MedicationRequest.courseOfTherapyType is missing.",
            "MedicationRequest.courseOfTherapyType",
        )),
        (Some(_), Some(_)) => Err(unhandled(&codes.iter().cloned().collect::<Vec<_>>().join(", "))),
    }
}

/// Number of repeats allowed, preferring the repeat information of the
/// request the medication request is based on. Both sources must be integers.
pub fn repeats_allowed(request: &MedicationRequest) -> Result<String, Error> {
    let fhir_path = "MedicationRequest.dispenseRequest.numberOfRepeatsAllowed";
    let from_dispense_request = request
        .dispense_request
        .as_ref()
        .and_then(|dispense_request| dispense_request.number_of_repeats_allowed.as_ref())
        .ok_or_else(|| Error::invalid("Number of repeats allowed is required.", fhir_path))?;
    let from_dispense_request = from_dispense_request.as_integer().ok_or_else(|| {
        Error::invalid(
            format!("Expected an integer but got '{}'.", from_dispense_request),
            fhir_path,
        )
    })?;

    let based_on_extensions = request
        .based_on
        .iter()
        .flat_map(|based_on| based_on.extension.iter())
        .cloned()
        .collect::<Vec<_>>();
    let repeat_information = extension_or_none(
        &based_on_extensions,
        EPS_REPEAT_INFORMATION_URL,
        "MedicationRequest.basedOn.extension",
    )?;
    if let Some(repeat_information) = repeat_information {
        let fhir_path = "MedicationRequest.basedOn.extension.extension";
        if let Some(allowed) =
            extension_or_none(repeat_information.extensions(), "numberOfRepeatsAllowed", fhir_path)?
        {
            let allowed = allowed.value_integer(fhir_path)?;

            return allowed
                .parse::<i64>()
                .map(|allowed| allowed.to_string())
                .map_err(|_| {
                    Error::invalid(format!("Expected an integer but got '{}'.", allowed), fhir_path)
                });
        }
    }

    Ok(from_dispense_request.to_string())
}

/// Repeat interval of all line items of a prescription.
pub fn convert_repeat_number(
    treatment: TreatmentType,
    request: &MedicationRequest,
) -> Result<Option<Interval<NumericValue>>, Error> {
    match treatment {
        TreatmentType::Acute => Ok(None),
        TreatmentType::ContinuousRepeatPrescribing => Ok(Some(Interval {
            low: NumericValue::new("1"),
            high: NumericValue::new("1"),
        })),
        TreatmentType::ContinuousRepeatDispensing => Ok(Some(Interval {
            low: NumericValue::new("1"),
            high: NumericValue::new(repeats_allowed(request)?),
        })),
    }
}

fn convert_days_supply(
    validity_period: Option<&Period>,
    expected_supply_duration: Option<&Quantity>,
) -> Result<DaysSupply, Error> {
    let effective_time = match validity_period {
        Some(period) => Some(Interval {
            low: date_time_to_hl7_date(
                required(
                    period.start.as_deref(),
                    "MedicationRequest.dispenseRequest.validityPeriod.start",
                )?,
                "MedicationRequest.dispenseRequest.validityPeriod.start",
            )?,
            high: date_time_to_hl7_date(
                required(
                    period.end.as_deref(),
                    "MedicationRequest.dispenseRequest.validityPeriod.end",
                )?,
                "MedicationRequest.dispenseRequest.validityPeriod.end",
            )?,
        }),
        None => None,
    };

    let expected_use_time = match expected_supply_duration {
        Some(duration) => {
            if duration.code.as_deref() != Some("d") {
                return Err(Error::invalid(
                    "Expected supply duration must be specified in days.",
                    "MedicationRequest.dispenseRequest.expectedSupplyDuration.code",
                ));
            }

            let value = required(
                duration.value.as_ref(),
                "MedicationRequest.dispenseRequest.expectedSupplyDuration.value",
            )?;

            Some(IntervalUnanchored::new(value.to_string(), "d"))
        }
        None => None,
    };

    Ok(DaysSupply::new(effective_time, expected_use_time))
}

/// Authorisation expiry date of a repeat prescription; it must lie in the
/// future.
fn extract_review_date(request: &MedicationRequest) -> Result<Option<&str>, Error> {
    let repeat_information = match extension_or_none(
        &request.extension,
        UK_CORE_REPEAT_INFORMATION_URL,
        "MedicationRequest.extension",
    )? {
        Some(extension) => extension,
        None => return Ok(None),
    };

    let fhir_path = "MedicationRequest.extension.extension";
    let expiry = match extension_or_none(
        repeat_information.extensions(),
        "authorisationExpiryDate",
        fhir_path,
    )? {
        Some(extension) => extension.value_date_time(fhir_path)?,
        None => return Ok(None),
    };

    if !is_future_dated(expiry, Utc::now()) {
        return Err(Error::invalid(
            format!("authorisationExpiryDate is not in the future '{}'.", expiry),
            "MedicationRequest.extension.extension.valueDateTime",
        ));
    }

    Ok(Some(expiry))
}

fn convert_review_date(value: &str) -> Result<Timestamp, Error> {
    const FHIR_PATH: &str = "MedicationRequest.extension.extension.valueDateTime";

    to_hl7_date(value, FHIR_PATH).or_else(|_| date_time_to_hl7_date(value, FHIR_PATH))
}

fn convert_prescription_ids(request: &MedicationRequest) -> Result<Vec<Identifier>, Error> {
    let group_identifier = required(
        request.group_identifier.as_ref(),
        "MedicationRequest.groupIdentifier",
    )?;

    let fhir_path = "MedicationRequest.groupIdentifier.extension";
    let prescription_id = extension(&group_identifier.extension, PRESCRIPTION_ID_URL, fhir_path)?
        .value_identifier(fhir_path)?;
    let short_form_id = required(
        group_identifier.value.as_deref(),
        "MedicationRequest.groupIdentifier.value",
    )?;

    Ok(vec![
        Identifier::global(&prescription_id.value),
        Identifier::short_form(short_form_id),
    ])
}

fn coding_extension_code<'a>(
    extensions: &'a [Extension],
    url: &str,
    fhir_path: &str,
) -> Result<&'a str, Error> {
    let coding = extension(extensions, url, fhir_path)?.value_coding(fhir_path)?;

    required(coding.code.as_deref(), &format!("{}.valueCoding.code", fhir_path))
}

fn extract_medication_list(
    bundle: &Bundle,
    requests: &[&CommunicationRequest],
) -> Result<Vec<String>, Error> {
    let mut ret = Vec::new();

    for reference in requests
        .iter()
        .flat_map(|request| request.payload.iter())
        .filter_map(|payload| payload.content_reference.as_ref())
    {
        let list: &List = resolve_reference(bundle, reference)?;

        ret.extend(
            list.entry
                .iter()
                .filter_map(|entry| entry.item.display())
                .map(ToOwned::to_owned),
        );
    }

    Ok(ret)
}

fn extract_patient_info(requests: &[&CommunicationRequest]) -> Vec<String> {
    requests
        .iter()
        .flat_map(|request| request.payload.iter())
        .filter_map(|payload| payload.content_string.clone())
        .collect()
}

fn convert_prescription(
    bundle: &Bundle,
    requests: &[&MedicationRequest],
) -> Result<Prescription, Error> {
    let first = *required(requests.first(), "Bundle.entry")?;
    let dispense_request = required(
        first.dispense_request.as_ref(),
        "MedicationRequest.dispenseRequest",
    )?;

    let treatment = course_of_therapy_type(requests)?;
    let repeat_number = convert_repeat_number(treatment, first)?;

    let performer = match &dispense_request.performer {
        Some(reference) => {
            let identifier = required(
                reference.identifier(),
                "MedicationRequest.dispenseRequest.performer.identifier",
            )?;

            Some(performer(Identifier::sds_organization(identifier.value.as_str())))
        }
        None => None,
    };

    let component1 = if treatment == TreatmentType::ContinuousRepeatDispensing {
        Some(
            convert_days_supply(
                dispense_request.validity_period.as_ref(),
                dispense_request.expected_supply_duration.as_ref(),
            )?
            .into_component(),
        )
    } else {
        None
    };

    let pertinent_information7 = match extract_review_date(first)? {
        Some(value) => Some(review_date(convert_review_date(value)?)),
        None => None,
    };

    let site_preference = coding_extension_code(
        &dispense_request.extension,
        PERFORMER_SITE_TYPE_URL,
        "MedicationRequest.dispenseRequest.extension",
    )?;
    let prescription_type_code = coding_extension_code(
        &first.extension,
        PRESCRIPTION_TYPE_URL,
        "MedicationRequest.extension",
    )?;

    let communication_requests =
        resources_of_type::<CommunicationRequest>(bundle).collect::<Vec<_>>();
    let medication_list = extract_medication_list(bundle, &communication_requests)?;
    let patient_info = extract_patient_info(&communication_requests);

    let line_items = requests
        .iter()
        .enumerate()
        .map(|(index, request)| {
            let (medication_list, patient_info) = if index == 0 {
                (medication_list.as_slice(), patient_info.as_slice())
            } else {
                (&[] as &[String], &[] as &[String])
            };

            convert_line_item(
                bundle,
                request,
                repeat_number.as_ref(),
                medication_list,
                patient_info,
            )
            .map(line_item)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Prescription {
        class_code: "SBADM",
        mood_code: "RQO",
        id: convert_prescription_ids(first)?,
        code: administration_code(),
        effective_time: Null::NOT_APPLICABLE,
        repeat_number,
        performer,
        author: convert_author(bundle, first, false)?,
        responsible_party: convert_responsible_party(bundle, first, false)?,
        component1,
        pertinent_information7,
        pertinent_information5: treatment_type(treatment.code()),
        pertinent_information1: dispensing_site_preference(Code::new(
            DISPENSING_SITE_PREFERENCE,
            site_preference,
        )),
        pertinent_information2: line_items,
        pertinent_information8: token_issued(false),
        pertinent_information4: prescription_type(Code::new(
            PRESCRIPTION_TYPE,
            prescription_type_code,
        )),
    })
}

/// Parent prescription of an order bundle: the prescription with one line
/// item per medication request, in bundle order.
pub fn convert_parent_prescription(bundle: &Bundle) -> Result<ParentPrescription, Error> {
    let requests = resources_of_type::<MedicationRequest>(bundle).collect::<Vec<_>>();
    if requests.is_empty() {
        return Err(Error::too_few(
            "Too few values submitted. Expected at least 1 element where resource.resourceType == 'MedicationRequest'.",
            "Bundle.entry",
        ));
    }

    let authored_on = required(requests[0].authored_on.as_deref(), "MedicationRequest.authoredOn")?;
    let effective_time = to_hl7_date_time(authored_on, "MedicationRequest.authoredOn")?;

    let patient = convert_patient(patient(bundle)?)?;
    let prescription = convert_prescription(bundle, &requests)?;

    Ok(ParentPrescription::new(
        Identifier::global(bundle_id(bundle)?),
        effective_time,
        record_target(patient),
        prescription,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{from_value, json};

    fn medication_request(course_of_therapy: &str) -> MedicationRequest {
        from_value(json!({
            "resourceType": "MedicationRequest",
            "courseOfTherapyType": {
                "coding": [
                    {
                        "system": "http://terminology.hl7.org/CodeSystem/medicationrequest-course-of-therapy",
                        "code": course_of_therapy
                    }
                ]
            },
            "dispenseRequest": { "numberOfRepeatsAllowed": 5 }
        }))
        .unwrap()
    }

    #[test]
    fn course_of_therapy_of_uniform_requests() {
        let acute = medication_request("acute");
        let continuous = medication_request("continuous");
        let repeat_dispensing = medication_request("continuous-repeat-dispensing");

        assert_eq!(TreatmentType::Acute, course_of_therapy_type(&[&acute, &acute]).unwrap());
        assert_eq!(
            TreatmentType::ContinuousRepeatPrescribing,
            course_of_therapy_type(&[&continuous, &continuous]).unwrap()
        );
        assert_eq!(
            TreatmentType::ContinuousRepeatDispensing,
            course_of_therapy_type(&[&repeat_dispensing]).unwrap()
        );
    }

    #[test]
    fn mixed_acute_and_repeat_prescribing_is_acute() {
        let acute = medication_request("acute");
        let continuous = medication_request("continuous");

        assert_eq!(
            TreatmentType::Acute,
            course_of_therapy_type(&[&continuous, &acute]).unwrap()
        );
    }

    #[test]
    fn mixed_repeat_dispensing_is_invalid() {
        let acute = medication_request("acute");
        let repeat_dispensing = medication_request("continuous-repeat-dispensing");

        let err = course_of_therapy_type(&[&repeat_dispensing, &acute]).unwrap_err();

        assert_eq!(
            Some("MedicationRequest.courseOfTherapyType.coding.code"),
            err.fhir_path()
        );
    }

    #[test]
    fn repeat_numbers_follow_the_course_of_therapy() {
        let request = medication_request("continuous-repeat-dispensing");

        assert_eq!(None, convert_repeat_number(TreatmentType::Acute, &request).unwrap());
        assert_eq!(
            Some(Interval {
                low: NumericValue::new("1"),
                high: NumericValue::new("1"),
            }),
            convert_repeat_number(TreatmentType::ContinuousRepeatPrescribing, &request).unwrap()
        );
        assert_eq!(
            Some(Interval {
                low: NumericValue::new("1"),
                high: NumericValue::new("5"),
            }),
            convert_repeat_number(TreatmentType::ContinuousRepeatDispensing, &request).unwrap()
        );
    }

    #[test]
    fn repeat_dispensing_requires_repeats_allowed() {
        let mut request = medication_request("continuous-repeat-dispensing");
        request.dispense_request = None;

        assert_eq!(
            Error::invalid(
                "Number of repeats allowed is required.",
                "MedicationRequest.dispenseRequest.numberOfRepeatsAllowed"
            ),
            convert_repeat_number(TreatmentType::ContinuousRepeatDispensing, &request).unwrap_err()
        );
    }

    #[test]
    fn repeats_allowed_prefers_based_on() {
        let mut request = medication_request("continuous-repeat-dispensing");
        request.based_on = from_value(json!([
            {
                "extension": [
                    {
                        "url": "https://fhir.nhs.uk/StructureDefinition/Extension-EPS-RepeatInformation",
                        "extension": [ { "url": "numberOfRepeatsAllowed", "valueInteger": 2 } ]
                    }
                ]
            }
        ]))
        .unwrap();

        assert_eq!("2", repeats_allowed(&request).unwrap());
    }

    #[test]
    fn repeats_allowed_must_be_an_integer() {
        let mut request = medication_request("continuous-repeat-dispensing");
        request.dispense_request = from_value(json!({ "numberOfRepeatsAllowed": 5.0 })).unwrap();

        assert_eq!(
            Error::invalid(
                "Expected an integer but got '5.0'.",
                "MedicationRequest.dispenseRequest.numberOfRepeatsAllowed"
            ),
            repeats_allowed(&request).unwrap_err()
        );

        request.dispense_request = from_value(json!({ "numberOfRepeatsAllowed": "6" })).unwrap();

        assert_eq!("6", repeats_allowed(&request).unwrap());
    }

    #[test]
    fn supply_duration_must_be_in_days() {
        let duration: Quantity = from_value(json!({ "value": 4, "unit": "week", "code": "wk" })).unwrap();

        assert_eq!(
            Error::invalid(
                "Expected supply duration must be specified in days.",
                "MedicationRequest.dispenseRequest.expectedSupplyDuration.code"
            ),
            convert_days_supply(None, Some(&duration)).unwrap_err()
        );
    }

    #[test]
    fn past_review_dates_are_invalid() {
        let request: MedicationRequest = from_value(json!({
            "resourceType": "MedicationRequest",
            "extension": [
                {
                    "url": "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-MedicationRepeatInformation",
                    "extension": [ { "url": "authorisationExpiryDate", "valueDateTime": "2020-01-01" } ]
                }
            ]
        }))
        .unwrap();

        assert_eq!(
            Error::invalid(
                "authorisationExpiryDate is not in the future '2020-01-01'.",
                "MedicationRequest.extension.extension.valueDateTime"
            ),
            extract_review_date(&request).unwrap_err()
        );
    }

    #[test]
    fn future_review_dates_are_converted() {
        assert_eq!("29990101", convert_review_date("2999-01-01").unwrap().value);
        assert_eq!("29990101", convert_review_date("2999-01-01T10:00:00+00:00").unwrap().value);
    }
}
