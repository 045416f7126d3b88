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
    misc::{Address as FhirAddress, ContactPoint, HumanName},
    Patient as FhirPatient,
};

use crate::hl7v3::{
    codes::{Code, Identifier, Sex},
    core::{Address, AddressUse, Name, NameUse, Telecom, TelecomUse},
    patient::{Patient, PatientPerson},
};

use super::{
    dates::to_hl7_date,
    resolve::{identifier_value, required},
    Error,
};

pub const NHS_NUMBER_SYSTEM: &str = "https://fhir.nhs.uk/Id/nhs-number";
pub const ODS_ORGANIZATION_SYSTEM: &str = "https://fhir.nhs.uk/Id/ods-organization-code";

/// General practice used when the patient has no registered practice.
const UNKNOWN_GENERAL_PRACTITIONER: &str = "V81999";

pub fn convert_name(name: &HumanName, fhir_path: &str) -> Result<Name, Error> {
    let use_ = match name.use_.as_deref() {
        None => None,
        Some("usual") | Some("official") => Some(NameUse::Usual),
        Some("temp") | Some("anonymous") => Some(NameUse::Alias),
        Some("nickname") => Some(NameUse::Preferred),
        Some("old") => Some(NameUse::Previous),
        Some("maiden") => Some(NameUse::PreviousMaiden),
        Some(other) => {
            return Err(Error::invalid(
                format!("Unhandled name use '{}'.", other),
                format!("{}.use", fhir_path),
            ))
        }
    };

    let is_structured = name.family.is_some()
        || !name.given.is_empty()
        || !name.prefix.is_empty()
        || !name.suffix.is_empty();

    let mut ret = match (&name.text, is_structured) {
        (Some(text), false) => Name::text(text.as_str()),
        _ => Name {
            prefix: name.prefix.clone(),
            given: name.given.clone(),
            family: name.family.clone(),
            suffix: name.suffix.clone(),
            ..Default::default()
        },
    };
    ret.use_ = use_;

    Ok(ret)
}

pub fn convert_telecom(contact_point: &ContactPoint, fhir_path: &str) -> Result<Telecom, Error> {
    let use_ = match contact_point.use_.as_deref() {
        None => None,
        Some("home") => Some(TelecomUse::PermanentHome),
        Some("work") => Some(TelecomUse::Workplace),
        Some("temp") => Some(TelecomUse::Temporary),
        Some("mobile") => Some(TelecomUse::Mobile),
        Some(other) => {
            return Err(Error::invalid(
                format!("Unhandled telecom use '{}'.", other),
                format!("{}.use", fhir_path),
            ))
        }
    };

    Ok(Telecom::new(use_, contact_point.value.as_deref()))
}

pub fn convert_address(address: &FhirAddress, fhir_path: &str) -> Result<Address, Error> {
    let use_ = match address.use_.as_deref() {
        None => None,
        Some("home") => Some(AddressUse::Home),
        Some("work") => Some(AddressUse::Work),
        Some("temp") => Some(AddressUse::Temporary),
        Some("billing") => Some(AddressUse::Postal),
        Some(other) => {
            return Err(Error::invalid(
                format!("Unhandled address use '{}'.", other),
                format!("{}.use", fhir_path),
            ))
        }
    };

    let street_address_line = address
        .line
        .iter()
        .chain(address.city.iter())
        .chain(address.district.iter())
        .chain(address.state.iter())
        .filter(|line| !line.is_empty())
        .cloned()
        .collect();

    Ok(Address {
        use_,
        street_address_line,
        postal_code: address.postal_code.clone(),
    })
}

pub fn convert_gender(gender: &str, fhir_path: &str) -> Result<Code, Error> {
    let sex = match gender {
        "male" => Sex::Male,
        "female" => Sex::Female,
        "other" => Sex::Indeterminate,
        "unknown" => Sex::Unknown,
        other => {
            return Err(Error::invalid(
                format!("Unhandled gender '{}'.", other),
                fhir_path,
            ))
        }
    };

    Ok(sex.code())
}

pub fn nhs_number(patient: &FhirPatient) -> Result<&str, Error> {
    identifier_value(&patient.identifier, NHS_NUMBER_SYSTEM, "Patient.identifier")
}

/// Patient with full demographics as carried by prescriptions and
/// cancellations.
pub fn convert_patient(patient: &FhirPatient) -> Result<Patient, Error> {
    let mut ret = Patient::new(Identifier::nhs_number(nhs_number(patient)?));

    ret.addr = patient
        .address
        .iter()
        .map(|address| convert_address(address, "Patient.address"))
        .collect::<Result<_, _>>()?;
    ret.telecom = patient
        .telecom
        .iter()
        .map(|telecom| convert_telecom(telecom, "Patient.telecom"))
        .collect::<Result<_, _>>()?;

    let names = patient
        .name
        .iter()
        .map(|name| convert_name(name, "Patient.name"))
        .collect::<Result<_, _>>()?;
    let gender = convert_gender(
        required(patient.gender.as_deref(), "Patient.gender")?,
        "Patient.gender",
    )?;
    let birth_time = to_hl7_date(
        required(patient.birth_date.as_deref(), "Patient.birthDate")?,
        "Patient.birthDate",
    )?;

    let general_practitioner = patient
        .general_practitioner
        .iter()
        .filter_map(|gp| gp.identifier())
        .find(|identifier| identifier.system == ODS_ORGANIZATION_SYSTEM)
        .map(|identifier| identifier.value.as_str())
        .unwrap_or(UNKNOWN_GENERAL_PRACTITIONER);

    ret.patient_person = Some(PatientPerson::new(
        names,
        gender,
        birth_time,
        Identifier::sds_organization(general_practitioner),
    ));

    Ok(ret)
}
