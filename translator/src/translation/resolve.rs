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

//! Cardinality checked lookups over bundles, identifiers, codings and
//! extensions. Every failure names the FHIR path it was raised for.

use std::borrow::Cow;

use resources::{
    misc::{CodeableConcept, Coding, Extension, HumanName, Identifier, Reference},
    Bundle, Claim, CommunicationRequest, HealthcareService, List, Location, Medication,
    MedicationDispense, MedicationRequest, MessageHeader, Organization, Parameters, Patient,
    Practitioner, PractitionerRole, Provenance, Resource, Task,
};

use super::Error;

/// Typed view onto a `Resource` variant.
pub trait ResourceType: Sized {
    const NAME: &'static str;

    fn from_resource(resource: &Resource) -> Option<&Self>;
}

macro_rules! resource_type {
    ($($t:ident),* $(,)?) => {
        $(
            impl ResourceType for $t {
                const NAME: &'static str = stringify!($t);

                fn from_resource(resource: &Resource) -> Option<&Self> {
                    match resource {
                        Resource::$t(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*
    };
}

resource_type!(
    Claim,
    CommunicationRequest,
    HealthcareService,
    List,
    Location,
    Medication,
    MedicationDispense,
    MedicationRequest,
    MessageHeader,
    Organization,
    Parameters,
    Patient,
    Practitioner,
    PractitionerRole,
    Provenance,
    Task,
);

impl ResourceType for Bundle {
    const NAME: &'static str = "Bundle";

    fn from_resource(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Bundle(value) => Some(value.as_ref()),
            _ => None,
        }
    }
}

fn where_clause(context: Option<&str>) -> String {
    match context {
        Some(context) => format!(" where {}", context),
        None => String::new(),
    }
}

/// Returns the one element of the iterator, failing if there are none or more.
pub fn only_element<I>(iter: I, fhir_path: &str, context: Option<&str>) -> Result<I::Item, Error>
where
    I: IntoIterator,
{
    let mut iter = iter.into_iter();

    let first = iter.next().ok_or_else(|| {
        Error::too_few(
            format!(
                "Too few values submitted. Expected 1 element{}.",
                where_clause(context)
            ),
            fhir_path,
        )
    })?;

    if iter.next().is_some() {
        return Err(Error::too_many(
            format!(
                "Too many values submitted. Expected 1 element{}.",
                where_clause(context)
            ),
            fhir_path,
        ));
    }

    Ok(first)
}

/// Returns the element of the iterator if there is exactly one, nothing if
/// it is empty and fails if there are more.
pub fn only_element_or_none<I>(
    iter: I,
    fhir_path: &str,
    context: Option<&str>,
) -> Result<Option<I::Item>, Error>
where
    I: IntoIterator,
{
    let mut iter = iter.into_iter();
    let first = iter.next();

    if first.is_some() && iter.next().is_some() {
        return Err(Error::too_many(
            format!(
                "Too many values submitted. Expected at most 1 element{}.",
                where_clause(context)
            ),
            fhir_path,
        ));
    }

    Ok(first)
}

pub fn required<'a, T>(value: Option<&'a T>, fhir_path: &str) -> Result<&'a T, Error>
where
    T: ?Sized,
{
    value.ok_or_else(|| {
        Error::missing(
            format!("Required field {} is missing.", fhir_path),
            fhir_path,
        )
    })
}

pub fn resources_of_type<'a, T: ResourceType + 'a>(
    bundle: &'a Bundle,
) -> impl Iterator<Item = &'a T> {
    bundle
        .entry
        .iter()
        .filter_map(|entry| T::from_resource(&entry.resource))
}

pub fn only_resource_of_type<T: ResourceType>(bundle: &Bundle) -> Result<&T, Error> {
    only_element(
        resources_of_type::<T>(bundle),
        "Bundle.entry",
        Some(&format!("resource.resourceType == '{}'", T::NAME)),
    )
}

pub fn resource_for_full_url<'a>(
    bundle: &'a Bundle,
    full_url: &str,
) -> Result<&'a Resource, Error> {
    only_element(
        bundle
            .entry
            .iter()
            .filter(|entry| entry.full_url.as_deref() == Some(full_url)),
        "Bundle.entry",
        Some(&format!("fullUrl == '{}'", full_url)),
    )
    .map(|entry| &entry.resource)
}

/// Resolves a pointer reference against the bundle entries' full URLs.
pub fn resolve_reference<'a, T: ResourceType>(
    bundle: &'a Bundle,
    reference: &Reference,
) -> Result<&'a T, Error> {
    let url = reference.pointer().ok_or_else(|| {
        Error::invalid(
            format!("Expected a reference to a {} in the bundle.", T::NAME),
            "Bundle.entry",
        )
    })?;

    let resource = resource_for_full_url(bundle, url)?;

    T::from_resource(resource).ok_or_else(|| {
        Error::invalid(
            format!(
                "Resource with fullUrl '{}' is not of type {}.",
                url,
                T::NAME
            ),
            "Bundle.entry",
        )
    })
}

/// Resolves a `#id` reference against the contained resources of a parent.
pub fn resolve_contained<'a, T: ResourceType>(
    contained: &'a [Resource],
    reference: &Reference,
    fhir_path: &str,
) -> Result<&'a T, Error> {
    let pointer = reference.pointer().ok_or_else(|| {
        Error::invalid(
            format!("Expected a reference to a contained {}.", T::NAME),
            fhir_path,
        )
    })?;
    let id = pointer.trim_start_matches('#');

    let resource = contained
        .iter()
        .find(|resource| resource.id() == Some(id))
        .ok_or_else(|| {
            Error::invalid(
                format!("Contained resource with reference {} not found", pointer),
                fhir_path,
            )
        })?;

    T::from_resource(resource).ok_or_else(|| {
        Error::invalid(
            format!(
                "Contained resource with reference {} is not of type {}",
                pointer,
                T::NAME
            ),
            fhir_path,
        )
    })
}

pub fn identifier_value<'a>(
    identifiers: &'a [Identifier],
    system: &str,
    fhir_path: &str,
) -> Result<&'a str, Error> {
    only_element(
        identifiers.iter().filter(|i| i.system == system),
        fhir_path,
        Some(&format!("system == '{}'", system)),
    )
    .map(|i| i.value.as_str())
}

pub fn identifier_value_or_none<'a>(
    identifiers: &'a [Identifier],
    system: &str,
    fhir_path: &str,
) -> Result<Option<&'a str>, Error> {
    only_element_or_none(
        identifiers.iter().filter(|i| i.system == system),
        fhir_path,
        Some(&format!("system == '{}'", system)),
    )
    .map(|i| i.map(|i| i.value.as_str()))
}

pub fn coding_for_system<'a>(
    codings: &'a [Coding],
    system: &str,
    fhir_path: &str,
) -> Result<&'a Coding, Error> {
    only_element(
        codings.iter().filter(|c| c.is_system(system)),
        fhir_path,
        Some(&format!("system == '{}'", system)),
    )
}

pub fn coding_for_system_or_none<'a>(
    codings: &'a [Coding],
    system: &str,
    fhir_path: &str,
) -> Result<Option<&'a Coding>, Error> {
    only_element_or_none(
        codings.iter().filter(|c| c.is_system(system)),
        fhir_path,
        Some(&format!("system == '{}'", system)),
    )
}

pub fn codeable_concept_coding<'a, I>(
    concepts: I,
    system: &str,
    fhir_path: &str,
) -> Result<&'a Coding, Error>
where
    I: IntoIterator<Item = &'a CodeableConcept>,
{
    only_element(
        concepts
            .into_iter()
            .flat_map(|c| c.coding.iter())
            .filter(|c| c.is_system(system)),
        &format!("{}.coding", fhir_path),
        Some(&format!("system == '{}'", system)),
    )
}

pub fn codeable_concept_coding_or_none<'a, I>(
    concepts: I,
    system: &str,
    fhir_path: &str,
) -> Result<Option<&'a Coding>, Error>
where
    I: IntoIterator<Item = &'a CodeableConcept>,
{
    only_element_or_none(
        concepts
            .into_iter()
            .flat_map(|c| c.coding.iter())
            .filter(|c| c.is_system(system)),
        &format!("{}.coding", fhir_path),
        Some(&format!("system == '{}'", system)),
    )
}

pub fn extension<'a>(
    extensions: &'a [Extension],
    url: &str,
    fhir_path: &str,
) -> Result<&'a Extension, Error> {
    only_element(
        extensions.iter().filter(|e| e.url == url),
        fhir_path,
        Some(&format!("url == '{}'", url)),
    )
}

pub fn extension_or_none<'a>(
    extensions: &'a [Extension],
    url: &str,
    fhir_path: &str,
) -> Result<Option<&'a Extension>, Error> {
    only_element_or_none(
        extensions.iter().filter(|e| e.url == url),
        fhir_path,
        Some(&format!("url == '{}'", url)),
    )
}

/// Typed accessors for the value of an extension; a value of the wrong kind
/// is an invalid value at the given path.
pub trait ExtensionExt {
    fn value_coding(&self, fhir_path: &str) -> Result<&Coding, Error>;
    fn value_identifier(&self, fhir_path: &str) -> Result<&Identifier, Error>;
    fn value_string(&self, fhir_path: &str) -> Result<&str, Error>;
    fn value_integer(&self, fhir_path: &str) -> Result<&str, Error>;
    fn value_reference(&self, fhir_path: &str) -> Result<&Reference, Error>;
    fn value_date_time(&self, fhir_path: &str) -> Result<&str, Error>;
    fn value_boolean(&self, fhir_path: &str) -> Result<bool, Error>;
}

impl ExtensionExt for Extension {
    fn value_coding(&self, fhir_path: &str) -> Result<&Coding, Error> {
        self.coding().ok_or_else(|| wrong_value(self, "valueCoding", fhir_path))
    }

    fn value_identifier(&self, fhir_path: &str) -> Result<&Identifier, Error> {
        self.identifier()
            .ok_or_else(|| wrong_value(self, "valueIdentifier", fhir_path))
    }

    fn value_string(&self, fhir_path: &str) -> Result<&str, Error> {
        self.string().ok_or_else(|| wrong_value(self, "valueString", fhir_path))
    }

    fn value_integer(&self, fhir_path: &str) -> Result<&str, Error> {
        self.integer()
            .map(|i| i.as_str())
            .ok_or_else(|| wrong_value(self, "valueInteger", fhir_path))
    }

    fn value_reference(&self, fhir_path: &str) -> Result<&Reference, Error> {
        self.reference()
            .ok_or_else(|| wrong_value(self, "valueReference", fhir_path))
    }

    fn value_date_time(&self, fhir_path: &str) -> Result<&str, Error> {
        self.date_time()
            .ok_or_else(|| wrong_value(self, "valueDateTime", fhir_path))
    }

    fn value_boolean(&self, fhir_path: &str) -> Result<bool, Error> {
        self.boolean()
            .ok_or_else(|| wrong_value(self, "valueBoolean", fhir_path))
    }
}

fn wrong_value(extension: &Extension, expected: &str, fhir_path: &str) -> Error {
    Error::invalid(
        format!("Extension {} is expected to have a {}.", extension.url, expected),
        fhir_path,
    )
}

pub fn string_parameter<'a>(parameters: &'a Parameters, name: &str) -> Result<&'a str, Error> {
    only_element(
        parameters
            .parameter
            .iter()
            .filter(|p| p.name == name)
            .filter_map(|p| p.value_string.as_deref()),
        "Parameters.parameter",
        Some(&format!("name == '{}'", name)),
    )
}

pub fn identifier_parameter_or_none<'a>(
    parameters: &'a Parameters,
    name: &str,
) -> Result<Option<&'a Identifier>, Error> {
    only_element_or_none(
        parameters
            .parameter
            .iter()
            .filter(|p| p.name == name)
            .filter_map(|p| p.value_identifier.as_ref()),
        "Parameters.parameter",
        Some(&format!("name == '{}'", name)),
    )
}

pub fn identifier_parameter<'a>(
    parameters: &'a Parameters,
    name: &str,
) -> Result<&'a Identifier, Error> {
    only_element(
        parameters
            .parameter
            .iter()
            .filter(|p| p.name == name)
            .filter_map(|p| p.value_identifier.as_ref()),
        "Parameters.parameter",
        Some(&format!("name == '{}'", name)),
    )
}

pub fn resource_parameter<'a, T: ResourceType>(
    parameters: &'a Parameters,
    name: &str,
) -> Result<&'a T, Error> {
    let resource = parameters
        .parameter
        .iter()
        .filter(|p| p.name == name)
        .find_map(|p| p.resource.as_ref())
        .ok_or_else(|| {
            Error::invalid(
                format!("Parameter with name {} not found", name),
                "Parameters.parameter",
            )
        })?;

    T::from_resource(resource).ok_or_else(|| {
        Error::invalid(
            format!("Parameter with name {} has wrong resourceType", name),
            "Parameters.parameter",
        )
    })
}

/// Resolves a resource named by a `Type/id` reference among the resource
/// parameters.
pub fn parameters_reference<'a, T: ResourceType>(
    parameters: &'a Parameters,
    reference: &Reference,
) -> Result<&'a T, Error> {
    let pointer = reference.pointer().unwrap_or_default();
    let mut split = pointer.splitn(2, '/');
    let resource_type = split.next().unwrap_or_default();
    let resource_id = split.next().unwrap_or_default();

    let mut candidates = parameters
        .parameter
        .iter()
        .filter_map(|p| p.resource.as_ref())
        .filter(|r| T::from_resource(r).is_some())
        .peekable();

    if candidates.peek().is_none() {
        return Err(Error::invalid(
            format!("Parameter with resourceType {} not found", resource_type),
            "Parameters.parameter",
        ));
    }

    candidates
        .find(|r| r.id() == Some(resource_id))
        .and_then(T::from_resource)
        .ok_or_else(|| {
            Error::invalid(
                format!(
                    "Parameter of type {} with id {} not found",
                    resource_type, resource_id
                ),
                "Parameters.parameter",
            )
        })
}

pub const MESSAGE_ID_SYSTEM: &str = "https://tools.ietf.org/html/rfc4122";

pub fn message_id<'a>(identifiers: &'a [Identifier], fhir_path: &str) -> Result<&'a str, Error> {
    identifier_value(identifiers, MESSAGE_ID_SYSTEM, fhir_path)
}

pub fn bundle_id(bundle: &Bundle) -> Result<&str, Error> {
    let identifiers = bundle
        .identifier
        .as_ref()
        .map(std::slice::from_ref)
        .unwrap_or_default();

    message_id(identifiers, "Bundle.identifier")
}

pub fn task_id(task: &Task) -> Result<&str, Error> {
    message_id(&task.identifier, "Task.identifier")
}

pub fn claim_id(claim: &Claim) -> Result<&str, Error> {
    message_id(&claim.identifier, "Claim.identifier")
}

pub fn message_header(bundle: &Bundle) -> Result<&MessageHeader, Error> {
    only_resource_of_type(bundle)
}

pub fn patient(bundle: &Bundle) -> Result<&Patient, Error> {
    only_resource_of_type(bundle)
}

/// Resolves the practitioner of a role, synthesizing one from an
/// identifier reference.
pub fn resolve_practitioner<'a>(
    bundle: &'a Bundle,
    reference: &Reference,
) -> Result<Cow<'a, Practitioner>, Error> {
    match reference {
        Reference::Pointer { .. } => resolve_reference(bundle, reference).map(Cow::Borrowed),
        Reference::Identifier {
            identifier,
            display,
        } => Ok(Cow::Owned(Practitioner {
            identifier: vec![identifier.clone()],
            name: vec![HumanName {
                text: display.clone(),
                ..Default::default()
            }],
            ..Default::default()
        })),
    }
}

pub const ORGANISATION_ROLE_SYSTEM: &str = "https://fhir.nhs.uk/CodeSystem/organisation-role";

/// Resolves the organization of a role. An identifier reference yields an
/// NHS trust carrying the role's telecoms and the addresses of its locations.
pub fn resolve_organization<'a>(
    bundle: &'a Bundle,
    role: &PractitionerRole,
) -> Result<Cow<'a, Organization>, Error> {
    let reference = required(role.organization.as_ref(), "PractitionerRole.organization")?;

    match reference {
        Reference::Pointer { .. } => resolve_reference(bundle, reference).map(Cow::Borrowed),
        Reference::Identifier {
            identifier,
            display,
        } => {
            let address = role
                .location
                .iter()
                .map(|location| resolve_reference::<Location>(bundle, location))
                .filter_map(|location| match location {
                    Ok(location) => location.address.clone().map(Ok),
                    Err(err) => Some(Err(err)),
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Cow::Owned(Organization {
                identifier: vec![identifier.clone()],
                type_: vec![CodeableConcept {
                    coding: vec![Coding {
                        system: Some(ORGANISATION_ROLE_SYSTEM.into()),
                        code: Some("197".into()),
                        display: Some("NHS TRUST".into()),
                    }],
                    text: None,
                }],
                name: display.clone(),
                telecom: role.telecom.clone(),
                address,
                ..Default::default()
            }))
        }
    }
}

/// Resolves the first healthcare service of a role, synthesizing one from an
/// identifier reference.
pub fn resolve_healthcare_service<'a>(
    bundle: &'a Bundle,
    role: &PractitionerRole,
) -> Result<Cow<'a, HealthcareService>, Error> {
    let reference = required(
        role.healthcare_service.first(),
        "PractitionerRole.healthcareService",
    )?;

    match reference {
        Reference::Pointer { .. } => resolve_reference(bundle, reference).map(Cow::Borrowed),
        Reference::Identifier {
            identifier,
            display,
        } => Ok(Cow::Owned(HealthcareService {
            identifier: vec![identifier.clone()],
            name: display.clone(),
            telecom: role.telecom.clone(),
            location: role.location.clone(),
            ..Default::default()
        })),
    }
}

pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// SNOMED coding of the medication, either inline or from a referenced
/// `Medication` entry.
pub fn medication_coding<'a>(
    bundle: &'a Bundle,
    concept: Option<&'a CodeableConcept>,
    reference: Option<&Reference>,
) -> Result<&'a Coding, Error> {
    if let Some(concept) = concept {
        return coding_for_system(
            &concept.coding,
            SNOMED_SYSTEM,
            "MedicationRequest.medicationCodeableConcept.coding",
        );
    }

    let reference = required(reference, "MedicationRequest.medicationReference")?;
    let medication: &Medication = resolve_reference(bundle, reference)?;
    let codings = medication
        .code
        .as_ref()
        .map(|c| c.coding.as_slice())
        .unwrap_or_default();

    coding_for_system(codings, SNOMED_SYSTEM, "Medication.code.coding")
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{from_value, json};

    fn bundle() -> Bundle {
        from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {
                    "fullUrl": "urn:uuid:patient",
                    "resource": { "resourceType": "Patient", "id": "patient" }
                },
                {
                    "fullUrl": "urn:uuid:duplicate",
                    "resource": { "resourceType": "Practitioner", "id": "first" }
                },
                {
                    "fullUrl": "urn:uuid:duplicate",
                    "resource": { "resourceType": "Practitioner", "id": "second" }
                }
            ]
        }))
        .unwrap()
    }

    fn pointer(url: &str) -> Reference {
        Reference::Pointer {
            reference: url.into(),
            display: None,
        }
    }

    #[test]
    fn resolves_references_by_full_url() {
        let bundle = bundle();

        let patient: &Patient = resolve_reference(&bundle, &pointer("urn:uuid:patient")).unwrap();

        assert_eq!(Some("patient"), patient.id.as_deref());
    }

    #[test]
    fn resolving_is_idempotent() {
        let bundle = bundle();
        let reference = pointer("urn:uuid:patient");

        let first: &Patient = resolve_reference(&bundle, &reference).unwrap();
        let second: &Patient = resolve_reference(&bundle, &reference).unwrap();

        assert_eq!(first, second);
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn duplicate_full_urls_are_too_many_values() {
        let err = resolve_reference::<Practitioner>(&bundle(), &pointer("urn:uuid:duplicate")).unwrap_err();

        assert_eq!(
            Error::too_many(
                "Too many values submitted. Expected 1 element where fullUrl == 'urn:uuid:duplicate'.",
                "Bundle.entry"
            ),
            err
        );
    }

    #[test]
    fn missing_full_urls_are_too_few_values() {
        let err = resolve_reference::<Patient>(&bundle(), &pointer("urn:uuid:unknown")).unwrap_err();

        assert_eq!(
            Error::too_few(
                "Too few values submitted. Expected 1 element where fullUrl == 'urn:uuid:unknown'.",
                "Bundle.entry"
            ),
            err
        );
    }

    #[test]
    fn wrong_resource_type_is_invalid() {
        let err = resolve_reference::<Practitioner>(&bundle(), &pointer("urn:uuid:patient")).unwrap_err();

        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn only_resource_of_type_counts_entries() {
        let bundle = bundle();

        assert!(only_resource_of_type::<Patient>(&bundle).is_ok());
        assert!(matches!(
            only_resource_of_type::<Practitioner>(&bundle),
            Err(Error::TooManyValues { .. })
        ));
        assert!(matches!(
            only_resource_of_type::<MessageHeader>(&bundle),
            Err(Error::TooFewValues { .. })
        ));
    }

    #[test]
    fn identifiers_are_looked_up_by_system() {
        let identifiers = vec![
            Identifier::new("https://fhir.nhs.uk/Id/nhs-number", "9446362968"),
            Identifier::new("https://fhir.nhs.uk/Id/other", "1"),
            Identifier::new("https://fhir.nhs.uk/Id/other", "2"),
        ];

        assert_eq!(
            "9446362968",
            identifier_value(&identifiers, "https://fhir.nhs.uk/Id/nhs-number", "Patient.identifier").unwrap()
        );
        assert_eq!(
            None,
            identifier_value_or_none(&identifiers, "https://fhir.nhs.uk/Id/missing", "Patient.identifier").unwrap()
        );
        assert_eq!(
            Err(Error::too_many(
                "Too many values submitted. Expected at most 1 element where system == 'https://fhir.nhs.uk/Id/other'.",
                "Patient.identifier"
            )),
            identifier_value_or_none(&identifiers, "https://fhir.nhs.uk/Id/other", "Patient.identifier")
        );
    }

    #[test]
    fn codeable_concept_codings_extend_the_path() {
        let concepts: Vec<CodeableConcept> = from_value(json!([
            { "coding": [ { "system": "https://example.org/a", "code": "1" } ] }
        ]))
        .unwrap();

        let err = codeable_concept_coding(&concepts, "https://example.org/b", "MedicationRequest.category")
            .unwrap_err();

        assert_eq!(Some("MedicationRequest.category.coding"), err.fhir_path());
    }

    #[test]
    fn contained_resources_are_resolved_by_id() {
        let contained: Vec<Resource> = from_value(json!([
            { "resourceType": "PractitionerRole", "id": "requester" },
            { "resourceType": "Organization", "id": "organization" }
        ]))
        .unwrap();

        let role: &PractitionerRole =
            resolve_contained(&contained, &pointer("#requester"), "Task.requester").unwrap();
        assert_eq!(Some("requester"), role.id.as_deref());

        let err = resolve_contained::<PractitionerRole>(&contained, &pointer("#organization"), "Task.requester")
            .unwrap_err();
        assert_eq!(
            Error::invalid(
                "Contained resource with reference #organization is not of type PractitionerRole",
                "Task.requester"
            ),
            err
        );

        let err = resolve_contained::<PractitionerRole>(&contained, &pointer("#missing"), "Task.requester")
            .unwrap_err();
        assert_eq!(
            Error::invalid("Contained resource with reference #missing not found", "Task.requester"),
            err
        );
    }
}
