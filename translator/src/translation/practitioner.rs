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

use std::borrow::Cow;

use resources::{
    misc::{Identifier as FhirIdentifier, Reference},
    provenance::Signature,
    Bundle, MedicationRequest, Organization as FhirOrganization, Practitioner, PractitionerRole,
    Provenance,
};

use crate::{
    hl7v3::{
        agent::{AgentPerson, AgentPersonPerson, AgentPersonSds, Participant},
        codes::{Code, Identifier, SDS_JOB_ROLE},
        core::{Name, RawXml, SignatureText, Telecom},
        Null, Timestamp,
    },
    xml::Element,
};

use super::{
    dates::{now, to_hl7_date_time},
    demographics::{convert_name, convert_telecom, ODS_ORGANIZATION_SYSTEM},
    organization::{convert_dispensing_organization, convert_represented_organization},
    resolve::{
        codeable_concept_coding, extension_or_none, identifier_value, identifier_value_or_none,
        only_element, only_element_or_none, required, resolve_organization,
        resolve_practitioner, resolve_reference, resources_of_type, ExtensionExt,
    },
    Error,
};

pub const SDS_ROLE_PROFILE_SYSTEM: &str = "https://fhir.nhs.uk/Id/sds-role-profile-id";
pub const SDS_USER_SYSTEM: &str = "https://fhir.nhs.uk/Id/sds-user-id";
pub const JOB_ROLE_NAME_SYSTEM: &str = "https://fhir.hl7.org.uk/CodeSystem/UKCore-SDSJobRoleName";

const RESPONSIBLE_PRACTITIONER_URL: &str =
    "https://fhir.nhs.uk/StructureDefinition/Extension-DM-ResponsiblePractitioner";

const GMC_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/gmc-number";
const GMP_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/gmp-number";
const NMC_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/nmc-number";
const GPHC_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/gphc-number";
const HCPC_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/hcpc-number";
const PROFESSIONAL_CODE_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/professional-code";
const SPURIOUS_CODE_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/nhsbsa-spurious-code";
const DIN_SYSTEM: &str = "https://fhir.hl7.org.uk/Id/din-number";

type PersonIdFn = fn(&[FhirIdentifier], &[FhirIdentifier]) -> Result<Identifier, Error>;

/// Author of a prescription or cancellation. Prescriptions carry the
/// requester's signature from a matching `Provenance`, or the current time
/// without signature if there is none.
pub fn convert_author(
    bundle: &Bundle,
    request: &MedicationRequest,
    is_cancellation: bool,
) -> Result<Participant, Error> {
    let requester = required(request.requester.as_ref(), "MedicationRequest.requester")?;
    let role: &PractitionerRole = resolve_reference(bundle, requester)?;
    let person_id: PersonIdFn = if is_cancellation {
        sds_user_person_id
    } else {
        author_person_id
    };
    let agent_person = convert_practitioner_role(bundle, role, person_id, !is_cancellation)?;

    let author = Participant::new("AUT", agent_person).overriding();
    if is_cancellation {
        return Ok(author);
    }

    let (time, signature_text) = match requester_signature(bundle, requester)? {
        Some(signature) => convert_signature(signature)?,
        None => (now(), SignatureText::NotApplicable(Null::NOT_APPLICABLE)),
    };

    Ok(author.signed(time, signature_text))
}

/// Responsible party of a prescription or cancellation: the practitioner
/// named by the responsible practitioner extension, or the requester.
pub fn convert_responsible_party(
    bundle: &Bundle,
    request: &MedicationRequest,
    is_cancellation: bool,
) -> Result<Participant, Error> {
    let reference = match extension_or_none(
        &request.extension,
        RESPONSIBLE_PRACTITIONER_URL,
        "MedicationRequest.extension",
    )? {
        Some(extension) => extension.value_reference("MedicationRequest.extension")?,
        None => required(request.requester.as_ref(), "MedicationRequest.requester")?,
    };

    let role: &PractitionerRole = resolve_reference(bundle, reference)?;
    let role = hydrate_organization_only_role(bundle, role)?;
    let person_id: PersonIdFn = if is_cancellation {
        sds_user_person_id
    } else {
        responsible_party_person_id
    };
    let agent_person =
        convert_practitioner_role(bundle, role.as_ref(), person_id, !is_cancellation)?;

    Ok(Participant::new("RESP", agent_person).overriding())
}

/// A role pointing to an organization but not to a practitioner names the
/// practitioner after the organization.
fn hydrate_organization_only_role<'a>(
    bundle: &Bundle,
    role: &'a PractitionerRole,
) -> Result<Cow<'a, PractitionerRole>, Error> {
    let organization_is_pointer = matches!(&role.organization, Some(Reference::Pointer { .. }));
    let practitioner_is_pointer = matches!(&role.practitioner, Some(Reference::Pointer { .. }));
    if !organization_is_pointer || practitioner_is_pointer {
        return Ok(Cow::Borrowed(role));
    }

    let organization = resolve_organization(bundle, role)?;
    let practitioner = required(role.practitioner.as_ref(), "PractitionerRole.practitioner")?;
    let identifier = required(practitioner.identifier(), "PractitionerRole.practitioner")?;

    Ok(Cow::Owned(PractitionerRole {
        practitioner: Some(Reference::Identifier {
            identifier: identifier.clone(),
            display: organization.name.clone(),
        }),
        ..role.clone()
    }))
}

fn convert_practitioner_role(
    bundle: &Bundle,
    role: &PractitionerRole,
    person_id: PersonIdFn,
    with_license: bool,
) -> Result<AgentPerson, Error> {
    let practitioner = required(role.practitioner.as_ref(), "PractitionerRole.practitioner")?;
    let practitioner = resolve_practitioner(bundle, practitioner)?;
    let organization = resolve_organization(bundle, role)?;

    let telecom = agent_person_telecom(role, &practitioner, &organization)?;

    let mut person = AgentPersonPerson::new(person_id(&practitioner.identifier, &role.identifier)?);
    if !practitioner.name.is_empty() {
        let name = only_element(&practitioner.name, "Practitioner.name", None)?;
        person.name = Some(convert_name(name, "Practitioner.name")?);
    }

    let represented_organization =
        convert_represented_organization(bundle, role, &organization, with_license)?;

    let mut ret = AgentPerson::new(person, represented_organization);
    ret.telecom = telecom;
    if !role.identifier.is_empty() {
        ret.id = Some(Identifier::sds_role_profile(identifier_value(
            &role.identifier,
            SDS_ROLE_PROFILE_SYSTEM,
            "PractitionerRole.identifier",
        )?));
    }
    if !role.code.is_empty() {
        ret.code = Some(job_role_code(role)?);
    }

    Ok(ret)
}

/// Telecoms of the role, else of the practitioner it points to, else of
/// its organization.
fn agent_person_telecom(
    role: &PractitionerRole,
    practitioner: &Practitioner,
    organization: &FhirOrganization,
) -> Result<Vec<Telecom>, Error> {
    let (contact_points, fhir_path) = if !role.telecom.is_empty() {
        (&role.telecom, "PractitionerRole.telecom")
    } else if matches!(&role.practitioner, Some(Reference::Pointer { .. })) {
        (&practitioner.telecom, "Practitioner.telecom")
    } else {
        (&organization.telecom, "Organization.telecom")
    };

    if contact_points.is_empty() {
        return Err(Error::too_few(
            "ResponsiblePractitioner must have at least one telecom.",
            "PractitionerRole.telecom",
        ));
    }

    contact_points
        .iter()
        .map(|contact_point| convert_telecom(contact_point, fhir_path))
        .collect()
}

pub fn job_role_code(role: &PractitionerRole) -> Result<Code, Error> {
    let coding =
        codeable_concept_coding(&role.code, JOB_ROLE_NAME_SYSTEM, "PractitionerRole.code")?;
    let code = required(coding.code.as_deref(), "PractitionerRole.code.coding.code")?;

    Ok(Code::new(SDS_JOB_ROLE, code))
}

/// Professional code of a prescriber. Exactly one of the registration
/// numbers must be present; GMC numbers lose their leading `C`.
pub fn author_person_id(
    practitioner_identifiers: &[FhirIdentifier],
    _role_identifiers: &[FhirIdentifier],
) -> Result<Identifier, Error> {
    let mut codes = Vec::new();

    for system in &[
        GMC_SYSTEM,
        GMP_SYSTEM,
        NMC_SYSTEM,
        GPHC_SYSTEM,
        HCPC_SYSTEM,
        PROFESSIONAL_CODE_SYSTEM,
    ] {
        let value =
            identifier_value_or_none(practitioner_identifiers, system, "Practitioner.identifier")?;

        if let Some(value) = value {
            let value = match *system {
                GMC_SYSTEM if value.starts_with('C') || value.starts_with('c') => &value[1..],
                _ => value,
            };

            codes.push(value);
        }
    }

    if codes.len() == 1 {
        return Ok(Identifier::professional_code(codes[0]));
    }

    let mut message =
        "Expected exactly one professional code. One of GMC|GMP|NMC|GPhC|HCPC|unknown.".to_owned();
    if !codes.is_empty() {
        message = format!("{} But got: {}", message, codes.join(", "));
    }

    if codes.len() > 1 {
        Err(Error::too_many(message, "Practitioner.identifier"))
    } else {
        Err(Error::too_few(message, "Practitioner.identifier"))
    }
}

/// Prescribing code of a responsible party: the NHSBSA spurious code of the
/// role, else the DIN number of the practitioner, else the professional
/// code.
pub fn responsible_party_person_id(
    practitioner_identifiers: &[FhirIdentifier],
    role_identifiers: &[FhirIdentifier],
) -> Result<Identifier, Error> {
    if let Some(code) = identifier_value_or_none(
        role_identifiers,
        SPURIOUS_CODE_SYSTEM,
        "PractitionerRole.identifier",
    )? {
        return Ok(Identifier::professional_code(code));
    }

    if let Some(code) =
        identifier_value_or_none(practitioner_identifiers, DIN_SYSTEM, "Practitioner.identifier")?
    {
        return Ok(Identifier::professional_code(code));
    }

    author_person_id(practitioner_identifiers, role_identifiers)
}

/// SDS user id of a practitioner, identifying the people involved in a
/// cancellation.
pub fn sds_user_person_id(
    practitioner_identifiers: &[FhirIdentifier],
    _role_identifiers: &[FhirIdentifier],
) -> Result<Identifier, Error> {
    identifier_value(practitioner_identifiers, SDS_USER_SYSTEM, "Practitioner.identifier")
        .map(Identifier::sds_unique_id)
}

fn requester_signature<'a>(
    bundle: &'a Bundle,
    requester: &Reference,
) -> Result<Option<&'a Signature>, Error> {
    let pointer = requester.pointer();

    only_element_or_none(
        resources_of_type::<Provenance>(bundle)
            .flat_map(|provenance| provenance.signature.iter())
            .filter(|signature| signature.who.as_ref().and_then(Reference::pointer) == pointer),
        "Provenance.signature",
        Some(&format!("who.reference == '{}'", pointer.unwrap_or_default())),
    )
}

fn convert_signature(signature: &Signature) -> Result<(Timestamp, SignatureText), Error> {
    let when = required(signature.when.as_deref(), "Provenance.signature.when")?;
    let time = to_hl7_date_time(when, "Provenance.signature.when")?;

    let invalid = || Error::invalid("Invalid signature format.", "Provenance.signature.data");
    let data = signature.data.as_deref().ok_or_else(invalid)?;
    let xml = base64::decode(data)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(invalid)?;
    Element::parse(&xml).map_err(|_| invalid())?;

    Ok((time, SignatureText::Signature(RawXml(xml))))
}

/// Agent person of a dispenser. The practitioner is only known by its SDS
/// user id.
pub fn convert_dispensing_agent_person(
    role: &PractitionerRole,
    organization: &FhirOrganization,
) -> Result<AgentPerson, Error> {
    let (identifier, display) = match &role.practitioner {
        Some(Reference::Identifier {
            identifier,
            display,
        }) => (identifier, display),
        _ => {
            return Err(Error::invalid(
                "PractitionerRole.practitioner should be an Identifier",
                "PractitionerRole.practitioner",
            ))
        }
    };
    let user_id = identifier_value(
        std::slice::from_ref(identifier),
        SDS_USER_SYSTEM,
        "PractitionerRole.practitioner",
    )?;

    let mut person = AgentPersonPerson::new(Identifier::professional_code(user_id));
    person.name = display.as_deref().map(Name::text);

    let telecom = required(role.telecom.first(), "PractitionerRole.telecom")?;

    let mut ret = AgentPerson::new(
        person,
        convert_dispensing_organization(organization, &role.telecom)?,
    );
    ret.id = Some(Identifier::sds_role_profile(identifier_value(
        &role.identifier,
        SDS_ROLE_PROFILE_SYSTEM,
        "PractitionerRole.identifier",
    )?));
    ret.code = Some(job_role_code(role)?);
    ret.telecom = vec![convert_telecom(telecom, "PractitionerRole.telecom")?];

    Ok(ret)
}

/// Author of a dispense notification, stamped with the current time.
pub fn convert_dispense_author(
    role: &PractitionerRole,
    organization: &FhirOrganization,
) -> Result<Participant, Error> {
    let agent_person = convert_dispensing_agent_person(role, organization)?;

    Ok(Participant::new("AUT", agent_person)
        .overriding()
        .signed(now(), SignatureText::default()))
}

/// Legal authenticator of a dispense claim, stamped with the claim's
/// creation time.
pub fn convert_legal_authenticator(
    role: &PractitionerRole,
    organization: &FhirOrganization,
    created: &str,
) -> Result<Participant, Error> {
    let agent_person = convert_dispensing_agent_person(role, organization)?;
    let time = to_hl7_date_time(created, "Claim.created")?;

    Ok(Participant::new("LA", agent_person).signed(time, SignatureText::default()))
}

/// SDS author of a withdraw. The organization's ODS code stands in for the
/// user id.
pub fn convert_withdraw_author(
    role: &PractitionerRole,
    organization: &FhirOrganization,
) -> Result<AgentPersonSds, Error> {
    let role_profile = identifier_value(
        &role.identifier,
        SDS_ROLE_PROFILE_SYSTEM,
        "Task.contained(\"PractitionerRole\").identifier(\"value\")",
    )?;

    if !matches!(&role.practitioner, Some(Reference::Identifier { .. })) {
        return Err(Error::invalid(
            "practitionerRole.practitioner should be a Value Identifier",
            "Task.contained(\"PractitionerRole\").practitioner(\"value\")",
        ));
    }

    let ods_code = identifier_value(
        &organization.identifier,
        ODS_ORGANIZATION_SYSTEM,
        "Task.contained(\"Organization\").identifier(\"value\")",
    )?;

    Ok(AgentPersonSds::new(
        Identifier::sds_role_profile(role_profile),
        Identifier::sds_unique_id(ods_code),
        None,
    ))
}
