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
    misc::{ContactPoint, Identifier as FhirIdentifier, Reference},
    Bundle, HealthcareService, Location, Organization as FhirOrganization, PractitionerRole,
};

use crate::hl7v3::{
    agent::{HealthCareProviderLicense, Organization},
    codes::{Code, Identifier, ORGANIZATION_TYPE},
    core::Address,
};

use super::{
    demographics::{convert_address, convert_telecom, ODS_ORGANIZATION_SYSTEM},
    resolve::{
        identifier_value, only_element, required, resolve_healthcare_service, resolve_reference,
    },
    Error,
};

const UNSPECIFIED_ORGANIZATION_TYPE: &str = "999";

/// Organization or healthcare service a prescriber acts on behalf of.
trait CostCentre {
    const NAME: &'static str;

    fn identifiers(&self) -> &[FhirIdentifier];

    fn name(&self) -> Option<&str>;

    fn telecoms(&self) -> &[ContactPoint];

    fn convert_address(&self, bundle: &Bundle) -> Result<Address, Error>;
}

impl CostCentre for FhirOrganization {
    const NAME: &'static str = "Organization";

    fn identifiers(&self) -> &[FhirIdentifier] {
        &self.identifier
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn telecoms(&self) -> &[ContactPoint] {
        &self.telecom
    }

    fn convert_address(&self, _bundle: &Bundle) -> Result<Address, Error> {
        let address = only_element(&self.address, "Organization.address", None)?;

        convert_address(address, "Organization.address")
    }
}

impl CostCentre for HealthcareService {
    const NAME: &'static str = "HealthcareService";

    fn identifiers(&self) -> &[FhirIdentifier] {
        &self.identifier
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn telecoms(&self) -> &[ContactPoint] {
        &self.telecom
    }

    fn convert_address(&self, bundle: &Bundle) -> Result<Address, Error> {
        let reference = only_element(&self.location, "HealthcareService.location", None)?;
        let location: &Location = resolve_reference(bundle, reference)?;
        let address = location
            .address
            .as_ref()
            .ok_or_else(|| Error::invalid("Address must be provided.", "Location.address"))?;

        convert_address(address, "Location.address")
    }
}

fn convert_common_details<C: CostCentre>(cost_centre: &C) -> Result<Organization, Error> {
    let ods_code = identifier_value(
        cost_centre.identifiers(),
        ODS_ORGANIZATION_SYSTEM,
        &format!("{}.identifier", C::NAME),
    )?;
    let name = cost_centre.name().ok_or_else(|| {
        Error::invalid("Name must be provided.", format!("{}.address", C::NAME))
    })?;

    let mut ret = Organization::new(Identifier::sds_organization(ods_code));
    ret.code = Some(Code::new(ORGANIZATION_TYPE, UNSPECIFIED_ORGANIZATION_TYPE));
    ret.name = Some(name.to_owned());

    Ok(ret)
}

fn convert_represented_details<C: CostCentre>(
    bundle: &Bundle,
    cost_centre: &C,
) -> Result<Organization, Error> {
    let telecom_path = format!("{}.telecom", C::NAME);
    let telecom = only_element(cost_centre.telecoms(), &telecom_path, None)?;

    let mut ret = convert_common_details(cost_centre)?;
    ret.telecom = Some(convert_telecom(telecom, &telecom_path)?);
    ret.addr = Some(cost_centre.convert_address(bundle)?);

    Ok(ret)
}

/// Parent organization licensing the provider: the `partOf` organization
/// if one is given, otherwise the organization itself.
fn convert_provider_license(
    bundle: &Bundle,
    organization: &FhirOrganization,
) -> Result<HealthCareProviderLicense, Error> {
    let parent = match &organization.part_of {
        Some(reference @ Reference::Pointer { .. }) => {
            Cow::Borrowed(resolve_reference::<FhirOrganization>(bundle, reference)?)
        }
        Some(Reference::Identifier {
            identifier,
            display,
        }) => Cow::Owned(FhirOrganization {
            identifier: vec![identifier.clone()],
            name: display.clone(),
            ..Default::default()
        }),
        None => Cow::Borrowed(organization),
    };

    Ok(HealthCareProviderLicense::new(convert_common_details(
        parent.as_ref(),
    )?))
}

/// Organization a prescriber represents. A healthcare service of the role
/// takes precedence over its organization; cancellations carry no provider
/// license.
pub fn convert_represented_organization(
    bundle: &Bundle,
    role: &PractitionerRole,
    organization: &FhirOrganization,
    with_license: bool,
) -> Result<Organization, Error> {
    let mut ret = if role.healthcare_service.is_empty() {
        convert_represented_details(bundle, organization)?
    } else {
        let service = resolve_healthcare_service(bundle, role)?;

        convert_represented_details(bundle, service.as_ref())?
    };

    if with_license {
        ret.health_care_provider_license = Some(convert_provider_license(bundle, organization)?);
    }

    Ok(ret)
}

/// Organization of a dispenser. Falls back to the role's telecom when the
/// organization has none.
pub fn convert_dispensing_organization(
    organization: &FhirOrganization,
    role_telecom: &[ContactPoint],
) -> Result<Organization, Error> {
    let ods_code = identifier_value(
        &organization.identifier,
        ODS_ORGANIZATION_SYSTEM,
        "Organization.identifier",
    )?;

    let mut ret = Organization::new(Identifier::sds_organization(ods_code));
    ret.code = Some(Code::new(ORGANIZATION_TYPE, UNSPECIFIED_ORGANIZATION_TYPE));
    ret.name = organization.name.clone();

    let telecom = organization
        .telecom
        .first()
        .map(|telecom| (telecom, "Organization.telecom"))
        .or_else(|| {
            role_telecom
                .first()
                .map(|telecom| (telecom, "PractitionerRole.telecom"))
        });
    if let Some((telecom, fhir_path)) = telecom {
        ret.telecom = Some(convert_telecom(telecom, fhir_path)?);
    }

    if let Some(address) = organization.address.first() {
        ret.addr = Some(convert_address(address, "Organization.address")?);
    }

    Ok(ret)
}

/// Identifier of the organization's ODS code.
pub fn ods_code<'a>(organization: &'a FhirOrganization) -> Result<&'a str, Error> {
    let identifier = required(
        organization
            .identifier
            .iter()
            .find(|identifier| identifier.system == ODS_ORGANIZATION_SYSTEM),
        "Organization.identifier",
    )?;

    Ok(&identifier.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{from_value, json};

    use crate::hl7v3::core::{Telecom, TelecomUse};

    fn bundle() -> Bundle {
        from_value(json!({
            "resourceType": "Bundle",
            "entry": [
                {
                    "fullUrl": "urn:uuid:practice",
                    "resource": {
                        "resourceType": "Organization",
                        "identifier": [
                            { "system": "https://fhir.nhs.uk/Id/ods-organization-code", "value": "A83008" }
                        ],
                        "name": "HALLGARTH SURGERY",
                        "telecom": [ { "system": "phone", "value": "0115 9737320", "use": "work" } ],
                        "address": [ { "use": "work", "line": [ "MAIN STREET" ], "postalCode": "DL15 9EF" } ],
                        "partOf": { "reference": "urn:uuid:ccg" }
                    }
                },
                {
                    "fullUrl": "urn:uuid:ccg",
                    "resource": {
                        "resourceType": "Organization",
                        "identifier": [
                            { "system": "https://fhir.nhs.uk/Id/ods-organization-code", "value": "84H" }
                        ],
                        "name": "NHS COUNTY DURHAM CCG"
                    }
                },
                {
                    "fullUrl": "urn:uuid:service",
                    "resource": {
                        "resourceType": "HealthcareService",
                        "identifier": [
                            { "system": "https://fhir.nhs.uk/Id/ods-organization-code", "value": "A99968" }
                        ],
                        "name": "SOMERSET BOWEL CANCER SCREENING CENTRE",
                        "telecom": [ { "system": "phone", "value": "01823 333444", "use": "work" } ],
                        "location": [ { "reference": "urn:uuid:location" } ]
                    }
                },
                {
                    "fullUrl": "urn:uuid:location",
                    "resource": {
                        "resourceType": "Location",
                        "address": { "use": "work", "line": [ "MUSGROVE PARK HOSPITAL" ], "postalCode": "TA1 5DA" }
                    }
                }
            ]
        }))
        .unwrap()
    }

    fn organization(bundle: &Bundle) -> &FhirOrganization {
        resolve_reference(
            bundle,
            &Reference::Pointer {
                reference: "urn:uuid:practice".into(),
                display: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn represented_organization_carries_license_of_parent() {
        let bundle = bundle();
        let organization = organization(&bundle);

        let actual = convert_represented_organization(
            &bundle,
            &PractitionerRole::default(),
            organization,
            true,
        )
        .unwrap();

        assert_eq!(Identifier::sds_organization("A83008"), actual.id);
        assert_eq!(Some("HALLGARTH SURGERY"), actual.name.as_deref());
        assert_eq!(
            Some(Telecom::new(
                Some(TelecomUse::Workplace),
                Some("0115 9737320")
            )),
            actual.telecom
        );

        let license = actual.health_care_provider_license.unwrap();
        assert_eq!(Identifier::sds_organization("84H"), license.organization.id);
        assert!(license.organization.telecom.is_none());
    }

    #[test]
    fn cancellations_have_no_license() {
        let bundle = bundle();
        let organization = organization(&bundle);

        let actual = convert_represented_organization(
            &bundle,
            &PractitionerRole::default(),
            organization,
            false,
        )
        .unwrap();

        assert!(actual.health_care_provider_license.is_none());
    }

    #[test]
    fn healthcare_service_takes_precedence() {
        let bundle = bundle();
        let organization = organization(&bundle);
        let role: PractitionerRole = from_value(json!({
            "resourceType": "PractitionerRole",
            "healthcareService": [ { "reference": "urn:uuid:service" } ]
        }))
        .unwrap();

        let actual = convert_represented_organization(&bundle, &role, organization, true).unwrap();

        assert_eq!(Identifier::sds_organization("A99968"), actual.id);
        assert_eq!(
            vec!["MUSGROVE PARK HOSPITAL"],
            actual.addr.unwrap().street_address_line
        );
        assert_eq!(
            Identifier::sds_organization("84H"),
            actual.health_care_provider_license.unwrap().organization.id
        );
    }

    #[test]
    fn missing_name_is_invalid() {
        let organization = FhirOrganization {
            identifier: vec![FhirIdentifier::new(ODS_ORGANIZATION_SYSTEM, "A83008")],
            ..Default::default()
        };

        let err = convert_common_details(&organization).unwrap_err();

        assert_eq!(
            Error::invalid("Name must be provided.", "Organization.address"),
            err
        );
    }

    #[test]
    fn dispensing_organization_falls_back_to_role_telecom() {
        let organization = FhirOrganization {
            identifier: vec![FhirIdentifier::new(ODS_ORGANIZATION_SYSTEM, "VNE51")],
            name: Some("The Simple Pharmacy".into()),
            ..Default::default()
        };
        let role_telecom = vec![ContactPoint {
            system: Some("phone".into()),
            value: Some("01234567890".into()),
            use_: Some("work".into()),
        }];

        let actual = convert_dispensing_organization(&organization, &role_telecom).unwrap();

        assert_eq!(Identifier::sds_organization("VNE51"), actual.id);
        assert_eq!(
            Some(Telecom::new(
                Some(TelecomUse::Workplace),
                Some("01234567890")
            )),
            actual.telecom
        );
        assert!(actual.addr.is_none());
    }
}
