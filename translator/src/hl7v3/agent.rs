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

use serde::Serialize;

use super::{
    codes::{Code, Identifier},
    core::{Address, Name, Relationship, SignatureText, Telecom, Timestamp},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentPerson {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    pub id: Option<Identifier>,

    pub code: Option<Code>,

    pub telecom: Vec<Telecom>,

    #[serde(rename = "agentPerson")]
    pub agent_person: AgentPersonPerson,

    #[serde(rename = "representedOrganization")]
    pub represented_organization: Organization,
}

impl AgentPerson {
    pub fn new(agent_person: AgentPersonPerson, represented_organization: Organization) -> Self {
        Self {
            class_code: "AGNT",
            id: None,
            code: None,
            telecom: Vec::new(),
            agent_person,
            represented_organization,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentPersonPerson {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=determinerCode")]
    pub determiner_code: &'static str,

    pub id: Identifier,

    pub name: Option<Name>,
}

impl AgentPersonPerson {
    pub fn new(id: Identifier) -> Self {
        Self {
            class_code: "PSN",
            determiner_code: "INSTANCE",
            id,
            name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Organization {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=determinerCode")]
    pub determiner_code: &'static str,

    pub id: Identifier,

    pub code: Option<Code>,

    pub name: Option<String>,

    pub telecom: Option<Telecom>,

    pub addr: Option<Address>,

    #[serde(rename = "healthCareProviderLicense")]
    pub health_care_provider_license: Option<HealthCareProviderLicense>,
}

impl Organization {
    pub fn new(id: Identifier) -> Self {
        Self {
            class_code: "ORG",
            determiner_code: "INSTANCE",
            id,
            code: None,
            name: None,
            telecom: None,
            addr: None,
            health_care_provider_license: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthCareProviderLicense {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "Organization")]
    pub organization: Box<Organization>,
}

impl HealthCareProviderLicense {
    pub fn new(organization: Organization) -> Self {
        Self {
            class_code: "PROV",
            organization: Box::new(organization),
        }
    }
}

/// Organization known only by its SDS identifier.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentOrganization {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "agentOrganizationSDS")]
    pub agent_organization_sds: Organization,
}

impl AgentOrganization {
    pub fn new(id: Identifier) -> Self {
        Self {
            class_code: "AGNT",
            agent_organization_sds: Organization::new(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentPersonSds {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    pub id: Identifier,

    #[serde(rename = "agentPersonSDS")]
    pub agent_person_sds: SdsEntity,

    pub part: Option<Relationship<SdsRole>>,
}

impl AgentPersonSds {
    pub fn new(role_profile: Identifier, user: Identifier, job_role: Option<Identifier>) -> Self {
        Self {
            class_code: "AGNT",
            id: role_profile,
            agent_person_sds: SdsEntity::new("PSN", user),
            part: job_role.map(|id| {
                Relationship::new(
                    "PART",
                    "partSDSRole",
                    SdsRole {
                        class_code: "ROL",
                        id,
                    },
                )
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SdsEntity {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=determinerCode")]
    pub determiner_code: &'static str,

    pub id: Identifier,
}

impl SdsEntity {
    pub fn new(class_code: &'static str, id: Identifier) -> Self {
        Self {
            class_code,
            determiner_code: "INSTANCE",
            id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SdsRole {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    pub id: Identifier,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentSystemSds {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "agentSystemSDS")]
    pub agent_system_sds: SdsEntity,
}

impl AgentSystemSds {
    pub fn new(asid: &str) -> Self {
        Self {
            class_code: "AGNT",
            agent_system_sds: SdsEntity::new("DEV", Identifier::accredited_system(asid)),
        }
    }
}

/// Author, legal authenticator or responsible party of an act.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Participant {
    #[serde(rename = "attrib=typeCode")]
    pub type_code: &'static str,

    #[serde(rename = "attrib=contextControlCode")]
    pub context_control_code: Option<&'static str>,

    pub time: Option<Timestamp>,

    #[serde(rename = "signatureText")]
    pub signature_text: Option<SignatureText>,

    #[serde(rename = "AgentPerson")]
    pub agent_person: AgentPerson,
}

impl Participant {
    pub fn new(type_code: &'static str, agent_person: AgentPerson) -> Self {
        Self {
            type_code,
            context_control_code: None,
            time: None,
            signature_text: None,
            agent_person,
        }
    }

    pub fn overriding(mut self) -> Self {
        self.context_control_code = Some("OP");

        self
    }

    pub fn signed(mut self, time: Timestamp, signature_text: SignatureText) -> Self {
        self.time = Some(time);
        self.signature_text = Some(signature_text);

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        hl7v3::core::{Null, TelecomUse},
        xml::{ser::to_string, test::trim_xml_str},
    };

    #[test]
    fn serialize_signed_author() {
        #[derive(Serialize)]
        struct Prescription {
            author: Participant,
        }

        let mut person = AgentPersonPerson::new(Identifier::professional_code("G9999999"));
        person.name = Some(Name {
            prefix: vec!["DR".into()],
            given: vec!["Thomas".into()],
            family: Some("Edwards".into()),
            ..Default::default()
        });

        let mut organization = Organization::new(Identifier::sds_organization("A83008"));
        organization.code = Some(Code::new("2.16.840.1.113883.2.1.3.2.4.17.94", "999"));

        let mut agent_person = AgentPerson::new(person, organization);
        agent_person.id = Some(Identifier::sds_role_profile("100102238986"));
        agent_person.code = Some(Code::new("1.2.826.0.1285.0.2.1.104", "R8000"));
        agent_person.telecom = vec![Telecom::new(Some(TelecomUse::Workplace), Some("01234567890"))];

        let prescription = Prescription {
            author: Participant::new("AUT", agent_person).overriding().signed(
                Timestamp::new("20210507102030"),
                SignatureText::NotApplicable(Null::NOT_APPLICABLE),
            ),
        };

        let actual = trim_xml_str(&to_string(&prescription).unwrap());
        let expected = trim_xml_str(
            r##"
            <Prescription>
                <author typeCode="AUT" contextControlCode="OP">
                    <time value="20210507102030"/>
                    <signatureText nullFlavor="NA"/>
                    <AgentPerson classCode="AGNT">
                        <id root="1.2.826.0.1285.0.2.0.67" extension="100102238986"/>
                        <code codeSystem="1.2.826.0.1285.0.2.1.104" code="R8000"/>
                        <telecom use="WP" value="tel:01234567890"/>
                        <agentPerson classCode="PSN" determinerCode="INSTANCE">
                            <id root="1.2.826.0.1285.0.2.1.54" extension="G9999999"/>
                            <name>
                                <prefix>DR</prefix>
                                <given>Thomas</given>
                                <family>Edwards</family>
                            </name>
                        </agentPerson>
                        <representedOrganization classCode="ORG" determinerCode="INSTANCE">
                            <id root="1.2.826.0.1285.0.1.10" extension="A83008"/>
                            <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.94" code="999"/>
                        </representedOrganization>
                    </AgentPerson>
                </author>
            </Prescription>
        "##,
        );

        assert_eq!(actual, expected);
    }

    #[test]
    fn serialize_sds_author() {
        #[derive(Serialize)]
        struct ControlActEvent {
            author: Relationship<AgentPersonSds>,
        }

        let event = ControlActEvent {
            author: Relationship::new(
                "AUT",
                "AgentPersonSDS",
                AgentPersonSds::new(
                    Identifier::sds_role_profile("100102238986"),
                    Identifier::sds_unique_id("687227875014"),
                    Some(Identifier::sds_job_role("R8000")),
                ),
            ),
        };

        let actual = trim_xml_str(&to_string(&event).unwrap());
        let expected = trim_xml_str(
            r##"
            <ControlActEvent>
                <author typeCode="AUT">
                    <AgentPersonSDS classCode="AGNT">
                        <id root="1.2.826.0.1285.0.2.0.67" extension="100102238986"/>
                        <agentPersonSDS classCode="PSN" determinerCode="INSTANCE">
                            <id root="1.2.826.0.1285.0.2.0.65" extension="687227875014"/>
                        </agentPersonSDS>
                        <part typeCode="PART">
                            <partSDSRole classCode="ROL">
                                <id root="1.2.826.0.1285.0.2.1.104" extension="R8000"/>
                            </partSDSRole>
                        </part>
                    </AgentPersonSDS>
                </author>
            </ControlActEvent>
        "##,
        );

        assert_eq!(actual, expected);
    }
}
