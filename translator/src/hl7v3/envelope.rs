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

use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::xml::HL7V3_NAMESPACE;

use super::{
    agent::{AgentPersonSds, AgentSystemSds, SdsEntity},
    cancellation::CancellationRequest,
    claim::DispenseClaim,
    codes::{Code, Identifier},
    core::{Relationship, Timestamp},
    dispense::DispenseNotification,
    prescription::ParentPrescription,
    release::{NominatedPrescriptionReleaseRequest, PatientPrescriptionReleaseRequest},
    task::{DispenseProposalReturn, EtpWithdraw},
};

const VERSION_CODE: &str = "V3NPfIT4.2.00";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    ParentPrescriptionUrgent,
    CancelRequest,
    DispenseNotification,
    DispenseClaimInformation,
    NominatedRelease,
    PatientRelease,
    DispenserWithdraw,
    DispenseProposalReturn,
}

impl Interaction {
    pub fn id(&self) -> &'static str {
        match self {
            Self::ParentPrescriptionUrgent => "PORX_IN020101SM31",
            Self::CancelRequest => "PORX_IN030101SM32",
            Self::DispenseNotification => "PORX_IN080101SM31",
            Self::DispenseClaimInformation => "PORX_IN090101SM31",
            Self::NominatedRelease => "PORX_IN060102SM30",
            Self::PatientRelease => "PORX_IN132004SM30",
            Self::DispenserWithdraw => "PORX_IN510101SM31",
            Self::DispenseProposalReturn => "PORX_IN100101SM31",
        }
    }
}

/// Message body carried as subject of the control act.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    ParentPrescription(Box<ParentPrescription>),
    CancellationRequest(Box<CancellationRequest>),
    DispenseNotification(Box<DispenseNotification>),
    DispenseClaim(Box<DispenseClaim>),
    NominatedRelease(NominatedPrescriptionReleaseRequest),
    PatientRelease(PatientPrescriptionReleaseRequest),
    DispenseProposalReturn(Box<DispenseProposalReturn>),
    Withdraw(Box<EtpWithdraw>),
}

impl Payload {
    pub fn interaction(&self) -> Interaction {
        match self {
            Self::ParentPrescription(_) => Interaction::ParentPrescriptionUrgent,
            Self::CancellationRequest(_) => Interaction::CancelRequest,
            Self::DispenseNotification(_) => Interaction::DispenseNotification,
            Self::DispenseClaim(_) => Interaction::DispenseClaimInformation,
            Self::NominatedRelease(_) => Interaction::NominatedRelease,
            Self::PatientRelease(_) => Interaction::PatientRelease,
            Self::DispenseProposalReturn(_) => Interaction::DispenseProposalReturn,
            Self::Withdraw(_) => Interaction::DispenserWithdraw,
        }
    }

    fn element_name(&self) -> &'static str {
        match self {
            Self::ParentPrescription(_) => "ParentPrescription",
            Self::CancellationRequest(_) => "CancellationRequest",
            Self::DispenseNotification(_) => "DispenseNotification",
            Self::DispenseClaim(_) => "DispenseClaim",
            Self::NominatedRelease(_) => "NominatedPrescriptionReleaseRequest",
            Self::PatientRelease(_) => "PatientPrescriptionReleaseRequest",
            Self::DispenseProposalReturn(_) => "DispenseProposalReturn",
            Self::Withdraw(_) => "ETPWithdraw",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ControlActEvent {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub author: Option<Relationship<AgentPersonSds>>,

    pub author1: Relationship<AgentSystemSds>,

    pub subject: Relationship<Payload>,
}

/// Transmission wrapper of every outgoing message. The root element is named
/// after the interaction id.
#[derive(Clone, Debug, PartialEq)]
pub struct SendMessagePayload {
    pub id: Identifier,
    pub creation_time: Timestamp,
    pub interaction: Interaction,
    pub receiver: Relationship<SdsEntity>,
    pub sender: Relationship<SdsEntity>,
    pub control_act_event: ControlActEvent,
}

pub struct Asids<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

impl SendMessagePayload {
    pub fn new(
        id: Identifier,
        creation_time: Timestamp,
        asids: Asids<'_>,
        author: Option<AgentPersonSds>,
        payload: Payload,
    ) -> Self {
        let device = |type_code, asid| {
            Relationship::new(
                type_code,
                "device",
                SdsEntity::new("DEV", Identifier::accredited_system(asid)),
            )
        };

        let interaction = payload.interaction();
        let subject =
            Relationship::new("SUBJ", payload.element_name(), payload).context_conduction(false);

        Self {
            id,
            creation_time,
            interaction,
            receiver: device("RCV", asids.to),
            sender: device("SND", asids.from),
            control_act_event: ControlActEvent {
                class_code: "CACT",
                mood_code: "EVN",
                author: author.map(|author| Relationship::new("AUT", "AgentPersonSDS", author)),
                author1: Relationship::new(
                    "AUT",
                    "AgentSystemSDS",
                    AgentSystemSds::new(asids.from),
                ),
                subject,
            },
        }
    }

    pub fn payload(&self) -> &Payload {
        self.control_act_event.subject.value()
    }
}

impl Serialize for SendMessagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct(self.interaction.id(), 11)?;

        s.serialize_field("attrib=xmlns", HL7V3_NAMESPACE)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("creationTime", &self.creation_time)?;
        s.serialize_field("versionCode", &Code::without_system(VERSION_CODE))?;
        s.serialize_field("interactionId", &Identifier::interaction(self.interaction.id()))?;
        s.serialize_field("processingCode", &Code::without_system("P"))?;
        s.serialize_field("processingModeCode", &Code::without_system("T"))?;
        s.serialize_field("acceptAckCode", &Code::without_system("NE"))?;
        s.serialize_field("communicationFunctionRcv", &self.receiver)?;
        s.serialize_field("communicationFunctionSnd", &self.sender)?;
        s.serialize_field("ControlActEvent", &self.control_act_event)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        hl7v3::agent::{AgentPerson, AgentPersonPerson, Organization, Participant},
        xml::{ser::to_string, test::trim_xml_str},
    };

    #[test]
    fn serialize_envelope() {
        let author = AgentPerson::new(
            AgentPersonPerson::new(Identifier::professional_code("G9999999")),
            Organization::new(Identifier::sds_organization("VNE51")),
        );
        let release = NominatedPrescriptionReleaseRequest::new(
            Identifier::global("a0b0c0d0-0000-4000-8000-000000000001"),
            Timestamp::new("20210507102030"),
            Participant::new("AUT", author),
        );

        let payload = SendMessagePayload::new(
            Identifier::global("a0b0c0d0-0000-4000-8000-000000000002"),
            Timestamp::new("20210507102031"),
            Asids {
                from: "200000001285",
                to: "567456789789",
            },
            Some(AgentPersonSds::new(
                Identifier::sds_role_profile("100102238986"),
                Identifier::sds_unique_id("687227875014"),
                None,
            )),
            Payload::NominatedRelease(release),
        );

        let actual = trim_xml_str(&to_string(&payload).unwrap());
        let expected = trim_xml_str(
            r##"
            <PORX_IN060102SM30 xmlns="urn:hl7-org:v3">
                <id root="A0B0C0D0-0000-4000-8000-000000000002"/>
                <creationTime value="20210507102031"/>
                <versionCode code="V3NPfIT4.2.00"/>
                <interactionId root="2.16.840.1.113883.2.1.3.2.4.12" extension="PORX_IN060102SM30"/>
                <processingCode code="P"/>
                <processingModeCode code="T"/>
                <acceptAckCode code="NE"/>
                <communicationFunctionRcv typeCode="RCV">
                    <device classCode="DEV" determinerCode="INSTANCE">
                        <id root="1.2.826.0.1285.0.2.0.107" extension="567456789789"/>
                    </device>
                </communicationFunctionRcv>
                <communicationFunctionSnd typeCode="SND">
                    <device classCode="DEV" determinerCode="INSTANCE">
                        <id root="1.2.826.0.1285.0.2.0.107" extension="200000001285"/>
                    </device>
                </communicationFunctionSnd>
                <ControlActEvent classCode="CACT" moodCode="EVN">
                    <author typeCode="AUT">
                        <AgentPersonSDS classCode="AGNT">
                            <id root="1.2.826.0.1285.0.2.0.67" extension="100102238986"/>
                            <agentPersonSDS classCode="PSN" determinerCode="INSTANCE">
                                <id root="1.2.826.0.1285.0.2.0.65" extension="687227875014"/>
                            </agentPersonSDS>
                        </AgentPersonSDS>
                    </author>
                    <author1 typeCode="AUT">
                        <AgentSystemSDS classCode="AGNT">
                            <agentSystemSDS classCode="DEV" determinerCode="INSTANCE">
                                <id root="1.2.826.0.1285.0.2.0.107" extension="200000001285"/>
                            </agentSystemSDS>
                        </AgentSystemSDS>
                    </author1>
                    <subject typeCode="SUBJ" contextConductionInd="false">
                        <NominatedPrescriptionReleaseRequest classCode="INFO" moodCode="RQO">
                            <id root="A0B0C0D0-0000-4000-8000-000000000001"/>
                            <effectiveTime value="20210507102030"/>
                            <author typeCode="AUT">
                                <AgentPerson classCode="AGNT">
                                    <agentPerson classCode="PSN" determinerCode="INSTANCE">
                                        <id root="1.2.826.0.1285.0.2.1.54" extension="G9999999"/>
                                    </agentPerson>
                                    <representedOrganization classCode="ORG" determinerCode="INSTANCE">
                                        <id root="1.2.826.0.1285.0.1.10" extension="VNE51"/>
                                    </representedOrganization>
                                </AgentPerson>
                            </author>
                        </NominatedPrescriptionReleaseRequest>
                    </subject>
                </ControlActEvent>
            </PORX_IN060102SM30>
        "##,
        );

        assert_eq!(actual, expected);
    }
}
