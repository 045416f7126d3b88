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
    agent::AgentPersonSds,
    codes::{Code, Identifier, RETURN_REASON, WITHDRAW_REASON, WITHDRAW_TYPE},
    core::{ActRef, Annotation, NumericValue, Relationship, Timestamp},
    patient::Patient,
    prescription::prescription_id,
};

/// Withdrawal of a previously sent dispense notification.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename = "ETPWithdraw")]
pub struct EtpWithdraw {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Timestamp,

    #[serde(rename = "recordTarget")]
    pub record_target: Relationship<Patient>,

    pub author: Relationship<AgentPersonSds>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Option<Relationship<Annotation<NumericValue>>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Relationship<Annotation<Code>>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Relationship<Annotation<Identifier>>,

    #[serde(rename = "pertinentInformation4")]
    pub pertinent_information4: Relationship<ActRef>,

    #[serde(rename = "pertinentInformation5")]
    pub pertinent_information5: Relationship<Annotation<Code>>,
}

pub struct EtpWithdrawBuilder {
    pub id: Identifier,
    pub effective_time: Timestamp,
    pub record_target: Relationship<Patient>,
    pub author: AgentPersonSds,
    pub repeat_instance: Option<String>,
    pub short_form_id: String,
    pub dispense_notification_id: String,
    pub reason_code: String,
    pub reason_display: Option<String>,
}

impl EtpWithdrawBuilder {
    pub fn build(self) -> EtpWithdraw {
        let withdraw_type = Code::new(WITHDRAW_TYPE, "LD").with_display("Last Dispense");
        let withdraw_reason = Code::new(WITHDRAW_REASON, self.reason_code)
            .with_display_opt(self.reason_display.as_deref());

        EtpWithdraw {
            class_code: "ALRT",
            mood_code: "EVN",
            id: self.id,
            effective_time: self.effective_time,
            record_target: self.record_target,
            author: Relationship::new("AUT", "AgentPersonSDS", self.author),
            pertinent_information1: self.repeat_instance.map(|repeat_instance| {
                Relationship::pertinent(
                    "pertinentRepeatInstanceInfo",
                    false,
                    Annotation::new("RPI", NumericValue::new(repeat_instance)),
                )
            }),
            pertinent_information2: Relationship::pertinent(
                "pertinentWithdrawType",
                false,
                Annotation::new("PWT", withdraw_type),
            ),
            pertinent_information3: Relationship::new(
                "PERT",
                "pertinentWithdrawID",
                Annotation::new("WID", Identifier::short_form(self.short_form_id)),
            )
            .context_conduction(false)
            .seperatable(false),
            pertinent_information4: Relationship::new(
                "PERT",
                "pertinentDispenseNotificationRef",
                ActRef::new("INFO", "EVN", Identifier::global(&self.dispense_notification_id)),
            )
            .inversion(false)
            .negation(false)
            .seperatable(true),
            pertinent_information5: Relationship::pertinent(
                "pertinentWithdrawReason",
                false,
                Annotation::new("PWR", withdraw_reason),
            ),
        }
    }
}

/// Return of a released prescription that the dispenser cannot dispense.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispenseProposalReturn {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Timestamp,

    pub author: Relationship<AgentPersonSds>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<Annotation<Identifier>>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Relationship<Annotation<Code>>,

    #[serde(rename = "reversalOf")]
    pub reversal_of: Relationship<ActRef>,
}

impl DispenseProposalReturn {
    pub fn new(
        id: Identifier,
        effective_time: Timestamp,
        author: AgentPersonSds,
        short_form_id: &str,
        reason: (&str, Option<&str>),
        release_response_id: &str,
    ) -> Self {
        let (reason_code, reason_display) = reason;
        let return_reason = Code::new(RETURN_REASON, reason_code).with_display_opt(reason_display);

        Self {
            class_code: "INFO",
            mood_code: "EVN",
            id,
            effective_time,
            author: Relationship::new("AUT", "AgentPersonSDS", author),
            pertinent_information1: prescription_id(short_form_id),
            pertinent_information3: Relationship::pertinent(
                "pertinentReturnReason",
                false,
                Annotation::new("RR", return_reason),
            ),
            reversal_of: Relationship::new(
                "REV",
                "priorPrescriptionReleaseResponseRef",
                ActRef::new("INFO", "EVN", Identifier::global(release_response_id)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        hl7v3::patient::record_target_reference,
        xml::{ser::to_string, test::trim_xml_str},
    };

    #[test]
    fn serialize_withdraw() {
        let withdraw = EtpWithdrawBuilder {
            id: Identifier::global("ee035711-7aac-48c4-951a-62c07891d37d"),
            effective_time: Timestamp::new("20210507102030"),
            record_target: record_target_reference("9449304130"),
            author: AgentPersonSds::new(
                Identifier::sds_role_profile("555086415105"),
                Identifier::sds_unique_id("VNE51"),
                None,
            ),
            repeat_instance: Some("2".into()),
            short_form_id: "88AF6C-C81007-00001C".into(),
            dispense_notification_id: "aef77afb-7e3c-427a-8657-2c427f71a272".into(),
            reason_code: "MU".into(),
            reason_display: Some("Medication Update".into()),
        }
        .build();

        let actual = trim_xml_str(&to_string(&withdraw).unwrap());
        let expected = trim_xml_str(
            r##"
            <ETPWithdraw classCode="ALRT" moodCode="EVN">
                <id root="EE035711-7AAC-48C4-951A-62C07891D37D"/>
                <effectiveTime value="20210507102030"/>
                <recordTarget typeCode="RCT">
                    <patient classCode="PAT">
                        <id root="2.16.840.1.113883.2.1.4.1" extension="9449304130"/>
                    </patient>
                </recordTarget>
                <author typeCode="AUT">
                    <AgentPersonSDS classCode="AGNT">
                        <id root="1.2.826.0.1285.0.2.0.67" extension="555086415105"/>
                        <agentPersonSDS classCode="PSN" determinerCode="INSTANCE">
                            <id root="1.2.826.0.1285.0.2.0.65" extension="VNE51"/>
                        </agentPersonSDS>
                    </AgentPersonSDS>
                </author>
                <pertinentInformation1 typeCode="PERT" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <pertinentRepeatInstanceInfo classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="RPI"/>
                        <value value="2"/>
                    </pertinentRepeatInstanceInfo>
                </pertinentInformation1>
                <pertinentInformation2 typeCode="PERT" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <pertinentWithdrawType classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="PWT"/>
                        <value codeSystem="2.16.840.1.113883.2.1.3.2.4.17.109" code="LD" displayName="Last Dispense"/>
                    </pertinentWithdrawType>
                </pertinentInformation2>
                <pertinentInformation3 typeCode="PERT" contextConductionInd="false">
                    <seperatableInd value="false"/>
                    <pertinentWithdrawID classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="WID"/>
                        <value root="2.16.840.1.113883.2.1.3.2.4.18.8" extension="88AF6C-C81007-00001C"/>
                    </pertinentWithdrawID>
                </pertinentInformation3>
                <pertinentInformation4 typeCode="PERT" inversionInd="false" negationInd="false">
                    <seperatableInd value="true"/>
                    <pertinentDispenseNotificationRef classCode="INFO" moodCode="EVN">
                        <id root="AEF77AFB-7E3C-427A-8657-2C427F71A272"/>
                    </pertinentDispenseNotificationRef>
                </pertinentInformation4>
                <pertinentInformation5 typeCode="PERT" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <pertinentWithdrawReason classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="PWR"/>
                        <value codeSystem="2.16.840.1.113883.2.1.3.2.4.17.110" code="MU" displayName="Medication Update"/>
                    </pertinentWithdrawReason>
                </pertinentInformation5>
            </ETPWithdraw>
        "##,
        );

        assert_eq!(actual, expected);
    }
}
