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
    agent::Participant,
    codes::{Code, Identifier, CANCELLATION},
    core::{ActRef, Annotation, Relationship, Timestamp},
    patient::Patient,
    prescription::prescription_id,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CancellationRequest {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Timestamp,

    #[serde(rename = "recordTarget")]
    pub record_target: Relationship<Patient>,

    pub author: Participant,

    #[serde(rename = "responsibleParty")]
    pub responsible_party: Participant,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Relationship<ActRef>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Relationship<Annotation<Identifier>>,

    #[serde(rename = "pertinentInformation")]
    pub pertinent_information: Relationship<Annotation<Code>>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Relationship<ActRef>,
}

pub struct CancellationRequestBuilder {
    pub id: Identifier,
    pub effective_time: Timestamp,
    pub record_target: Relationship<Patient>,
    pub author: Participant,
    pub responsible_party: Participant,
    pub short_form_id: String,
    pub line_item_id: String,
    pub original_prescription_id: String,
    pub reason_code: String,
    pub reason_display: String,
}

impl CancellationRequestBuilder {
    pub fn build(self) -> CancellationRequest {
        let reason = Annotation::new("CR", Code::new(CANCELLATION, self.reason_code))
            .with_text(self.reason_display);

        CancellationRequest {
            class_code: "INFO",
            mood_code: "EVN",
            id: self.id,
            effective_time: self.effective_time,
            record_target: self.record_target,
            author: self.author,
            responsible_party: self.responsible_party,
            pertinent_information1: Relationship::new(
                "PERT",
                "pertinentLineItemRef",
                ActRef::new("SBADM", "RQO", Identifier::global(&self.line_item_id)),
            )
            .inversion(false)
            .negation(false)
            .seperatable(true),
            pertinent_information2: prescription_id(self.short_form_id),
            pertinent_information: Relationship::pertinent(
                "pertinentCancellationReason",
                false,
                reason,
            ),
            pertinent_information3: Relationship::new(
                "PERT",
                "pertinentOriginalPrescriptionRef",
                ActRef::new("SBADM", "RQO", Identifier::global(&self.original_prescription_id)),
            )
            .context_conduction(false)
            .seperatable(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::xml::{ser::to_string, test::trim_xml_str};

    #[test]
    fn serialize_cancellation_reason() {
        #[derive(Serialize)]
        struct CancellationRequest {
            #[serde(rename = "pertinentInformation")]
            pertinent_information: Relationship<Annotation<Code>>,

            #[serde(rename = "pertinentInformation2")]
            pertinent_information2: Relationship<Annotation<Identifier>>,
        }

        let request = CancellationRequest {
            pertinent_information: Relationship::pertinent(
                "pertinentCancellationReason",
                false,
                Annotation::new("CR", Code::new(CANCELLATION, "0001")).with_text("Prescribing Error"),
            ),
            pertinent_information2: prescription_id("A0548B-A99968-451485"),
        };

        let actual = trim_xml_str(&to_string(&request).unwrap());
        let expected = trim_xml_str(
            r##"
            <CancellationRequest>
                <pertinentInformation typeCode="PERT" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <pertinentCancellationReason classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="CR"/>
                        <text>Prescribing Error</text>
                        <value codeSystem="2.16.840.1.113883.2.1.3.2.4.16.27" code="0001"/>
                    </pertinentCancellationReason>
                </pertinentInformation>
                <pertinentInformation2 typeCode="PERT" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <pertinentPrescriptionID classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="PID"/>
                        <value root="2.16.840.1.113883.2.1.3.2.4.18.8" extension="A0548B-A99968-451485"/>
                    </pertinentPrescriptionID>
                </pertinentInformation2>
            </CancellationRequest>
        "##,
        );

        assert_eq!(actual, expected);
    }
}
