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

use super::codes::{Code, Identifier, PRESCRIPTION_ANNOTATION, TEMPLATE_ROOT};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Timestamp {
    #[serde(rename = "attrib=value")]
    pub value: String,
}

impl Timestamp {
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum NullFlavor {
    #[serde(rename = "NA")]
    NotApplicable,

    #[serde(rename = "UNK")]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Null {
    #[serde(rename = "attrib=nullFlavor")]
    pub null_flavor: NullFlavor,
}

impl Null {
    pub const NOT_APPLICABLE: Null = Null {
        null_flavor: NullFlavor::NotApplicable,
    };

    pub const UNKNOWN: Null = Null {
        null_flavor: NullFlavor::Unknown,
    };
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BooleanValue {
    #[serde(rename = "attrib=value")]
    pub value: bool,
}

impl From<bool> for BooleanValue {
    fn from(value: bool) -> Self {
        Self { value }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NumericValue {
    #[serde(rename = "attrib=value")]
    pub value: String,
}

impl NumericValue {
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Interval<T> {
    pub low: T,
    pub high: T,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntervalUnanchored {
    pub width: Width,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Width {
    #[serde(rename = "attrib=value")]
    pub value: String,

    #[serde(rename = "attrib=unit")]
    pub unit: String,
}

impl IntervalUnanchored {
    pub fn new<V: Into<String>, U: Into<String>>(value: V, unit: U) -> Self {
        Self {
            width: Width {
                value: value.into(),
                unit: unit.into(),
            },
        }
    }
}

/// Quantity converted to the approved UCUM unit `1`, keeping the dm+d unit
/// as translation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuantityInAlternativeUnits {
    #[serde(rename = "attrib=value")]
    pub value: String,

    #[serde(rename = "attrib=unit")]
    pub unit: &'static str,

    pub translation: QuantityTranslation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuantityTranslation {
    #[serde(rename = "attrib=value")]
    pub value: String,

    #[serde(rename = "attrib=codeSystem")]
    pub code_system: Option<&'static str>,

    #[serde(rename = "attrib=code")]
    pub code: String,

    #[serde(rename = "attrib=displayName")]
    pub display_name: Option<String>,
}

impl QuantityInAlternativeUnits {
    pub fn new(value: String, alternative_value: String, unit: Code) -> Self {
        Self {
            value,
            unit: "1",
            translation: QuantityTranslation {
                value: alternative_value,
                code_system: unit.code_system,
                code: unit.code,
                display_name: unit.display_name,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum NameUse {
    #[serde(rename = "L")]
    Usual,

    #[serde(rename = "A")]
    Alias,

    #[serde(rename = "PREFERRED")]
    Preferred,

    #[serde(rename = "PREVIOUS")]
    Previous,

    #[serde(rename = "PREVIOUS-MAIDEN")]
    PreviousMaiden,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Name {
    #[serde(rename = "attrib=use")]
    pub use_: Option<NameUse>,

    pub prefix: Vec<String>,

    pub given: Vec<String>,

    pub family: Option<String>,

    pub suffix: Vec<String>,

    #[serde(rename = "$text", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Name {
    pub fn text<T: Into<String>>(text: T) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum TelecomUse {
    #[serde(rename = "HP")]
    PermanentHome,

    #[serde(rename = "WP")]
    Workplace,

    #[serde(rename = "HV")]
    Temporary,

    #[serde(rename = "MC")]
    Mobile,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Telecom {
    #[serde(rename = "attrib=use")]
    pub use_: Option<TelecomUse>,

    #[serde(rename = "attrib=value")]
    pub value: Option<String>,
}

impl Telecom {
    /// Phone number without whitespace and with `tel:` scheme.
    pub fn new(use_: Option<TelecomUse>, value: Option<&str>) -> Self {
        let value = value.map(|value| {
            let value = value.split_whitespace().collect::<String>();

            if value.starts_with("tel:") {
                value
            } else {
                format!("tel:{}", value)
            }
        });

        Self { use_, value }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum AddressUse {
    #[serde(rename = "H")]
    Home,

    #[serde(rename = "WP")]
    Work,

    #[serde(rename = "TMP")]
    Temporary,

    #[serde(rename = "PST")]
    Postal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Address {
    #[serde(rename = "attrib=use")]
    pub use_: Option<AddressUse>,

    #[serde(rename = "streetAddressLine")]
    pub street_address_line: Vec<String>,

    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
}

/// XML written verbatim into the document.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename = "raw-xml")]
pub struct RawXml(pub String);

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignatureText {
    NotApplicable(Null),
    Signature(RawXml),
}

impl Default for SignatureText {
    fn default() -> Self {
        Self::NotApplicable(Null::NOT_APPLICABLE)
    }
}

/// Act relationship or participation linking a parent act to a nested act or
/// role. The nested element name is chosen per use site.
#[derive(Clone, Debug, PartialEq)]
pub struct Relationship<T> {
    type_code: &'static str,
    context_control_code: Option<&'static str>,
    inversion_ind: Option<bool>,
    context_conduction_ind: Option<bool>,
    negation_ind: Option<bool>,
    seperatable_ind: Option<bool>,
    template_id: Option<&'static str>,
    name: &'static str,
    value: T,
}

impl<T> Relationship<T> {
    pub fn new(type_code: &'static str, name: &'static str, value: T) -> Self {
        Self {
            type_code,
            context_control_code: None,
            inversion_ind: None,
            context_conduction_ind: None,
            negation_ind: None,
            seperatable_ind: None,
            template_id: None,
            name,
            value,
        }
    }

    /// `PERT` relationship with context conduction and the given separatable
    /// indicator, the most common shape in prescription messages.
    pub fn pertinent(name: &'static str, seperatable: bool, value: T) -> Self {
        Self::new("PERT", name, value)
            .context_conduction(true)
            .seperatable(seperatable)
    }

    pub fn context_control(mut self, code: &'static str) -> Self {
        self.context_control_code = Some(code);

        self
    }

    pub fn context_conduction(mut self, ind: bool) -> Self {
        self.context_conduction_ind = Some(ind);

        self
    }

    pub fn inversion(mut self, ind: bool) -> Self {
        self.inversion_ind = Some(ind);

        self
    }

    pub fn negation(mut self, ind: bool) -> Self {
        self.negation_ind = Some(ind);

        self
    }

    pub fn seperatable(mut self, ind: bool) -> Self {
        self.seperatable_ind = Some(ind);

        self
    }

    pub fn template(mut self, extension: &'static str) -> Self {
        self.template_id = Some(extension);

        self
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Serialize> Serialize for Relationship<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Relationship", 9)?;

        s.serialize_field("attrib=typeCode", self.type_code)?;
        s.serialize_field("attrib=contextControlCode", &self.context_control_code)?;
        s.serialize_field("attrib=inversionInd", &self.inversion_ind)?;
        s.serialize_field("attrib=contextConductionInd", &self.context_conduction_ind)?;
        s.serialize_field("attrib=negationInd", &self.negation_ind)?;
        s.serialize_field("value-tag=seperatableInd", &self.seperatable_ind)?;

        if let Some(extension) = self.template_id {
            s.serialize_field("templateId", &Identifier::new(TEMPLATE_ROOT, extension))?;
        }

        s.serialize_field(self.name, &self.value)?;
        s.end()
    }
}

/// Coded observation attached to a prescription act (`classCode="OBS"`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Annotation<V> {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    #[serde(rename = "attrib=negationInd")]
    pub negation_ind: Option<bool>,

    pub code: Code,

    pub text: Option<String>,

    pub value: Option<V>,
}

impl<V> Annotation<V> {
    pub fn new(code: &'static str, value: V) -> Self {
        Self {
            value: Some(value),
            ..Self::empty(code)
        }
    }

    pub fn empty(code: &'static str) -> Self {
        Self {
            class_code: "OBS",
            mood_code: "EVN",
            negation_ind: None,
            code: Code::new(PRESCRIPTION_ANNOTATION, code),
            text: None,
            value: None,
        }
    }

    pub fn with_text<T: Into<String>>(mut self, text: T) -> Self {
        self.text = Some(text.into());

        self
    }

    pub fn negated(mut self, negation: bool) -> Self {
        self.negation_ind = Some(negation);

        self
    }
}

/// Reference to an act elsewhere in this or a previous message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActRef {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,
}

impl ActRef {
    pub fn new(class_code: &'static str, mood_code: &'static str, id: Identifier) -> Self {
        Self {
            class_code,
            mood_code,
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::xml::{ser::to_string, test::trim_xml_str};

    #[derive(Serialize)]
    struct LineItem {
        #[serde(rename = "pertinentInformation2")]
        pertinent_information2: Relationship<Annotation<String>>,

        #[serde(rename = "pertinentInformation3")]
        pertinent_information3: Vec<Relationship<Annotation<Code>>>,
    }

    #[test]
    fn serialize_relationships_with_annotations() {
        let item = LineItem {
            pertinent_information2: Relationship::pertinent(
                "pertinentDosageInstructions",
                false,
                Annotation::new("DI", "1 tablet - once a day".to_owned()),
            ),
            pertinent_information3: vec![Relationship::pertinent(
                "pertinentPrescriberEndorsement",
                false,
                Annotation::new("PE", Code::new("2.16.840.1.113883.2.1.3.2.4.16.32", "SLS")),
            )],
        };

        let actual = trim_xml_str(&to_string(&item).unwrap());
        let expected = trim_xml_str(
            r##"
            <LineItem>
                <pertinentInformation2 typeCode="PERT" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <pertinentDosageInstructions classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="DI"/>
                        <value>1 tablet - once a day</value>
                    </pertinentDosageInstructions>
                </pertinentInformation2>
                <pertinentInformation3 typeCode="PERT" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <pertinentPrescriberEndorsement classCode="OBS" moodCode="EVN">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="PE"/>
                        <value codeSystem="2.16.840.1.113883.2.1.3.2.4.16.32" code="SLS"/>
                    </pertinentPrescriberEndorsement>
                </pertinentInformation3>
            </LineItem>
        "##,
        );

        assert_eq!(actual, expected);
    }

    #[test]
    fn serialize_templates_and_negated_annotations() {
        #[derive(Serialize)]
        struct Coverage {
            coverage: Relationship<Annotation<Code>>,
        }

        let coverage = Coverage {
            coverage: Relationship::new("COVBY", "coveringChargeExempt", Annotation::empty("ES").negated(true))
                .context_conduction(true)
                .seperatable(false)
                .template("CSAB_RM-NPfITUK10.sourceOf1"),
        };

        let actual = trim_xml_str(&to_string(&coverage).unwrap());
        let expected = trim_xml_str(
            r##"
            <Coverage>
                <coverage typeCode="COVBY" contextConductionInd="true">
                    <seperatableInd value="false"/>
                    <templateId root="2.16.840.1.113883.2.1.3.2.4.18.2" extension="CSAB_RM-NPfITUK10.sourceOf1"/>
                    <coveringChargeExempt classCode="OBS" moodCode="EVN" negationInd="true">
                        <code codeSystem="2.16.840.1.113883.2.1.3.2.4.17.30" code="ES"/>
                    </coveringChargeExempt>
                </coverage>
            </Coverage>
        "##,
        );

        assert_eq!(actual, expected);
    }

    #[test]
    fn serialize_signature_text_variants() {
        #[derive(Serialize)]
        struct Author {
            #[serde(rename = "signatureText")]
            signature_text: SignatureText,
        }

        let unsigned = Author {
            signature_text: SignatureText::default(),
        };
        assert_eq!(
            r#"<Author><signatureText nullFlavor="NA"/></Author>"#,
            to_string(&unsigned).unwrap()
        );

        let signed = Author {
            signature_text: SignatureText::Signature(RawXml("<Signature/>".into())),
        };
        assert_eq!(
            r#"<Author><signatureText><Signature/></signatureText></Author>"#,
            to_string(&signed).unwrap()
        );
    }

    #[test]
    fn telecom_values_get_tel_scheme() {
        let telecom = Telecom::new(Some(TelecomUse::Workplace), Some("01234 567 890"));
        assert_eq!(Some("tel:01234567890".to_owned()), telecom.value);

        let telecom = Telecom::new(None, Some("tel:01234567890"));
        assert_eq!(Some("tel:01234567890".to_owned()), telecom.value);
    }
}
