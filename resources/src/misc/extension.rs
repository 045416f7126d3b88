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

use std::convert::TryFrom;

use serde::Deserialize;

use crate::primitives::Decimal;

use super::{CodeableConcept, Coding, Identifier, Reference};

/// URL keyed extension carrying exactly one typed value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "ExtensionDef")]
pub struct Extension {
    pub url: String,
    pub value: ExtensionValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExtensionValue {
    Coding(Coding),
    CodeableConcept(CodeableConcept),
    Identifier(Identifier),
    String(String),
    Integer(Decimal),
    Boolean(bool),
    DateTime(String),
    Reference(Reference),
    Extensions(Vec<Extension>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtensionDef {
    url: String,

    #[serde(default)]
    value_coding: Option<Coding>,

    #[serde(default)]
    value_codeable_concept: Option<CodeableConcept>,

    #[serde(default)]
    value_identifier: Option<Identifier>,

    #[serde(default)]
    value_string: Option<String>,

    #[serde(default)]
    value_integer: Option<Decimal>,

    #[serde(default)]
    value_unsigned_int: Option<Decimal>,

    #[serde(default)]
    value_positive_int: Option<Decimal>,

    #[serde(default)]
    value_boolean: Option<bool>,

    #[serde(default)]
    value_date_time: Option<String>,

    #[serde(default)]
    value_date: Option<String>,

    #[serde(default)]
    value_reference: Option<Reference>,

    #[serde(default)]
    extension: Vec<Extension>,
}

impl Extension {
    pub fn coding(&self) -> Option<&Coding> {
        match &self.value {
            ExtensionValue::Coding(v) => Some(v),
            _ => None,
        }
    }

    pub fn codeable_concept(&self) -> Option<&CodeableConcept> {
        match &self.value {
            ExtensionValue::CodeableConcept(v) => Some(v),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        match &self.value {
            ExtensionValue::Identifier(v) => Some(v),
            _ => None,
        }
    }

    pub fn string(&self) -> Option<&str> {
        match &self.value {
            ExtensionValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn integer(&self) -> Option<&Decimal> {
        match &self.value {
            ExtensionValue::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn boolean(&self) -> Option<bool> {
        match &self.value {
            ExtensionValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn date_time(&self) -> Option<&str> {
        match &self.value {
            ExtensionValue::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn reference(&self) -> Option<&Reference> {
        match &self.value {
            ExtensionValue::Reference(v) => Some(v),
            _ => None,
        }
    }

    pub fn extensions(&self) -> &[Extension] {
        match &self.value {
            ExtensionValue::Extensions(v) => v,
            _ => &[],
        }
    }
}

impl TryFrom<ExtensionDef> for Extension {
    type Error = String;

    fn try_from(def: ExtensionDef) -> Result<Self, Self::Error> {
        let mut values = Vec::new();

        macro_rules! take {
            ($field:ident, $variant:ident) => {
                if let Some(v) = def.$field {
                    values.push(ExtensionValue::$variant(v));
                }
            };
        }

        take!(value_coding, Coding);
        take!(value_codeable_concept, CodeableConcept);
        take!(value_identifier, Identifier);
        take!(value_string, String);
        take!(value_integer, Integer);
        take!(value_unsigned_int, Integer);
        take!(value_positive_int, Integer);
        take!(value_boolean, Boolean);
        take!(value_date_time, DateTime);
        take!(value_date, DateTime);
        take!(value_reference, Reference);

        let value = match (values.len(), def.extension.is_empty()) {
            (0, _) => ExtensionValue::Extensions(def.extension),
            (1, true) => values.remove(0),
            _ => {
                return Err(format!(
                    "Extension `{}` must carry exactly one value!",
                    def.url
                ))
            }
        };

        Ok(Self {
            url: def.url,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_extensions() {
        let extension: Extension = serde_json::from_str(
            r#"{
                "url": "https://fhir.hl7.org.uk/StructureDefinition/Extension-UKCore-MedicationRepeatInformation",
                "extension": [
                    { "url": "numberOfRepeatPrescriptionsIssued", "valueUnsignedInt": 1 },
                    { "url": "authorisationExpiryDate", "valueDateTime": "2030-01-01" }
                ]
            }"#,
        )
        .unwrap();

        let children = extension.extensions();
        assert_eq!(2, children.len());
        assert_eq!(Some(&Decimal::from("1")), children[0].integer());
        assert_eq!(Some("2030-01-01"), children[1].date_time());
    }

    #[test]
    fn single_typed_value() {
        let extension: Extension = serde_json::from_str(
            r#"{
                "url": "https://fhir.nhs.uk/StructureDefinition/Extension-DM-PrescriptionType",
                "valueCoding": { "system": "https://fhir.nhs.uk/CodeSystem/prescription-type", "code": "0101" }
            }"#,
        )
        .unwrap();

        assert_eq!(Some("0101"), extension.coding().unwrap().code.as_deref());
        assert!(extension.string().is_none());
    }

    #[test]
    fn two_values_are_rejected() {
        let result = serde_json::from_str::<Extension>(
            r#"{ "url": "x", "valueString": "a", "valueBoolean": true }"#,
        );

        assert!(result.is_err());
    }
}
