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

use super::Identifier;

/// Reference to another resource: either a pointer to a bundle entry (or a
/// contained resource) or a self contained identifier with display text.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "ReferenceDef")]
pub enum Reference {
    Pointer {
        reference: String,
        display: Option<String>,
    },
    Identifier {
        identifier: Identifier,
        display: Option<String>,
    },
}

#[derive(Deserialize)]
struct ReferenceDef {
    #[serde(default)]
    reference: Option<String>,

    #[serde(default)]
    identifier: Option<Identifier>,

    #[serde(default)]
    display: Option<String>,
}

impl Reference {
    pub fn pointer(&self) -> Option<&str> {
        match self {
            Self::Pointer { reference, .. } => Some(reference),
            Self::Identifier { .. } => None,
        }
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            Self::Pointer { .. } => None,
            Self::Identifier { identifier, .. } => Some(identifier),
        }
    }

    pub fn display(&self) -> Option<&str> {
        match self {
            Self::Pointer { display, .. } => display.as_deref(),
            Self::Identifier { display, .. } => display.as_deref(),
        }
    }
}

impl TryFrom<ReferenceDef> for Reference {
    type Error = String;

    fn try_from(value: ReferenceDef) -> Result<Self, Self::Error> {
        let ReferenceDef {
            reference,
            identifier,
            display,
        } = value;

        match (reference, identifier) {
            (Some(reference), _) => Ok(Self::Pointer { reference, display }),
            (None, Some(identifier)) => Ok(Self::Identifier {
                identifier,
                display,
            }),
            (None, None) => {
                Err("Reference is missing the `reference` or `identifier` field!".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_takes_precedence() {
        let reference: Reference = serde_json::from_str(
            r#"{ "reference": "urn:uuid:a", "identifier": { "value": "x" } }"#,
        )
        .unwrap();

        assert_eq!(Some("urn:uuid:a"), reference.pointer());
        assert!(reference.identifier().is_none());
    }

    #[test]
    fn identifier_reference_keeps_display() {
        let reference: Reference = serde_json::from_str(
            r#"{
                "identifier": { "system": "https://fhir.nhs.uk/Id/sds-user-id", "value": "7654321" },
                "display": "Dr Jane Smith"
            }"#,
        )
        .unwrap();

        assert_eq!("7654321", reference.identifier().unwrap().value);
        assert_eq!(Some("Dr Jane Smith"), reference.display());
    }

    #[test]
    fn empty_reference_is_rejected() {
        assert!(serde_json::from_str::<Reference>(r#"{ "display": "x" }"#).is_err());
    }
}
