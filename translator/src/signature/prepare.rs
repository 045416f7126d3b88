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

use openssl::hash::hash;
use serde::{ser::SerializeStruct, Serialize, Serializer};

use crate::{
    hl7v3::prescription::ParentPrescription,
    translation::dates::hl7_date_time_to_iso,
    xml::{c14n::EXCLUSIVE_C14N, canonicalize, Element, XMLDSIG_NAMESPACE},
};

use super::{Algorithm, Error, Fragments};

/// Parameters a prescriber needs to sign a prescription.
#[derive(Clone, Debug, PartialEq)]
pub struct SigningParameters {
    /// Base64 encoded canonical `SignedInfo`.
    pub digest: String,
    pub timestamp: String,
    pub algorithm: Algorithm,
}

/// Calculates the digest of the signed fragments of a parent prescription.
pub fn prepare_for_signing(
    parent_prescription: &ParentPrescription,
    algorithm: Algorithm,
) -> Result<SigningParameters, Error> {
    let fragments = Fragments::from_parent_prescription(parent_prescription)?;

    let time = fragments
        .time_value()
        .ok_or(Error::MissingElement("author.time"))?;
    let timestamp =
        hl7_date_time_to_iso(time).ok_or_else(|| Error::InvalidTimestamp(time.to_owned()))?;

    let signed_info = signed_info(&fragments.to_hashable(), algorithm)?;
    let digest = base64::encode(canonicalize(&signed_info));

    Ok(SigningParameters {
        digest,
        timestamp,
        algorithm,
    })
}

/// XML-DSig `SignedInfo` over the hashable form of the signed fragments.
pub fn signed_info(hashable: &str, algorithm: Algorithm) -> Result<Element, Error> {
    let digest_value = hash(algorithm.message_digest(), hashable.as_bytes())?;
    let digest_value = base64::encode(&*digest_value);

    let reference = Element::new("Reference")
        .with_child(
            Element::new("Transforms")
                .with_child(algorithm_element("Transform", EXCLUSIVE_C14N)),
        )
        .with_child(algorithm_element("DigestMethod", algorithm.digest_method()))
        .with_child(Element::new("DigestValue").with_text(digest_value));

    Ok(Element::new("SignedInfo")
        .with_namespace("", XMLDSIG_NAMESPACE)
        .with_child(algorithm_element("CanonicalizationMethod", EXCLUSIVE_C14N))
        .with_child(algorithm_element("SignatureMethod", algorithm.signature_method()))
        .with_child(reference))
}

fn algorithm_element(name: &str, algorithm: &str) -> Element {
    Element::new(name).with_attribute("Algorithm", algorithm)
}

impl Serialize for SigningParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Parameter<'a> {
            name: &'static str,

            #[serde(rename = "valueString")]
            value_string: &'a str,
        }

        let parameter = [
            Parameter {
                name: "digest",
                value_string: &self.digest,
            },
            Parameter {
                name: "timestamp",
                value_string: &self.timestamp,
            },
            Parameter {
                name: "algorithm",
                value_string: self.algorithm.name(),
            },
        ];

        let mut s = serializer.serialize_struct("Parameters", 2)?;
        s.serialize_field("resourceType", "Parameters")?;
        s.serialize_field("parameter", &parameter)?;
        s.end()
    }
}
