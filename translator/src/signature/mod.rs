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

//! Prescriber signatures over parent prescriptions: the signed fragments,
//! the digest handed out for signing and the verification of returned
//! signatures.

mod fragments;
mod prepare;
mod summary;
mod verify;

pub mod revocation;

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use base64::DecodeError as Base64Error;
use openssl::{error::ErrorStack as OpenSslError, hash::MessageDigest};
use quick_xml::DeError as SerializeError;
use thiserror::Error;

use crate::xml::Error as XmlError;

pub use fragments::Fragments;
pub use prepare::{prepare_for_signing, signed_info, SigningParameters};
pub use summary::{SigningSummary, SummaryMedication};
pub use verify::{verify_prescription_signature, Failure};

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("XML Error: {0}")]
    XmlError(XmlError),

    #[error("XML Serialization Error: {0}")]
    SerializeError(SerializeError),

    #[error("OpenSSL Error: {0}")]
    OpenSslError(OpenSslError),

    #[error("Base64 Error: {0}")]
    Base64Error(Base64Error),

    #[error("Missing element: {0}!")]
    MissingElement(&'static str),

    #[error("Invalid timestamp: {0}!")]
    InvalidTimestamp(String),
}

impl From<XmlError> for Error {
    fn from(err: XmlError) -> Self {
        Self::XmlError(err)
    }
}

impl From<SerializeError> for Error {
    fn from(err: SerializeError) -> Self {
        Self::SerializeError(err)
    }
}

impl From<OpenSslError> for Error {
    fn from(err: OpenSslError) -> Self {
        Self::OpenSslError(err)
    }
}

impl From<Base64Error> for Error {
    fn from(err: Base64Error) -> Self {
        Self::Base64Error(err)
    }
}

/// Hash and signature method pair of an XML-DSig `SignedInfo`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Algorithm {
    Sha1,
    Sha256,
}

impl Algorithm {
    /// Algorithm named by a `SignatureMethod`. Anything but RSA-SHA256 is
    /// treated as the legacy RSA-SHA1.
    pub fn from_signature_method(uri: &str) -> Self {
        if uri.contains("rsa-sha256") {
            Self::Sha256
        } else {
            Self::Sha1
        }
    }

    pub fn message_digest(&self) -> MessageDigest {
        match self {
            Self::Sha1 => MessageDigest::sha1(),
            Self::Sha256 => MessageDigest::sha256(),
        }
    }

    pub fn digest_method(&self) -> &'static str {
        match self {
            Self::Sha1 => "http://www.w3.org/2000/09/xmldsig#sha1",
            Self::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
        }
    }

    pub fn signature_method(&self) -> &'static str {
        match self {
            Self::Sha1 => "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
            Self::Sha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
        }
    }

    /// JWA name of the signature algorithm the signer has to apply.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "RS1",
            Self::Sha256 => "RS256",
        }
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            _ => Err(format!("Unknown hashing algorithm: {}", s)),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_from_signature_method() {
        assert_eq!(
            Algorithm::Sha256,
            Algorithm::from_signature_method("http://www.w3.org/2001/04/xmldsig-more#rsa-sha256")
        );
        assert_eq!(
            Algorithm::Sha1,
            Algorithm::from_signature_method("http://www.w3.org/2000/09/xmldsig#rsa-sha1")
        );
        assert_eq!(Algorithm::Sha1, Algorithm::from_signature_method(""));
    }

    #[test]
    fn algorithm_from_str() {
        assert_eq!(Ok(Algorithm::Sha256), "SHA256".parse());
        assert_eq!(Ok(Algorithm::Sha1), "sha1".parse());
        assert!("md5".parse::<Algorithm>().is_err());
    }
}
