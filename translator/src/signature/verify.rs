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

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use log::warn;
use openssl::{
    asn1::Asn1Time,
    sign::Verifier,
    x509::{X509Ref, X509VerifyResult, X509},
};

use crate::{
    hl7v3::prescription::ParentPrescription,
    translation::dates::parse_hl7_date_time,
    xml::{canonicalize, ser::to_string, Element},
};

use super::{
    prepare::signed_info,
    revocation::{is_certificate_valid, CrlSource},
    Algorithm, Error, Fragments,
};

/// Reasons a prescription signature is rejected.
#[derive(Clone, Copy, Debug, thiserror::Error, PartialEq)]
pub enum Failure {
    #[error("Invalid signature format")]
    InvalidFormat,

    #[error("Multiple certificates detected")]
    MultipleCertificates,

    #[error("Invalid certificate")]
    InvalidCertificate,

    #[error("Signature is invalid")]
    InvalidSignature,

    #[error("Signature doesn't match prescription")]
    DigestMismatch,

    #[error("Certificate is revoked")]
    Revoked,

    #[error("Certificate expired when signed")]
    ExpiredWhenSigned,

    #[error("Certificate not trusted")]
    NotTrusted,
}

/// Verifies the prescriber's signature of a parent prescription. The
/// signing certificate has to be issued by one of the `trusted` CA
/// certificates. An empty result means the signature is valid.
pub async fn verify_prescription_signature<S>(
    parent_prescription: &ParentPrescription,
    trusted: &[X509],
    crl_source: &S,
) -> Result<Vec<Failure>, Error>
where
    S: CrlSource + ?Sized,
{
    let xml = to_string(parent_prescription)?;
    let root = Element::parse(&xml)?;

    let author = root
        .find(&["pertinentInformation1", "pertinentPrescription", "author"])
        .ok_or(Error::MissingElement("author"))?;

    let signature = match author.find(&["signatureText", "Signature"]) {
        Some(signature) if has_signature_format(signature) => signature,
        _ => return Ok(vec![Failure::InvalidFormat]),
    };

    let certificate_text = signature
        .find(&["KeyInfo", "X509Data", "X509Certificate"])
        .map(|certificate| certificate.text().into_owned())
        .unwrap_or_default();
    if certificate_text.contains("BEGIN CERTIFICATE")
        || certificate_text.contains("END CERTIFICATE")
    {
        return Ok(vec![Failure::MultipleCertificates]);
    }

    let certificate = match parse_certificate(&certificate_text) {
        Ok(certificate) => certificate,
        Err(err) => {
            warn!("Could not parse X509 certificate: {}", err);

            return Ok(vec![Failure::InvalidCertificate]);
        }
    };

    let signed_at = author
        .child("time")
        .and_then(|time| time.attribute("value"))
        .ok_or(Error::MissingElement("author.time"))?;
    let signed_at = parse_hl7_date_time(signed_at)
        .ok_or_else(|| Error::InvalidTimestamp(signed_at.to_owned()))?;

    let mut failures = Vec::new();

    match is_signature_valid(signature, &certificate) {
        Ok(true) => (),
        Ok(false) => failures.push(Failure::InvalidSignature),
        Err(err) => {
            warn!("Unable to verify signature value: {}", err);

            failures.push(Failure::InvalidSignature);
        }
    }

    if !digest_matches_prescription(&root, signature)? {
        failures.push(Failure::DigestMismatch);
    }

    if !is_certificate_valid(&certificate, &signed_at, crl_source).await {
        failures.push(Failure::Revoked);
    }

    if !was_valid_when_signed(&certificate, &signed_at)? {
        failures.push(Failure::ExpiredWhenSigned);
    }

    if !is_trusted(&certificate, trusted)? {
        failures.push(Failure::NotTrusted);
    }

    Ok(failures)
}

fn has_signature_format(signature: &Element) -> bool {
    let has_text = |path: &[&str]| {
        signature
            .find(path)
            .map(|element| !element.text().trim().is_empty())
            .unwrap_or(false)
    };

    signature.child("SignedInfo").is_some()
        && has_text(&["SignatureValue"])
        && has_text(&["KeyInfo", "X509Data", "X509Certificate"])
}

fn parse_certificate(text: &str) -> Result<X509, Error> {
    let der = base64::decode(strip_whitespace(text))?;

    Ok(X509::from_der(&der)?)
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn algorithm(signature: &Element) -> Algorithm {
    let method = signature
        .find(&["SignedInfo", "SignatureMethod"])
        .and_then(|method| method.attribute("Algorithm"))
        .unwrap_or_default();

    Algorithm::from_signature_method(method)
}

/// Canonical `SignedInfo` of the signature, re-scoped to the namespace of
/// the signature element.
fn canonical_signed_info(signature: &Element) -> Result<String, Error> {
    let signed_info = signature
        .detach_child("SignedInfo")
        .ok_or(Error::MissingElement("SignedInfo"))?;

    Ok(canonicalize(&signed_info))
}

fn is_signature_valid(signature: &Element, certificate: &X509Ref) -> Result<bool, Error> {
    let signature_value = signature
        .child("SignatureValue")
        .map(|value| strip_whitespace(&value.text()))
        .unwrap_or_default();
    let signature_value = base64::decode(signature_value)?;

    let public_key = certificate.public_key()?;
    let mut verifier = Verifier::new(algorithm(signature).message_digest(), &public_key)?;
    verifier.update(canonical_signed_info(signature)?.as_bytes())?;

    Ok(verifier.verify(&signature_value)?)
}

/// Whether the signed info of the signature is the one calculated from the
/// fragments of the prescription.
fn digest_matches_prescription(
    parent_prescription: &Element,
    signature: &Element,
) -> Result<bool, Error> {
    let fragments = Fragments::extract(parent_prescription)?;
    let calculated = signed_info(&fragments.to_hashable(), algorithm(signature))?;

    Ok(canonical_signed_info(signature)? == canonicalize(&calculated))
}

fn was_valid_when_signed(certificate: &X509Ref, signed_at: &DateTime<Utc>) -> Result<bool, Error> {
    let signed_at = Asn1Time::from_unix(signed_at.timestamp())?;

    let after_start = certificate.not_before().compare(&signed_at)? != Ordering::Greater;
    let before_end = certificate.not_after().compare(&signed_at)? != Ordering::Less;

    Ok(after_start && before_end)
}

fn is_trusted(certificate: &X509Ref, trusted: &[X509]) -> Result<bool, Error> {
    for ca in trusted {
        if ca.issued(certificate) != X509VerifyResult::OK {
            continue;
        }

        if certificate.verify(&*ca.public_key()?)? {
            return Ok(true);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{read, read_to_string};

    use openssl::{pkey::PKey, sign::Signer};
    use resources::Bundle;
    use serde_json::from_str;

    use crate::{
        hl7v3::core::{RawXml, SignatureText, Timestamp},
        signature::revocation::tests::StaticCrlSource,
        translation::convert_parent_prescription,
    };

    fn pem(name: &str) -> X509 {
        X509::from_pem(&read(format!("./examples/pki/{}.pem", name)).unwrap()).unwrap()
    }

    fn unsigned(time: &str) -> ParentPrescription {
        let json = read_to_string("./examples/prescription-order.json").unwrap();
        let bundle: Bundle = from_str(&json).unwrap();

        let mut parent_prescription = convert_parent_prescription(&bundle).unwrap();
        parent_prescription.pertinent_information1.value_mut().author.time =
            Some(Timestamp::new(time));

        parent_prescription
    }

    fn sign(parent_prescription: &mut ParentPrescription, certificate: &str, algorithm: Algorithm) {
        let fragments = Fragments::from_parent_prescription(parent_prescription).unwrap();
        let signed_info = canonicalize(&signed_info(&fragments.to_hashable(), algorithm).unwrap());

        let key = PKey::private_key_from_pem(&read("./examples/pki/valid.key").unwrap()).unwrap();
        let mut signer = Signer::new(algorithm.message_digest(), &key).unwrap();
        signer.update(signed_info.as_bytes()).unwrap();
        let signature_value = base64::encode(&signer.sign_to_vec().unwrap());

        let certificate = base64::encode(&pem(certificate).to_der().unwrap());
        let xml = format!(
            concat!(
                r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#">{}"#,
                r#"<SignatureValue>{}</SignatureValue>"#,
                r#"<KeyInfo><X509Data><X509Certificate>{}</X509Certificate></X509Data></KeyInfo>"#,
                r#"</Signature>"#
            ),
            signed_info, signature_value, certificate
        );

        parent_prescription.pertinent_information1.value_mut().author.signature_text =
            Some(SignatureText::Signature(RawXml(xml)));
    }

    fn signed(algorithm: Algorithm) -> ParentPrescription {
        let mut parent_prescription = unsigned("20210507102030");
        sign(&mut parent_prescription, "valid", algorithm);

        parent_prescription
    }

    async fn verify(parent_prescription: &ParentPrescription, trusted: &[X509]) -> Vec<Failure> {
        verify_prescription_signature(parent_prescription, trusted, &StaticCrlSource::test_ca())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn valid_signature() {
        let trusted = vec![pem("ca")];

        assert!(verify(&signed(Algorithm::Sha1), &trusted).await.is_empty());
        assert!(verify(&signed(Algorithm::Sha256), &trusted).await.is_empty());
    }

    #[tokio::test]
    async fn unsigned_prescription_has_invalid_format() {
        let failures = verify(&unsigned("20210507102030"), &[pem("ca")]).await;

        assert_eq!(vec![Failure::InvalidFormat], failures);
    }

    #[tokio::test]
    async fn pem_certificates_are_rejected() {
        let mut parent_prescription = unsigned("20210507102030");
        parent_prescription.pertinent_information1.value_mut().author.signature_text =
            Some(SignatureText::Signature(RawXml(
                concat!(
                    r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"><SignedInfo/>"#,
                    r#"<SignatureValue>AAAA</SignatureValue><KeyInfo><X509Data>"#,
                    r#"<X509Certificate>-----BEGIN CERTIFICATE-----MIIB-----END CERTIFICATE-----</X509Certificate>"#,
                    r#"</X509Data></KeyInfo></Signature>"#
                )
                .into(),
            )));

        let failures = verify(&parent_prescription, &[pem("ca")]).await;

        assert_eq!(vec![Failure::MultipleCertificates], failures);
    }

    #[tokio::test]
    async fn garbage_certificate_is_invalid() {
        let mut parent_prescription = unsigned("20210507102030");
        parent_prescription.pertinent_information1.value_mut().author.signature_text =
            Some(SignatureText::Signature(RawXml(
                concat!(
                    r#"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"><SignedInfo/>"#,
                    r#"<SignatureValue>AAAA</SignatureValue><KeyInfo><X509Data>"#,
                    r#"<X509Certificate>bm90IGEgY2VydGlmaWNhdGU=</X509Certificate>"#,
                    r#"</X509Data></KeyInfo></Signature>"#
                )
                .into(),
            )));

        let failures = verify(&parent_prescription, &[pem("ca")]).await;

        assert_eq!(vec![Failure::InvalidCertificate], failures);
    }

    #[tokio::test]
    async fn changed_prescription_does_not_match_signature() {
        let mut parent_prescription = signed(Algorithm::Sha1);
        let line_item = &mut parent_prescription
            .pertinent_information1
            .value_mut()
            .pertinent_information2[0];
        line_item.value_mut().pertinent_information2.value_mut().value = Some("8 times a day - Oral".into());

        let failures = verify(&parent_prescription, &[pem("ca")]).await;

        assert_eq!(vec![Failure::DigestMismatch], failures);
    }

    #[tokio::test]
    async fn signature_of_other_key_is_invalid() {
        let mut parent_prescription = unsigned("20210507102030");
        sign(&mut parent_prescription, "superseded", Algorithm::Sha1);

        let failures = verify(&parent_prescription, &[pem("ca")]).await;

        assert_eq!(vec![Failure::InvalidSignature], failures);
    }

    #[tokio::test]
    async fn untrusted_certificate() {
        let failures = verify(&signed(Algorithm::Sha1), &[]).await;

        assert_eq!(vec![Failure::NotTrusted], failures);
    }

    #[tokio::test]
    async fn certificate_expired_when_signed() {
        let mut parent_prescription = unsigned("20310101000000");
        sign(&mut parent_prescription, "valid", Algorithm::Sha1);

        let failures = verify(&parent_prescription, &[pem("ca")]).await;

        assert_eq!(vec![Failure::ExpiredWhenSigned], failures);
    }

    #[tokio::test]
    async fn revoked_certificate() {
        let mut parent_prescription = unsigned("20210507102030");
        sign(&mut parent_prescription, "key-compromise", Algorithm::Sha1);

        let failures = verify(&parent_prescription, &[pem("ca")]).await;

        assert!(failures.contains(&Failure::Revoked));
    }
}
