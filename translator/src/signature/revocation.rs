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

//! Revocation check of signing certificates against the CRLs named in their
//! distribution points (CRL entry reason codes, OID 2.5.29.21).
//!
//! Certificates are only treated as revoked if a CRL could be fetched and
//! lists them with a known reason code. Missing distribution points,
//! unreachable or unparsable CRLs and unknown reason codes leave the
//! certificate valid.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::warn;
use openssl::{
    asn1::{Asn1Time, Asn1TimeRef},
    error::ErrorStack as OpenSslError,
    x509::{CrlStatus, ReasonCode as CrlReasonExtension, X509Crl, X509RevokedRef, X509Ref},
};
use reqwest::{Client as HttpClient, Error as ReqwestError, StatusCode};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Reqwest Error: {0}")]
    ReqwestError(ReqwestError),

    #[error("OpenSSL Error: {0}")]
    OpenSslError(OpenSslError),

    #[error("Invalid Response ({0})")]
    InvalidResponse(StatusCode),

    #[error("Time out of range: {0}s since epoch")]
    TimeOutOfRange(i64),
}

impl From<ReqwestError> for Error {
    fn from(err: ReqwestError) -> Self {
        Self::ReqwestError(err)
    }
}

impl From<OpenSslError> for Error {
    fn from(err: OpenSslError) -> Self {
        Self::OpenSslError(err)
    }
}

/// Reason codes of a CRL entry the revocation policy knows about.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReasonCode {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
}

impl ReasonCode {
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::KeyCompromise),
            2 => Some(Self::CaCompromise),
            3 => Some(Self::AffiliationChanged),
            4 => Some(Self::Superseded),
            5 => Some(Self::CessationOfOperation),
            6 => Some(Self::CertificateHold),
            8 => Some(Self::RemoveFromCrl),
            _ => None,
        }
    }

    /// Whether a signature made at `signed_at` is invalidated by a revocation
    /// with this reason at `revoked_at`.
    pub fn revokes(&self, revoked_at: &DateTime<Utc>, signed_at: &DateTime<Utc>) -> bool {
        match self {
            Self::KeyCompromise | Self::CaCompromise => true,
            Self::Unspecified
            | Self::AffiliationChanged
            | Self::Superseded
            | Self::CessationOfOperation
            | Self::CertificateHold
            | Self::RemoveFromCrl => signed_at >= revoked_at,
        }
    }
}

#[async_trait]
pub trait CrlSource: Send + Sync {
    /// DER encoded CRL published at `uri`.
    async fn fetch_crl(&self, uri: &str) -> Result<Vec<u8>, Error>;
}

/// Fetches CRLs over HTTP with a request timeout.
pub struct HttpCrlSource {
    http: HttpClient,
}

impl HttpCrlSource {
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent("eps-translator")
            .build()?;

        Ok(Self { http })
    }
}

#[async_trait]
impl CrlSource for HttpCrlSource {
    async fn fetch_crl(&self, uri: &str) -> Result<Vec<u8>, Error> {
        let res = self.http.get(uri).send().await?;
        if res.status() != StatusCode::OK {
            return Err(Error::InvalidResponse(res.status()));
        }

        Ok(res.bytes().await?.to_vec())
    }
}

/// Whether `cert` was not revoked for a signature made at `signed_at`.
pub async fn is_certificate_valid<S>(cert: &X509Ref, signed_at: &DateTime<Utc>, source: &S) -> bool
where
    S: CrlSource + ?Sized,
{
    let serial = serial_number(cert);

    let distribution_points = crl_distribution_points(cert);
    if distribution_points.is_empty() {
        warn!(
            "Cannot retrieve HTTP CRL distribution point from certificate with serial {}, treating certificate as valid",
            serial
        );

        return true;
    }

    for uri in distribution_points {
        let crl = match source.fetch_crl(&uri).await {
            Ok(der) => X509Crl::from_der(&der).map_err(Error::from),
            Err(err) => Err(err),
        };

        let crl = match crl {
            Ok(crl) => crl,
            Err(err) => {
                warn!(
                    "Unable to fetch CRL (serial={}, distribution_point={}), treating certificate as valid: {}",
                    serial, uri, err
                );

                return true;
            }
        };

        let entry = match crl.get_by_serial(cert.serial_number()) {
            CrlStatus::NotRevoked => continue,
            CrlStatus::Revoked(entry) => entry,
            CrlStatus::RemoveFromCrl(entry) => entry,
        };

        return match is_revoked(entry, &serial, signed_at) {
            Ok(revoked) => !revoked,
            Err(err) => {
                warn!(
                    "Unable to check CRL entry of certificate with serial {}, treating certificate as valid: {}",
                    serial, err
                );

                true
            }
        };
    }

    true
}

fn is_revoked(
    entry: &X509RevokedRef,
    serial: &str,
    signed_at: &DateTime<Utc>,
) -> Result<bool, Error> {
    let value = match entry.extension::<CrlReasonExtension>()? {
        Some((_, code)) => Some(code.get_i64()?),
        None => None,
    };

    let reason = match value.and_then(ReasonCode::from_value) {
        Some(reason) => reason,
        None => {
            warn!(
                "Certificate with serial '{}' found on CRL with unhandled reason code {:?}, treating certificate as valid",
                serial, value
            );

            return Ok(false);
        }
    };

    let revoked_at = asn1_to_chrono(entry.revocation_date())?;
    let revoked = reason.revokes(&revoked_at, signed_at);
    if revoked {
        warn!(
            "Certificate with serial '{}' found on CRL with reason code {:?}",
            serial, reason
        );
    }

    Ok(revoked)
}

fn crl_distribution_points(cert: &X509Ref) -> Vec<String> {
    let points = match cert.crl_distribution_points() {
        Some(points) => points,
        None => return Vec::new(),
    };

    points
        .iter()
        .filter_map(|point| point.distpoint())
        .filter_map(|name| name.fullname())
        .flat_map(|names| names.iter())
        .filter_map(|name| name.uri())
        .filter(|uri| is_http_uri(uri))
        .map(ToOwned::to_owned)
        .collect()
}

/// Only HTTP distribution points are fetched, LDAP and file URIs are skipped.
fn is_http_uri(uri: &str) -> bool {
    match Url::parse(uri) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

fn serial_number(cert: &X509Ref) -> String {
    cert.serial_number()
        .to_bn()
        .and_then(|bn| bn.to_hex_str().map(|hex| hex.to_lowercase()))
        .unwrap_or_else(|_| "<unknown>".to_owned())
}

pub fn asn1_to_chrono(time: &Asn1TimeRef) -> Result<DateTime<Utc>, Error> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;

    from_unix(diff.days as i64 * 86_400 + diff.secs as i64)
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, Error> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(Error::TimeOutOfRange(secs))
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::fs::read;

    use openssl::x509::X509;

    /// Serves a fixed CRL for every distribution point, or fails every fetch.
    pub struct StaticCrlSource(pub Option<Vec<u8>>);

    impl StaticCrlSource {
        pub fn test_ca() -> Self {
            Self(Some(read("./examples/pki/test-ca.crl").unwrap()))
        }
    }

    #[async_trait]
    impl CrlSource for StaticCrlSource {
        async fn fetch_crl(&self, _uri: &str) -> Result<Vec<u8>, Error> {
            self.0
                .clone()
                .ok_or(Error::InvalidResponse(StatusCode::NOT_FOUND))
        }
    }

    fn cert(name: &str) -> X509 {
        X509::from_pem(&read(format!("./examples/pki/{}.pem", name)).unwrap()).unwrap()
    }

    fn date(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn reason_code_policy() {
        let revoked_at = date("2021-05-07T10:20:30Z");
        let before = date("2021-05-07T10:20:29Z");

        assert!(ReasonCode::KeyCompromise.revokes(&revoked_at, &before));
        assert!(ReasonCode::CaCompromise.revokes(&revoked_at, &before));

        for reason in &[
            ReasonCode::Unspecified,
            ReasonCode::AffiliationChanged,
            ReasonCode::Superseded,
            ReasonCode::CessationOfOperation,
            ReasonCode::CertificateHold,
            ReasonCode::RemoveFromCrl,
        ] {
            assert!(!reason.revokes(&revoked_at, &before));
            assert!(reason.revokes(&revoked_at, &revoked_at));
        }
    }

    #[test]
    fn unknown_reason_codes() {
        assert_eq!(None, ReasonCode::from_value(7));
        assert_eq!(None, ReasonCode::from_value(9));
        assert_eq!(Some(ReasonCode::RemoveFromCrl), ReasonCode::from_value(8));
    }

    #[test]
    fn reads_distribution_points() {
        assert_eq!(
            vec!["http://crl.example.nhs.uk/test-ca.crl".to_owned()],
            crl_distribution_points(&cert("valid"))
        );
        assert!(crl_distribution_points(&cert("ca")).is_empty());
    }

    #[test]
    fn fetches_http_distribution_points_only() {
        assert!(is_http_uri("http://crl.example.nhs.uk/test-ca.crl"));
        assert!(is_http_uri("https://crl.example.nhs.uk/test-ca.crl"));
        assert!(!is_http_uri("ldap://directory.example.nhs.uk/cn=Test%20Sub%20CA?certificateRevocationList"));
        assert!(!is_http_uri("test-ca.crl"));
    }

    #[tokio::test]
    async fn key_compromise_always_revokes() {
        let source = StaticCrlSource::test_ca();

        let valid = is_certificate_valid(&cert("key-compromise"), &date("2021-05-07T10:20:30Z"), &source).await;

        assert!(!valid);
    }

    #[tokio::test]
    async fn superseded_revokes_later_signatures_only() {
        let source = StaticCrlSource::test_ca();
        let cert = cert("superseded");

        assert!(is_certificate_valid(&cert, &date("2021-05-07T10:20:30Z"), &source).await);
        assert!(!is_certificate_valid(&cert, &date("2029-01-01T00:00:00Z"), &source).await);
    }

    #[tokio::test]
    async fn unlisted_certificate_is_valid() {
        let source = StaticCrlSource::test_ca();

        assert!(is_certificate_valid(&cert("valid"), &date("2029-01-01T00:00:00Z"), &source).await);
    }

    #[tokio::test]
    async fn unreachable_crl_is_valid() {
        let source = StaticCrlSource(None);

        assert!(is_certificate_valid(&cert("key-compromise"), &date("2021-05-07T10:20:30Z"), &source).await);
    }

    #[tokio::test]
    async fn unparsable_crl_is_valid() {
        let source = StaticCrlSource(Some(b"not a crl".to_vec()));

        assert!(is_certificate_valid(&cert("key-compromise"), &date("2021-05-07T10:20:30Z"), &source).await);
    }

    #[tokio::test]
    async fn missing_distribution_point_is_valid() {
        let source = StaticCrlSource::test_ca();

        assert!(is_certificate_valid(&cert("ca"), &date("2021-05-07T10:20:30Z"), &source).await);
    }

    #[test]
    fn converts_asn1_time() {
        let time = Asn1Time::from_unix(1_620_382_830).unwrap();

        assert_eq!(date("2021-05-07T10:20:30Z"), asn1_to_chrono(&time).unwrap());
    }

    #[test]
    fn rejects_times_out_of_range() {
        assert_eq!(date("1970-01-01T00:00:00Z"), from_unix(0).unwrap());
        assert!(matches!(
            from_unix(i64::MAX),
            Err(Error::TimeOutOfRange(i64::MAX))
        ));
    }
}
