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

use quick_xml::DeError as XmlError;
use resources::operation_outcome::{Issue, IssueType, OperationOutcome, Severity};
use thiserror::Error;

use super::dosage::Error as DosageError;

/// Processing error raised while translating malformed input. Each variant
/// carries the FHIR path of the offending element.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{message}")]
    TooFewValues { message: String, fhir_path: String },

    #[error("{message}")]
    TooManyValues { message: String, fhir_path: String },

    #[error("{message}")]
    InvalidValue { message: String, fhir_path: String },

    #[error("{message}")]
    MissingRequiredField { message: String, fhir_path: String },

    #[error("Dosage Error: {0}")]
    Dosage(DosageError),

    #[error("XML Error: {0}")]
    Xml(String),
}

impl Error {
    pub fn too_few<M: Into<String>, P: Into<String>>(message: M, fhir_path: P) -> Self {
        Self::TooFewValues {
            message: message.into(),
            fhir_path: fhir_path.into(),
        }
    }

    pub fn too_many<M: Into<String>, P: Into<String>>(message: M, fhir_path: P) -> Self {
        Self::TooManyValues {
            message: message.into(),
            fhir_path: fhir_path.into(),
        }
    }

    pub fn invalid<M: Into<String>, P: Into<String>>(message: M, fhir_path: P) -> Self {
        Self::InvalidValue {
            message: message.into(),
            fhir_path: fhir_path.into(),
        }
    }

    pub fn missing<M: Into<String>, P: Into<String>>(message: M, fhir_path: P) -> Self {
        Self::MissingRequiredField {
            message: message.into(),
            fhir_path: fhir_path.into(),
        }
    }

    pub fn fhir_path(&self) -> Option<&str> {
        match self {
            Self::TooFewValues { fhir_path, .. }
            | Self::TooManyValues { fhir_path, .. }
            | Self::InvalidValue { fhir_path, .. }
            | Self::MissingRequiredField { fhir_path, .. } => Some(fhir_path),
            Self::Dosage(_) | Self::Xml(_) => None,
        }
    }

    fn issue_type(&self) -> IssueType {
        match self {
            Self::TooFewValues { .. } => IssueType::NotFound,
            Self::TooManyValues { .. } => IssueType::MultipleMatches,
            Self::InvalidValue { .. } => IssueType::Value,
            Self::MissingRequiredField { .. } => IssueType::Required,
            Self::Dosage(_) => IssueType::Value,
            Self::Xml(_) => IssueType::Exception,
        }
    }
}

impl From<&Error> for OperationOutcome {
    fn from(err: &Error) -> Self {
        let diagnostics = match err {
            Error::Dosage(err) => err.to_string(),
            err => err.to_string(),
        };

        Issue {
            severity: Severity::Error,
            code: err.issue_type(),
            diagnostics: Some(diagnostics),
            expression: err.fhir_path().map(|p| vec![p.to_owned()]).unwrap_or_default(),
        }
        .into()
    }
}

impl From<DosageError> for Error {
    fn from(err: DosageError) -> Self {
        Self::Dosage(err)
    }
}

impl From<XmlError> for Error {
    fn from(err: XmlError) -> Self {
        Self::Xml(err.to_string())
    }
}
