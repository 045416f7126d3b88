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

use regex::Regex;
use serde::Serialize;

macro_rules! oid {
    ($suffix:literal) => {
        concat!("2.16.840.1.113883.2.1.3.2.4.", $suffix)
    };
}

/* Code systems */

pub const SNOMED: &str = oid!("15");
pub const SEX: &str = oid!("16.25");
pub const CANCELLATION: &str = oid!("16.27");
pub const RETURN_REASON: &str = oid!("16.28");
pub const DISPENSING_ENDORSEMENT: &str = oid!("16.29");
pub const NOT_DISPENSED_REASON: &str = oid!("16.31");
pub const PRESCRIPTION_ENDORSEMENT: &str = oid!("16.32");
pub const CHARGE_EXEMPTION: &str = oid!("16.33");
pub const PRESCRIPTION_STATUS: &str = oid!("16.35");
pub const PRESCRIPTION_TREATMENT_TYPE: &str = oid!("16.36");
pub const DISPENSING_SITE_PREFERENCE: &str = oid!("17.21");
pub const ITEM_STATUS: &str = oid!("17.23");
pub const PRESCRIPTION_TYPE: &str = oid!("17.25");
pub const PRESCRIPTION_ANNOTATION: &str = oid!("17.30");
pub const PATIENT_CARE_PROVISION_TYPE: &str = oid!("17.37");
pub const ORGANIZATION_TYPE: &str = oid!("17.94");
pub const WITHDRAW_TYPE: &str = oid!("17.109");
pub const WITHDRAW_REASON: &str = oid!("17.110");
pub const SDS_JOB_ROLE: &str = "1.2.826.0.1285.0.2.1.104";

/* Identifier roots */

pub const INTERACTION_ROOT: &str = oid!("12");
pub const TEMPLATE_ROOT: &str = oid!("18.2");
pub const TYPE_ID_ROOT: &str = oid!("18.7");
pub const SHORT_FORM_ROOT: &str = oid!("18.8");
pub const NHS_NUMBER_ROOT: &str = "2.16.840.1.113883.2.1.4.1";
pub const PROFESSIONAL_CODE_ROOT: &str = "1.2.826.0.1285.0.2.1.54";
pub const SDS_UNIQUE_ID_ROOT: &str = "1.2.826.0.1285.0.2.0.65";
pub const SDS_ROLE_PROFILE_ROOT: &str = "1.2.826.0.1285.0.2.0.67";
pub const SDS_ORGANIZATION_ROOT: &str = "1.2.826.0.1285.0.1.10";
pub const ACCREDITED_SYSTEM_ROOT: &str = "1.2.826.0.1285.0.2.0.107";
pub const SDS_JOB_ROLE_ROOT: &str = "1.2.826.0.1285.0.2.1.104";

lazy_static! {
    static ref UUID: Regex =
        Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            .unwrap();
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Identifier {
    #[serde(rename = "attrib=root")]
    pub root: String,

    #[serde(rename = "attrib=extension")]
    pub extension: Option<String>,
}

impl Identifier {
    pub fn new<R: Into<String>, E: Into<String>>(root: R, extension: E) -> Self {
        Self {
            root: root.into(),
            extension: Some(extension.into()),
        }
    }

    /// Globally unique identifier carried in the root. UUIDs are upper cased.
    pub fn global(value: &str) -> Self {
        let root = if UUID.is_match(value) {
            value.to_uppercase()
        } else {
            value.to_owned()
        };

        Self {
            root,
            extension: None,
        }
    }

    pub fn short_form<T: Into<String>>(value: T) -> Self {
        Self::new(SHORT_FORM_ROOT, value)
    }

    pub fn nhs_number<T: Into<String>>(value: T) -> Self {
        Self::new(NHS_NUMBER_ROOT, value)
    }

    pub fn professional_code<T: Into<String>>(value: T) -> Self {
        Self::new(PROFESSIONAL_CODE_ROOT, value)
    }

    pub fn sds_unique_id<T: Into<String>>(value: T) -> Self {
        Self::new(SDS_UNIQUE_ID_ROOT, value)
    }

    pub fn sds_role_profile<T: Into<String>>(value: T) -> Self {
        Self::new(SDS_ROLE_PROFILE_ROOT, value)
    }

    pub fn sds_organization<T: Into<String>>(value: T) -> Self {
        Self::new(SDS_ORGANIZATION_ROOT, value)
    }

    pub fn accredited_system<T: Into<String>>(value: T) -> Self {
        Self::new(ACCREDITED_SYSTEM_ROOT, value)
    }

    pub fn sds_job_role<T: Into<String>>(value: T) -> Self {
        Self::new(SDS_JOB_ROLE_ROOT, value)
    }

    pub fn type_id(value: &'static str) -> Self {
        Self::new(TYPE_ID_ROOT, value)
    }

    pub fn interaction(value: &'static str) -> Self {
        Self::new(INTERACTION_ROOT, value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Code {
    #[serde(rename = "attrib=codeSystem")]
    pub code_system: Option<&'static str>,

    #[serde(rename = "attrib=code")]
    pub code: String,

    #[serde(rename = "attrib=displayName")]
    pub display_name: Option<String>,
}

impl Code {
    pub fn new<T: Into<String>>(code_system: &'static str, code: T) -> Self {
        Self {
            code_system: Some(code_system),
            code: code.into(),
            display_name: None,
        }
    }

    pub fn without_system<T: Into<String>>(code: T) -> Self {
        Self {
            code_system: None,
            code: code.into(),
            display_name: None,
        }
    }

    pub fn snomed<T: Into<String>>(code: T) -> Self {
        Self::new(SNOMED, code)
    }

    pub fn with_display<T: Into<String>>(mut self, display_name: T) -> Self {
        self.display_name = Some(display_name.into());

        self
    }

    pub fn with_display_opt(mut self, display_name: Option<&str>) -> Self {
        self.display_name = display_name.map(ToOwned::to_owned);

        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sex {
    Male,
    Female,
    Indeterminate,
    Unknown,
}

impl Sex {
    pub fn code(&self) -> Code {
        let code = match self {
            Self::Male => "1",
            Self::Female => "2",
            Self::Indeterminate => "9",
            Self::Unknown => "0",
        };

        Code::new(SEX, code)
    }
}

/// Prescription treatment types (`0001` acute, `0002` repeat prescribing,
/// `0003` repeat dispensing).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TreatmentType {
    Acute,
    ContinuousRepeatPrescribing,
    ContinuousRepeatDispensing,
}

impl TreatmentType {
    pub fn code(&self) -> Code {
        let code = match self {
            Self::Acute => "0001",
            Self::ContinuousRepeatPrescribing => "0002",
            Self::ContinuousRepeatDispensing => "0003",
        };

        Code::new(PRESCRIPTION_TREATMENT_TYPE, code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::xml::ser::to_string;

    #[test]
    fn global_uuids_are_upper_cased() {
        let id = Identifier::global("a7b86f8d-1d8d-4e33-9a1e-4f5f0b6bd0d4");
        assert_eq!("A7B86F8D-1D8D-4E33-9A1E-4F5F0B6BD0D4", id.root);
        assert_eq!(None, id.extension);

        let id = Identifier::global("2.16.840.1.113883.2.1.3.2.4.18.8");
        assert_eq!("2.16.840.1.113883.2.1.3.2.4.18.8", id.root);
    }

    #[test]
    fn serialize_codes() {
        #[derive(Serialize)]
        struct Act {
            code: Code,
            id: Identifier,
        }

        let act = Act {
            code: Code::snomed("225426007")
                .with_display("Administration of therapeutic substance (procedure)"),
            id: Identifier::short_form("A0548B-A99968-451485"),
        };

        assert_eq!(
            concat!(
                r#"<Act>"#,
                r#"<code codeSystem="2.16.840.1.113883.2.1.3.2.4.15" code="225426007" displayName="Administration of therapeutic substance (procedure)"/>"#,
                r#"<id root="2.16.840.1.113883.2.1.3.2.4.18.8" extension="A0548B-A99968-451485"/>"#,
                r#"</Act>"#
            ),
            to_string(&act).unwrap()
        );
    }

    #[test]
    fn sex_codes() {
        assert_eq!("1", Sex::Male.code().code);
        assert_eq!("9", Sex::Indeterminate.code().code);
        assert_eq!(Some(SEX), Sex::Unknown.code().code_system);
    }
}
