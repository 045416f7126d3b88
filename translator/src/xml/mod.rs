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

pub mod c14n;
pub mod element;
pub mod ser;

use std::str::Utf8Error;

use quick_xml::Error as QuickXmlError;
use thiserror::Error;

pub use c14n::canonicalize;
pub use element::{Element, Node};

pub const HL7V3_NAMESPACE: &str = "urn:hl7-org:v3";
pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

#[derive(Error, Debug)]
pub enum Error {
    #[error("XML Error: {0}")]
    Xml(QuickXmlError),

    #[error("UTF-8 Error: {0}")]
    Utf8(Utf8Error),

    #[error("Unexpected closing tag: {0}")]
    UnexpectedEnd(String),

    #[error("Document has no root element")]
    NoRoot,

    #[error("Unclosed element: {0}")]
    Unclosed(String),
}

impl From<QuickXmlError> for Error {
    fn from(err: QuickXmlError) -> Self {
        Self::Xml(err)
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Self::Utf8(err)
    }
}
