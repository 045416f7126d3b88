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

mod sequences;
mod serializer;
mod structs;
mod values;

use std::io::Write;

use quick_xml::{DeError as Error, Error as XmlError};
use serde::Serialize;

pub use serializer::{Serializer, RAW_XML};

pub fn to_writer<W: Write, S: Serialize>(write: W, value: &S) -> Result<W, Error> {
    let mut serializer = Serializer::new(write);

    value.serialize(&mut serializer)?;

    serializer.finish()
}

pub fn to_string<S: Serialize>(value: &S) -> Result<String, Error> {
    let buf = to_writer(Vec::new(), value)?;

    Ok(String::from_utf8(buf).map_err(|err| XmlError::Utf8(err.utf8_error()))?)
}
