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

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::Deref;

use serde::{de::Error, Deserialize, Deserializer};
use serde_json::{from_str, Number, Value};

/// Numeric literal kept exactly as it was written in the JSON input. Numbers
/// given as JSON strings are accepted as long as the text is a valid number.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Decimal(String);

impl Decimal {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_one(&self) -> bool {
        self.0 == "1"
    }

    pub fn is_two(&self) -> bool {
        self.0 == "2"
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl From<&str> for Decimal {
    fn from(v: &str) -> Self {
        Self(v.to_owned())
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Self(v.to_string())
    }
}

impl Into<String> for Decimal {
    fn into(self) -> String {
        self.0
    }
}

impl Deref for Decimal {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Ok(Decimal(n.to_string())),
            Value::String(s) if s.trim() == s && from_str::<Number>(&s).is_ok() => Ok(Decimal(s)),
            Value::String(s) => Err(D::Error::custom(format!("Invalid decimal: '{}'", s))),
            other => Err(D::Error::custom(format!("Expected decimal, found {}", other))),
        }
    }
}
