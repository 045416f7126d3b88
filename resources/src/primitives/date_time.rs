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
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::Deref;
use std::str::FromStr;

use chrono::{naive::NaiveDate, DateTime as ChronoDateTime, Duration, TimeZone, Utc};
use regex::{Captures, Regex};

/// FHIR `dateTime`: a year, year-month, date or a full date and time with
/// seconds and a zone offset.
#[derive(Clone, Debug, PartialEq)]
pub struct DateTime(String);

#[derive(Default, Debug, PartialEq)]
pub struct Parts {
    pub year: i32,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub min: Option<u32>,
    pub sec: Option<u32>,
    pub nano: Option<(u32, u32)>,
    pub offset_minutes: i64,
}

impl DateTime {
    pub fn parts(&self) -> Result<Parts, String> {
        self.0
            .parse::<Parts>()
            .map_err(|()| format!("Invalid date time: {}!", self.0))
    }

    pub fn to_utc(&self) -> Result<ChronoDateTime<Utc>, String> {
        self.parts()?
            .to_utc()
            .ok_or_else(|| format!("Date time out of range: {}!", self.0))
    }
}

impl<TZ> From<ChronoDateTime<TZ>> for DateTime
where
    TZ: TimeZone,
    <TZ as TimeZone>::Offset: Display,
{
    fn from(v: ChronoDateTime<TZ>) -> Self {
        Self(v.to_rfc3339())
    }
}

impl TryFrom<&str> for DateTime {
    type Error = String;

    fn try_from(v: &str) -> Result<Self, Self::Error> {
        from_string(v.to_owned())
    }
}

impl TryFrom<String> for DateTime {
    type Error = String;

    fn try_from(v: String) -> Result<Self, Self::Error> {
        from_string(v)
    }
}

impl Deref for DateTime {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.0.fmt(f)
    }
}

impl Parts {
    /// Instant described by these parts; missing components default to the
    /// start of the period.
    pub fn to_utc(&self) -> Option<ChronoDateTime<Utc>> {
        let nano = self
            .nano
            .map(|(x, exp)| x * 10u32.pow(exp))
            .unwrap_or_default();

        let local = NaiveDate::from_ymd_opt(
            self.year,
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
        )?
        .and_hms_nano_opt(
            self.hour.unwrap_or_default(),
            self.min.unwrap_or_default(),
            self.sec.unwrap_or_default(),
            nano,
        )?;

        let utc = local - Duration::minutes(self.offset_minutes);

        Some(Utc.from_utc_datetime(&utc))
    }
}

impl FromStr for Parts {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = RX.captures(&s).ok_or(())?;

        let nano = match captures.get(7) {
            Some(c) => {
                let digits = &c.as_str()[..c.as_str().len().min(9)];
                let nsec = digits.parse::<u32>().map_err(|_| ())?;

                Some((nsec, (9 - digits.len()) as u32))
            }
            None => None,
        };

        let offset_minutes = match captures.get(8).map(|c| c.as_str()) {
            None | Some("Z") => 0,
            Some(tz) => {
                let mut split = tz[1..].split(':');
                let hours: i64 = split.next().ok_or(())?.parse().map_err(|_| ())?;
                let minutes: i64 = split.next().ok_or(())?.parse().map_err(|_| ())?;
                let offset = hours * 60 + minutes;

                if tz.starts_with('-') {
                    -offset
                } else {
                    offset
                }
            }
        };

        Ok(Self {
            year: from_capture(&captures, 1)?.ok_or(())?,
            month: from_capture(&captures, 2)?,
            day: from_capture(&captures, 3)?,
            hour: from_capture(&captures, 4)?,
            min: from_capture(&captures, 5)?,
            sec: from_capture(&captures, 6)?,
            nano,
            offset_minutes,
        })
    }
}

fn from_capture<T: FromStr>(captures: &Captures, index: usize) -> Result<Option<T>, ()> {
    captures
        .get(index)
        .map(|c| c.as_str().parse().map_err(|_| ()))
        .transpose()
}

fn from_string(s: String) -> Result<DateTime, String> {
    if RX.is_match(&s) {
        Ok(DateTime(s))
    } else {
        Err(s)
    }
}

lazy_static! {
    static ref RX: Regex = Regex::new(
        r#"^([0-9](?:[0-9](?:[0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)(?:-(0[1-9]|1[0-2])(?:-(0[1-9]|[1-2][0-9]|3[0-1])(?:T([01][0-9]|2[0-3]):([0-5][0-9]):([0-5][0-9]|60)(?:\.([0-9]+))?(Z|(?:\+|-)(?:(?:0[0-9]|1[0-3]):[0-5][0-9]|14:00)))?)?)?$"#
    )
    .unwrap();
}
