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

use chrono::{DateTime as ChronoDateTime, NaiveDateTime, Utc};
use resources::primitives::{Date, DateTime};

use crate::hl7v3::Timestamp;

use super::Error;

const HL7V3_DATE_FORMAT: &str = "%Y%m%d";
const HL7V3_DATE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
const ISO_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";

fn parse_date_time(value: &str, fhir_path: &str) -> Result<ChronoDateTime<Utc>, Error> {
    let invalid = || {
        Error::invalid(
            format!("Incorrect format for date time string '{}'.", value),
            fhir_path,
        )
    };

    DateTime::try_from(value)
        .map_err(|_| invalid())?
        .to_utc()
        .map_err(|_| invalid())
}

/// FHIR `dateTime` as HL7v3 timestamp (`YYYYMMDDHHMMSS`, UTC).
pub fn to_hl7_date_time(value: &str, fhir_path: &str) -> Result<Timestamp, Error> {
    let date_time = parse_date_time(value, fhir_path)?;

    Ok(date_time_to_timestamp(&date_time))
}

/// FHIR `dateTime` reduced to an HL7v3 date (`YYYYMMDD`, UTC).
pub fn date_time_to_hl7_date(value: &str, fhir_path: &str) -> Result<Timestamp, Error> {
    let date_time = parse_date_time(value, fhir_path)?;

    Ok(Timestamp::new(date_time.format(HL7V3_DATE_FORMAT).to_string()))
}

/// FHIR `date` as HL7v3 date (`YYYYMMDD`).
pub fn to_hl7_date(value: &str, fhir_path: &str) -> Result<Timestamp, Error> {
    let invalid = || {
        Error::invalid(
            format!("Incorrect format for date string '{}'.", value),
            fhir_path,
        )
    };

    let date = Date::try_from(value)
        .map_err(|_| invalid())?
        .to_naive()
        .ok_or_else(invalid)?;

    Ok(Timestamp::new(date.format(HL7V3_DATE_FORMAT).to_string()))
}

pub fn date_time_to_timestamp(date_time: &ChronoDateTime<Utc>) -> Timestamp {
    Timestamp::new(date_time.format(HL7V3_DATE_TIME_FORMAT).to_string())
}

pub fn now() -> Timestamp {
    date_time_to_timestamp(&Utc::now())
}

/// HL7v3 timestamp as ISO date time with an explicit UTC offset.
pub fn hl7_date_time_to_iso(value: &str) -> Option<String> {
    parse_hl7_date_time(value).map(|date_time| date_time.format(ISO_DATE_TIME_FORMAT).to_string())
}

pub fn parse_hl7_date_time(value: &str) -> Option<ChronoDateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, HL7V3_DATE_TIME_FORMAT)
        .ok()
        .map(|naive| ChronoDateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Whether the FHIR date or date time lies after `now`. Unparsable values are
/// never in the future.
pub fn is_future_dated(value: &str, now: ChronoDateTime<Utc>) -> bool {
    let date_time = DateTime::try_from(value)
        .ok()
        .and_then(|date_time| date_time.to_utc().ok());

    matches!(date_time, Some(date_time) if now < date_time)
}

/// Whether `date` lies strictly between `start` and `end`.
pub fn is_date_in_range<T: PartialOrd>(date: &T, start: &T, end: &T) -> bool {
    date > start && date < end
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn converts_date_times_to_utc_timestamps() {
        let timestamp = to_hl7_date_time("2020-11-24T12:10:04+01:00", "Claim.created").unwrap();
        assert_eq!("20201124111004", timestamp.value);

        let timestamp = to_hl7_date_time("2021-03-01", "Claim.created").unwrap();
        assert_eq!("20210301000000", timestamp.value);
    }

    #[test]
    fn rejects_malformed_date_times() {
        assert_eq!(
            Err(Error::invalid(
                "Incorrect format for date time string '24/11/2020'.",
                "Provenance.signature.when"
            )),
            to_hl7_date_time("24/11/2020", "Provenance.signature.when")
        );
    }

    #[test]
    fn converts_dates() {
        assert_eq!("19980329", to_hl7_date("1998-03-29", "Patient.birthDate").unwrap().value);
        assert_eq!(
            Err(Error::invalid(
                "Incorrect format for date string '1998-03-29T10:00:00Z'.",
                "Patient.birthDate"
            )),
            to_hl7_date("1998-03-29T10:00:00Z", "Patient.birthDate")
        );
    }

    #[test]
    fn reduces_date_times_to_dates() {
        let timestamp = date_time_to_hl7_date(
            "2021-05-07T23:30:00-01:00",
            "MedicationRequest.dispenseRequest.validityPeriod.start",
        )
        .unwrap();

        assert_eq!("20210508", timestamp.value);
    }

    #[test]
    fn converts_timestamps_to_iso() {
        assert_eq!(
            Some("2021-05-07T10:20:30+00:00".to_owned()),
            hl7_date_time_to_iso("20210507102030")
        );
        assert_eq!(None, hl7_date_time_to_iso("2021-05-07"));
    }

    #[test]
    fn parses_timestamps_as_utc() {
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2021, 5, 7, 10, 20, 30).unwrap()),
            parse_hl7_date_time("20210507102030")
        );
        assert_eq!(None, parse_hl7_date_time("20210507"));
    }

    #[test]
    fn future_dates_are_strictly_after_now() {
        let now = Utc.with_ymd_and_hms(2021, 5, 7, 10, 0, 0).unwrap();

        assert!(is_future_dated("2021-05-08", now));
        assert!(!is_future_dated("2021-05-07T10:00:00Z", now));
        assert!(!is_future_dated("2020-01-01", now));
        assert!(!is_future_dated("not a date", now));
    }

    #[test]
    fn ranges_are_exclusive() {
        assert!(is_date_in_range(&2, &1, &3));
        assert!(!is_date_in_range(&1, &1, &3));
        assert!(!is_date_in_range(&3, &1, &3));
    }
}
