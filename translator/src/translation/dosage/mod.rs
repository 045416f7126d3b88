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

use std::collections::BTreeMap;

use log::{info, warn};
use resources::{
    dosage::{Dosage, DoseAndRate},
    misc::{CodeableConcept, Quantity, Ratio},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Null or undefined dosage element - required field not populated.")]
    MissingElement,

    #[error("Period or periodMax specified without a frequency and period is not 1.")]
    PeriodWithoutFrequency,

    #[error("No entries in asNeededCodeableConcept.")]
    EmptyAsNeeded,

    #[error("Multiple dosage instructions but sequence not specified")]
    MissingSequence,

    #[error("Dosage sequence is not an integer: {0}")]
    InvalidSequence(String),

    #[error("Invalid dateTime {0}")]
    InvalidDateTime(String),

    #[error("Invalid time of day {0}")]
    InvalidTimeOfDay(String),

    #[error("Unit of time not specified.")]
    MissingUnitOfTime,
}

/// Tokens of one part of the narrated text. A `None` token marks an element
/// that is required once its parent is populated but was not provided.
pub type Fragment = Vec<Option<String>>;

pub trait IntoToken {
    fn into_token(self) -> Option<String>;
}

impl IntoToken for &str {
    fn into_token(self) -> Option<String> {
        Some(self.to_owned())
    }
}

impl IntoToken for String {
    fn into_token(self) -> Option<String> {
        Some(self)
    }
}

impl IntoToken for &String {
    fn into_token(self) -> Option<String> {
        Some(self.clone())
    }
}

impl IntoToken for Option<String> {
    fn into_token(self) -> Option<String> {
        self
    }
}

impl IntoToken for Option<&str> {
    fn into_token(self) -> Option<String> {
        self.map(ToOwned::to_owned)
    }
}

macro_rules! fragment {
    ($($token:expr),* $(,)?) => {
        vec![$($crate::translation::dosage::IntoToken::into_token($token)),*]
    };
}

mod frequency;
mod timing;
mod units;

use frequency::{count, duration, frequency_and_period};
use timing::{bounds, day_of_week_and_time_of_day, event, offset_and_when};
use units::{is_one, list_with_separators, numeric, quantity_unit, quantity_value, range};

/// Concatenates the tokens of a fragment, failing on the first missing one.
pub fn join(fragment: Fragment) -> Result<String, Error> {
    fragment
        .into_iter()
        .try_fold(String::new(), |mut text, token| match token {
            Some(token) => {
                text.push_str(&token);

                Ok(text)
            }
            None => Err(Error::MissingElement),
        })
}

/// Renders a single dosage instruction as text, e.g. "2 tablet - daily".
pub fn narrate(dosage: &Dosage) -> Result<String, Error> {
    let timing = dosage.timing.as_ref();
    let repeat = timing.and_then(|timing| timing.repeat.as_ref());
    let dose_and_rate = dosage.dose_and_rate.first();

    let head = join(method(dosage.method.as_ref()))?;

    let parts = vec![
        dose(dose_and_rate)?,
        rate(dose_and_rate),
        duration(repeat)?,
        frequency_and_period(repeat)?,
        offset_and_when(repeat),
        day_of_week_and_time_of_day(repeat)?,
        first_display(dosage.route.as_ref()),
        first_display(dosage.site.as_ref()),
        as_needed(dosage)?,
        bounds(repeat)?,
        count(repeat),
        event(timing.map(|timing| &timing.event[..]).unwrap_or_default())?,
        max_dose_per_period(dosage.max_dose_per_period.as_ref()),
        max_dose(dosage.max_dose_per_administration.as_ref(), " per dose"),
        max_dose(
            dosage.max_dose_per_lifetime.as_ref(),
            " for the lifetime of the patient",
        ),
        additional_instruction(&dosage.additional_instruction),
        dosage
            .patient_instruction
            .iter()
            .map(IntoToken::into_token)
            .collect(),
    ];

    let mut tail = Vec::with_capacity(parts.len());
    for part in parts {
        if part.is_empty() {
            continue;
        }

        let text = join(part)?;
        if !text.is_empty() {
            tail.push(text);
        }
    }

    let tail = tail.join(" - ");

    Ok(match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail,
        (false, true) => head,
        (false, false) => format!("{} {}", head, tail),
    })
}

/// Renders a list of dosage instructions. Instructions with the same sequence
/// are taken together, sequences are taken one after another.
pub fn narrate_many(dosages: &[Dosage]) -> Result<String, Error> {
    match dosages {
        [] => return Ok(String::new()),
        [dosage] => return narrate(dosage),
        _ => (),
    }

    let mut groups = BTreeMap::<i64, Vec<String>>::new();
    for dosage in dosages {
        let sequence = dosage.sequence.as_ref().ok_or(Error::MissingSequence)?;
        let sequence = sequence
            .as_integer()
            .ok_or_else(|| Error::InvalidSequence(sequence.to_string()))?;

        groups.entry(sequence).or_default().push(narrate(dosage)?);
    }

    Ok(groups
        .into_iter()
        .map(|(_, texts)| texts.join(", and "))
        .collect::<Vec<_>>()
        .join(", then "))
}

/// Records the narrated text of the given dosages. Failures are logged and
/// never returned.
pub fn audit(dosages: &[Dosage]) {
    match narrate_many(dosages) {
        Ok(text) => info!("Auditing dose to text conversion: {}", text),
        Err(err) => warn!("Dose to text conversion failed: {}", err),
    }
}

fn display(concept: &CodeableConcept) -> Option<&str> {
    concept
        .coding
        .first()
        .and_then(|coding| coding.display.as_deref())
}

fn first_display(concept: Option<&CodeableConcept>) -> Fragment {
    match concept {
        Some(concept) => fragment![display(concept)],
        None => Fragment::new(),
    }
}

fn method(method: Option<&CodeableConcept>) -> Fragment {
    first_display(method)
}

fn dose(dose_and_rate: Option<&DoseAndRate>) -> Result<Fragment, Error> {
    let dose_and_rate = match dose_and_rate {
        Some(dose_and_rate) => dose_and_rate,
        None => return Ok(Fragment::new()),
    };

    if let Some(quantity) = dose_and_rate.dose_quantity.as_ref() {
        return Ok(fragment![
            quantity_value(Some(quantity)),
            " ",
            quantity_unit(Some(quantity), false)
        ]);
    }

    Ok(dose_and_rate
        .dose_range
        .as_ref()
        .map(|dose_range| range(dose_range, false))
        .unwrap_or_default())
}

fn rate(dose_and_rate: Option<&DoseAndRate>) -> Fragment {
    let dose_and_rate = match dose_and_rate {
        Some(dose_and_rate) => dose_and_rate,
        None => return Fragment::new(),
    };

    if let Some(ratio) = dose_and_rate.rate_ratio.as_ref() {
        return rate_ratio(ratio);
    }

    if let Some(rate_range) = dose_and_rate.rate_range.as_ref() {
        let mut fragment = fragment!["at a rate of "];
        fragment.extend(range(rate_range, false));

        return fragment;
    }

    match dose_and_rate.rate_quantity.as_ref() {
        Some(quantity) => fragment![
            "at a rate of ",
            quantity_value(Some(quantity)),
            " ",
            quantity_unit(Some(quantity), false)
        ],
        None => Fragment::new(),
    }
}

fn rate_ratio(ratio: &Ratio) -> Fragment {
    let numerator = ratio.numerator.as_ref();
    let denominator = ratio.denominator.as_ref();
    let denominator_value = denominator.and_then(|quantity| quantity.value.as_ref());

    let mut fragment = fragment![
        "at a rate of ",
        quantity_value(numerator),
        " ",
        quantity_unit(numerator, false)
    ];

    if is_one(denominator_value) {
        fragment.extend(fragment![" per ", quantity_unit(denominator, false)]);
    } else {
        fragment.extend(fragment![
            " every ",
            numeric(denominator_value),
            " ",
            quantity_unit(denominator, true)
        ]);
    }

    fragment
}

fn as_needed(dosage: &Dosage) -> Result<Fragment, Error> {
    if let Some(concept) = dosage.as_needed_codeable_concept.as_ref() {
        if concept.coding.is_empty() {
            return Err(Error::EmptyAsNeeded);
        }

        let mut fragment = fragment!["as required for "];
        fragment.extend(list_with_separators(
            concept.coding.iter().map(|coding| coding.display.as_deref()),
        ));

        return Ok(fragment);
    }

    match dosage.as_needed_boolean {
        Some(true) => Ok(fragment!["as required"]),
        _ => Ok(Fragment::new()),
    }
}

fn max_dose_per_period(ratio: Option<&Ratio>) -> Fragment {
    let ratio = match ratio {
        Some(ratio) => ratio,
        None => return Fragment::new(),
    };

    let numerator = ratio.numerator.as_ref();
    let denominator = ratio.denominator.as_ref();

    fragment![
        "up to a maximum of ",
        quantity_value(numerator),
        " ",
        quantity_unit(numerator, false),
        " in ",
        quantity_value(denominator),
        " ",
        quantity_unit(denominator, true)
    ]
}

fn max_dose(quantity: Option<&Quantity>, suffix: &str) -> Fragment {
    match quantity {
        Some(quantity) => fragment![
            "up to a maximum of ",
            quantity_value(Some(quantity)),
            " ",
            quantity_unit(Some(quantity), false),
            suffix
        ],
        None => Fragment::new(),
    }
}

fn additional_instruction(concepts: &[CodeableConcept]) -> Fragment {
    if concepts.is_empty() {
        return Fragment::new();
    }

    list_with_separators(concepts.iter().map(display))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dosage(json: &str) -> Dosage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn dose_quantity_is_rendered_verbatim() {
        let dosage = dosage(
            r#"{ "doseAndRate": [{ "doseQuantity": { "value": 10, "unit": "milligram" } }] }"#,
        );

        assert_eq!("10 milligram", narrate(&dosage).unwrap());
    }

    #[test]
    fn dose_quantity_without_unit_fails() {
        let dosage = dosage(r#"{ "doseAndRate": [{ "doseQuantity": { "value": 10 } }] }"#);

        assert_eq!(Err(Error::MissingElement), narrate(&dosage));
    }

    #[test]
    fn dose_quantity_with_empty_unit_fails() {
        let dosage = dosage(r#"{ "doseAndRate": [{ "doseQuantity": { "value": 10, "unit": "" } }] }"#);

        assert_eq!(Err(Error::MissingElement), narrate(&dosage));
    }

    #[test]
    fn frequency_scenarios() {
        let once = dosage(
            r#"{ "timing": { "repeat": { "frequency": 1, "period": 1, "periodUnit": "d" } } }"#,
        );
        let twice = dosage(
            r#"{ "timing": { "repeat": { "frequency": 2, "period": 8, "periodUnit": "h" } } }"#,
        );

        assert_eq!("once a day", narrate(&once).unwrap());
        assert_eq!("twice every 8 hours", narrate(&twice).unwrap());
    }

    #[test]
    fn method_is_joined_with_a_space() {
        let dosage = dosage(
            r#"{
                "method": { "coding": [{ "display": "Inhale" }] },
                "doseAndRate": [{ "doseQuantity": { "value": 2, "unit": "puff" } }],
                "timing": { "repeat": { "period": 1, "periodUnit": "d" } },
                "route": { "coding": [{ "display": "Inhalation" }] },
                "patientInstruction": "Rinse mouth afterwards"
            }"#,
        );

        assert_eq!(
            "Inhale 2 puff - daily - Inhalation - Rinse mouth afterwards",
            narrate(&dosage).unwrap()
        );
    }

    #[test]
    fn rates_and_maximum_doses() {
        let dosage = dosage(
            r#"{
                "doseAndRate": [{
                    "rateRatio": {
                        "numerator": { "value": 5, "unit": "millilitre" },
                        "denominator": { "value": 1, "unit": "hour" }
                    }
                }],
                "maxDosePerPeriod": {
                    "numerator": { "value": 8, "unit": "tablet" },
                    "denominator": { "value": 24, "unit": "hour" }
                },
                "maxDosePerAdministration": { "value": 2, "unit": "tablet" }
            }"#,
        );

        assert_eq!(
            "at a rate of 5 millilitre per hour - up to a maximum of 8 tablet in 24 hours - up to a maximum of 2 tablet per dose",
            narrate(&dosage).unwrap()
        );
    }

    #[test]
    fn empty_as_needed_concept_fails() {
        let dosage = dosage(r#"{ "asNeededCodeableConcept": { "coding": [] } }"#);

        assert_eq!(Err(Error::EmptyAsNeeded), narrate(&dosage));
    }

    #[test]
    fn concurrent_dosages_are_joined_with_and() {
        let dosages = vec![
            dosage(
                r#"{
                    "sequence": 1,
                    "doseAndRate": [{ "doseQuantity": { "value": 2, "unit": "tablet" } }],
                    "timing": { "repeat": { "period": 1, "periodUnit": "d" } }
                }"#,
            ),
            dosage(
                r#"{
                    "sequence": 1,
                    "doseAndRate": [{ "doseQuantity": { "value": 1, "unit": "tablet" } }],
                    "asNeededBoolean": true
                }"#,
            ),
        ];

        assert_eq!(
            "2 tablet - daily, and 1 tablet - as required",
            narrate_many(&dosages).unwrap()
        );
    }

    #[test]
    fn sequences_are_sorted() {
        let dosages = vec![
            dosage(r#"{ "sequence": 2, "patientInstruction": "then this" }"#),
            dosage(r#"{ "sequence": 1, "patientInstruction": "first this" }"#),
        ];

        assert_eq!("first this, then then this", narrate_many(&dosages).unwrap());
    }

    #[test]
    fn multiple_dosages_require_a_sequence() {
        let dosages = vec![
            dosage(r#"{ "sequence": 1, "patientInstruction": "a" }"#),
            dosage(r#"{ "patientInstruction": "b" }"#),
        ];

        assert_eq!(Err(Error::MissingSequence), narrate_many(&dosages));
    }

    #[test]
    fn no_dosages_narrate_to_nothing() {
        assert_eq!("", narrate_many(&[]).unwrap());
    }
}
