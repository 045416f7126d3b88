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

use resources::{
    dosage::{TimingRepeat, UnitOfTime},
    primitives::Decimal,
};

use super::{
    units::{
        indefinite_article, is_one, is_two, numeric, reciprocal_unit_of_time_display,
        unit_of_time, unit_of_time_display,
    },
    Error, Fragment,
};

/// How often the dose is taken, e.g. "twice a day" or "3 times every 2 weeks".
pub fn frequency_and_period(repeat: Option<&TimingRepeat>) -> Result<Fragment, Error> {
    let repeat = match repeat {
        Some(repeat) => repeat,
        None => return Ok(Fragment::new()),
    };

    let frequency = repeat.frequency.as_ref();
    let frequency_max = repeat.frequency_max.as_ref();
    let period = repeat.period.as_ref();
    let period_max = repeat.period_max.as_ref();

    if frequency.is_none() && frequency_max.is_none() {
        return indefinite_frequency(period, period_max, repeat.period_unit);
    }

    if is_one(frequency) && frequency_max.is_none() {
        return match (period, period_max) {
            (None, None) => Ok(fragment!["once"]),
            (period, None) if is_one(period) => {
                let mut fragment = fragment!["once "];
                fragment.extend(standard_period(repeat)?);

                Ok(fragment)
            }
            _ => standard_period(repeat),
        };
    }

    if is_two(frequency) && frequency_max.is_none() {
        return match (period, period_max) {
            (None, None) => Ok(fragment!["twice"]),
            _ => {
                let mut fragment = fragment!["twice "];
                fragment.extend(standard_period(repeat)?);

                Ok(fragment)
            }
        };
    }

    let mut fragment = match (frequency, frequency_max) {
        (Some(_), Some(_)) => fragment![
            numeric(frequency),
            " to ",
            numeric(frequency_max),
            " times"
        ],
        (Some(_), None) => fragment![numeric(frequency), " times"],
        _ => fragment!["up to ", numeric(frequency_max), " times"],
    };

    if period.is_some() || period_max.is_some() {
        fragment.extend(fragment![" "]);
        fragment.extend(standard_period(repeat)?);
    }

    Ok(fragment)
}

fn indefinite_frequency(
    period: Option<&Decimal>,
    period_max: Option<&Decimal>,
    period_unit: Option<UnitOfTime>,
) -> Result<Fragment, Error> {
    match (period, period_max) {
        (None, None) => Ok(Fragment::new()),
        (period, None) if is_one(period) => {
            let unit = period_unit.ok_or(Error::MissingUnitOfTime)?;

            Ok(fragment![reciprocal_unit_of_time_display(unit)])
        }
        _ => Err(Error::PeriodWithoutFrequency),
    }
}

fn standard_period(repeat: &TimingRepeat) -> Result<Fragment, Error> {
    let period = repeat.period.as_ref();
    let period_max = repeat.period_max.as_ref();

    if period_max.is_some() {
        Ok(fragment![
            "every ",
            numeric(period),
            " to ",
            numeric(period_max),
            " ",
            unit_of_time(repeat.period_unit, period_max)?
        ])
    } else if is_one(period) {
        let unit = repeat.period_unit.ok_or(Error::MissingUnitOfTime)?;

        Ok(fragment![
            indefinite_article(unit),
            " ",
            unit_of_time_display(unit)
        ])
    } else {
        Ok(fragment![
            "every ",
            numeric(period),
            " ",
            unit_of_time(repeat.period_unit, period)?
        ])
    }
}

pub fn duration(repeat: Option<&TimingRepeat>) -> Result<Fragment, Error> {
    let repeat = match repeat {
        Some(repeat) if repeat.duration.is_some() || repeat.duration_max.is_some() => repeat,
        _ => return Ok(Fragment::new()),
    };

    let duration = repeat.duration.as_ref();
    let duration_max = repeat.duration_max.as_ref();

    let mut fragment = fragment![
        "over ",
        numeric(duration),
        " ",
        unit_of_time(repeat.duration_unit, duration)?
    ];

    if duration_max.is_some() {
        fragment.extend(fragment![
            " (maximum ",
            numeric(duration_max),
            " ",
            unit_of_time(repeat.duration_unit, duration_max)?,
            ")"
        ]);
    }

    Ok(fragment)
}

pub fn count(repeat: Option<&TimingRepeat>) -> Fragment {
    let (count, count_max) = match repeat {
        Some(repeat) => (repeat.count.as_ref(), repeat.count_max.as_ref()),
        None => (None, None),
    };

    match (count, count_max) {
        (None, None) => Fragment::new(),
        (count, None) if is_one(count) => fragment!["take once"],
        (count, None) if is_two(count) => fragment!["take twice"],
        (count, None) => fragment!["take ", numeric(count), " times"],
        (count, Some(count_max)) => fragment![
            "take ",
            numeric(count),
            " to ",
            numeric(Some(count_max)),
            " times"
        ],
    }
}
