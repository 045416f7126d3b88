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

use chrono::{NaiveTime, Timelike};
use resources::{
    dosage::{DayOfWeek, EventTiming, UnitOfTime},
    misc::{Quantity, Range},
    primitives::{DateTime, Decimal},
};
use std::convert::TryFrom;

use super::{Error, Fragment, IntoToken};

pub fn unit_of_time_display(unit: UnitOfTime) -> &'static str {
    match unit {
        UnitOfTime::Second => "second",
        UnitOfTime::Minute => "minute",
        UnitOfTime::Hour => "hour",
        UnitOfTime::Day => "day",
        UnitOfTime::Week => "week",
        UnitOfTime::Month => "month",
        UnitOfTime::Year => "year",
    }
}

pub fn reciprocal_unit_of_time_display(unit: UnitOfTime) -> &'static str {
    match unit {
        UnitOfTime::Second => "every second",
        UnitOfTime::Minute => "every minute",
        UnitOfTime::Hour => "hourly",
        UnitOfTime::Day => "daily",
        UnitOfTime::Week => "weekly",
        UnitOfTime::Month => "monthly",
        UnitOfTime::Year => "annually",
    }
}

pub fn indefinite_article(unit: UnitOfTime) -> &'static str {
    match unit {
        UnitOfTime::Hour => "an",
        _ => "a",
    }
}

pub fn event_timing_display(event: EventTiming) -> &'static str {
    match event {
        EventTiming::Morning => "during the morning",
        EventTiming::EarlyMorning => "during the early morning",
        EventTiming::LateMorning => "during the late morning",
        EventTiming::Noon => "around 12:00pm",
        EventTiming::Afternoon => "during the afternoon",
        EventTiming::EarlyAfternoon => "during the early afternoon",
        EventTiming::LateAfternoon => "during the late afternoon",
        EventTiming::Evening => "during the evening",
        EventTiming::EarlyEvening => "during the early evening",
        EventTiming::LateEvening => "during the late evening",
        EventTiming::Night => "during the night",
        EventTiming::AfterSleep => "once asleep",
        EventTiming::BeforeSleep => "before sleep",
        EventTiming::UponWaking => "upon waking",
        EventTiming::AtMeal => "at a meal",
        EventTiming::AtBreakfast => "at breakfast",
        EventTiming::AtLunch => "at lunch",
        EventTiming::AtDinner => "at dinner",
        EventTiming::BeforeMeal => "before a meal",
        EventTiming::BeforeBreakfast => "before breakfast",
        EventTiming::BeforeLunch => "before lunch",
        EventTiming::BeforeDinner => "before dinner",
        EventTiming::AfterMeal => "after a meal",
        EventTiming::AfterBreakfast => "after breakfast",
        EventTiming::AfterLunch => "after lunch",
        EventTiming::AfterDinner => "after dinner",
    }
}

pub fn day_of_week_display(day: DayOfWeek) -> &'static str {
    match day {
        DayOfWeek::Mon => "Monday",
        DayOfWeek::Tue => "Tuesday",
        DayOfWeek::Wed => "Wednesday",
        DayOfWeek::Thu => "Thursday",
        DayOfWeek::Fri => "Friday",
        DayOfWeek::Sat => "Saturday",
        DayOfWeek::Sun => "Sunday",
    }
}

pub fn is_one(value: Option<&Decimal>) -> bool {
    value.map(Decimal::is_one).unwrap_or(false)
}

pub fn is_two(value: Option<&Decimal>) -> bool {
    value.map(Decimal::is_two).unwrap_or(false)
}

pub fn numeric(value: Option<&Decimal>) -> Option<String> {
    value.map(|v| v.as_str().to_owned())
}

pub fn quantity_value(quantity: Option<&Quantity>) -> Option<String> {
    numeric(quantity.and_then(|q| q.value.as_ref()))
}

pub fn quantity_unit(quantity: Option<&Quantity>, pluralise: bool) -> Option<String> {
    let quantity = quantity?;
    let unit = quantity.unit.as_deref().filter(|unit| !unit.is_empty())?;

    if pluralise {
        Some(pluralise_unit(unit, quantity.value.as_ref().map(Decimal::as_str)))
    } else {
        Some(unit.to_owned())
    }
}

/// Only units of time are pluralised; everything else is kept as written.
pub fn pluralise_unit(unit: &str, value: Option<&str>) -> String {
    const SINGULAR_TIME_UNITS: &[&str] =
        &["second", "minute", "hour", "day", "week", "month", "year"];

    match value {
        Some(value) if value != "1" && SINGULAR_TIME_UNITS.contains(&unit) => {
            format!("{}s", unit)
        }
        _ => unit.to_owned(),
    }
}

pub fn unit_of_time(unit: Option<UnitOfTime>, value: Option<&Decimal>) -> Result<String, Error> {
    let unit = unit.ok_or(Error::MissingUnitOfTime)?;

    Ok(pluralise_unit(
        unit_of_time_display(unit),
        value.map(Decimal::as_str),
    ))
}

pub fn range(range: &Range, pluralise: bool) -> Fragment {
    let low = range.low.as_ref();
    let high = range.high.as_ref();

    let low_unit = quantity_unit(low, pluralise);
    let high_unit = quantity_unit(high, pluralise);
    let low_value = quantity_value(low);
    let high_value = quantity_value(high);

    match (low, high) {
        (Some(_), None) => fragment!["at least ", low_value, " ", low_unit],
        (None, Some(_)) => fragment!["up to ", high_value, " ", high_unit],
        _ if low_unit != high_unit => fragment![
            low_value, " ", low_unit, " to ", high_value, " ", high_unit
        ],
        _ => fragment![low_value, " to ", high_value, " ", high_unit],
    }
}

/// Joins the items with ", " and a final " and ".
pub fn list_with_separators<I, T>(items: I) -> Fragment
where
    I: IntoIterator<Item = T>,
    T: IntoToken,
{
    let items = items.into_iter().collect::<Vec<_>>();
    let len = items.len();
    let mut fragment = Fragment::with_capacity(2 * len);

    for (index, item) in items.into_iter().enumerate() {
        fragment.push(item.into_token());

        if index + 2 < len {
            fragment.push(", ".into_token());
        } else if index + 1 < len {
            fragment.push(" and ".into_token());
        }
    }

    fragment
}

pub fn format_date(value: &str) -> Result<String, Error> {
    DateTime::try_from(value)
        .ok()
        .and_then(|date_time| date_time.to_utc().ok())
        .map(|date_time| date_time.format("%d/%m/%Y").to_string())
        .ok_or_else(|| Error::InvalidDateTime(value.to_owned()))
}

pub fn format_time(value: &str) -> Result<String, Error> {
    let valid_shape = value.len() >= 8
        && value.as_bytes()[2] == b':'
        && value.as_bytes()[5] == b':'
        && (value.len() == 8 || value.as_bytes()[8] == b'.');

    let time = NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .ok()
        .filter(|_| valid_shape)
        .ok_or_else(|| Error::InvalidTimeOfDay(value.to_owned()))?;

    if time.second() == 0 {
        Ok(time.format("%H:%M").to_string())
    } else {
        Ok(time.format("%H:%M:%S").to_string())
    }
}
