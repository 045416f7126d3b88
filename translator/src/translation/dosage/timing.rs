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

use resources::{dosage::TimingRepeat, misc::Period};

use super::{
    units::{
        day_of_week_display, event_timing_display, format_date, format_time,
        list_with_separators, pluralise_unit, quantity_unit, quantity_value, range,
    },
    Error, Fragment,
};

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * MINUTES_PER_HOUR;

pub fn offset_and_when(repeat: Option<&TimingRepeat>) -> Fragment {
    let repeat = match repeat {
        Some(repeat) if !repeat.when.is_empty() => repeat,
        _ => return Fragment::new(),
    };

    let mut fragment = Fragment::new();

    if let Some(offset) = repeat.offset.as_ref() {
        match offset.as_integer() {
            Some(minutes) if minutes != 0 => fragment.extend(offset_fragment(minutes)),
            Some(_) => (),
            None => fragment.push(None),
        }
    }

    fragment.extend(list_with_separators(
        repeat.when.iter().map(|when| event_timing_display(*when)),
    ));

    fragment
}

fn offset_fragment(minutes: i64) -> Fragment {
    let (value, unit) = if minutes % MINUTES_PER_DAY == 0 {
        (minutes / MINUTES_PER_DAY, "day")
    } else if minutes % MINUTES_PER_HOUR == 0 {
        (minutes / MINUTES_PER_HOUR, "hour")
    } else {
        (minutes, "minute")
    };

    let value = value.to_string();
    let unit = pluralise_unit(unit, Some(&value));

    fragment![value, " ", unit, " "]
}

pub fn day_of_week_and_time_of_day(repeat: Option<&TimingRepeat>) -> Result<Fragment, Error> {
    let repeat = match repeat {
        Some(repeat) => repeat,
        None => return Ok(Fragment::new()),
    };

    let mut fragment = Fragment::new();

    if !repeat.day_of_week.is_empty() {
        fragment.extend(fragment!["on "]);
        fragment.extend(list_with_separators(
            repeat.day_of_week.iter().map(|day| day_of_week_display(*day)),
        ));
    }

    if !repeat.time_of_day.is_empty() {
        if !fragment.is_empty() {
            fragment.extend(fragment![" "]);
        }

        let times = repeat
            .time_of_day
            .iter()
            .map(|time| format_time(time))
            .collect::<Result<Vec<_>, _>>()?;

        fragment.extend(fragment!["at "]);
        fragment.extend(list_with_separators(times));
    }

    Ok(fragment)
}

pub fn bounds(repeat: Option<&TimingRepeat>) -> Result<Fragment, Error> {
    let repeat = match repeat {
        Some(repeat) => repeat,
        None => return Ok(Fragment::new()),
    };

    if let Some(duration) = repeat.bounds_duration.as_ref() {
        return Ok(fragment![
            "for ",
            quantity_value(Some(duration)),
            " ",
            quantity_unit(Some(duration), true)
        ]);
    }

    if let Some(bounds_range) = repeat.bounds_range.as_ref() {
        let mut fragment = fragment!["for "];
        fragment.extend(range(bounds_range, true));

        return Ok(fragment);
    }

    match repeat.bounds_period.as_ref() {
        Some(period) => bounds_period(period),
        None => Ok(Fragment::new()),
    }
}

fn bounds_period(period: &Period) -> Result<Fragment, Error> {
    let start = period.start.as_deref().map(format_date).transpose()?;
    let end = period.end.as_deref().map(format_date).transpose()?;

    Ok(match (start, end) {
        (Some(start), Some(end)) => fragment!["from ", start, " to ", end],
        (Some(start), None) => fragment!["from ", start],
        (None, Some(end)) => fragment!["until ", end],
        (None, None) => Fragment::new(),
    })
}

pub fn event(events: &[String]) -> Result<Fragment, Error> {
    if events.is_empty() {
        return Ok(Fragment::new());
    }

    let dates = events
        .iter()
        .map(|event| format_date(event))
        .collect::<Result<Vec<_>, _>>()?;

    let mut fragment = fragment!["on "];
    fragment.extend(list_with_separators(dates));

    Ok(fragment)
}
