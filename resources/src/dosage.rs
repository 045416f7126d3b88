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

use serde::Deserialize;

use crate::{
    misc::{CodeableConcept, Period, Quantity, Range, Ratio},
    primitives::Decimal,
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dosage {
    #[serde(default)]
    pub sequence: Option<Decimal>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub additional_instruction: Vec<CodeableConcept>,

    #[serde(default)]
    pub patient_instruction: Option<String>,

    #[serde(default)]
    pub timing: Option<Timing>,

    #[serde(default)]
    pub as_needed_boolean: Option<bool>,

    #[serde(default)]
    pub as_needed_codeable_concept: Option<CodeableConcept>,

    #[serde(default)]
    pub site: Option<CodeableConcept>,

    #[serde(default)]
    pub route: Option<CodeableConcept>,

    #[serde(default)]
    pub method: Option<CodeableConcept>,

    #[serde(default)]
    pub dose_and_rate: Vec<DoseAndRate>,

    #[serde(default)]
    pub max_dose_per_period: Option<Ratio>,

    #[serde(default)]
    pub max_dose_per_administration: Option<Quantity>,

    #[serde(default)]
    pub max_dose_per_lifetime: Option<Quantity>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoseAndRate {
    #[serde(default, rename = "type")]
    pub type_: Option<CodeableConcept>,

    #[serde(default)]
    pub dose_range: Option<Range>,

    #[serde(default)]
    pub dose_quantity: Option<Quantity>,

    #[serde(default)]
    pub rate_ratio: Option<Ratio>,

    #[serde(default)]
    pub rate_range: Option<Range>,

    #[serde(default)]
    pub rate_quantity: Option<Quantity>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    #[serde(default)]
    pub event: Vec<String>,

    #[serde(default)]
    pub repeat: Option<TimingRepeat>,

    #[serde(default)]
    pub code: Option<CodeableConcept>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRepeat {
    #[serde(default)]
    pub bounds_duration: Option<Quantity>,

    #[serde(default)]
    pub bounds_range: Option<Range>,

    #[serde(default)]
    pub bounds_period: Option<Period>,

    #[serde(default)]
    pub count: Option<Decimal>,

    #[serde(default)]
    pub count_max: Option<Decimal>,

    #[serde(default)]
    pub duration: Option<Decimal>,

    #[serde(default)]
    pub duration_max: Option<Decimal>,

    #[serde(default)]
    pub duration_unit: Option<UnitOfTime>,

    #[serde(default)]
    pub frequency: Option<Decimal>,

    #[serde(default)]
    pub frequency_max: Option<Decimal>,

    #[serde(default)]
    pub period: Option<Decimal>,

    #[serde(default)]
    pub period_max: Option<Decimal>,

    #[serde(default)]
    pub period_unit: Option<UnitOfTime>,

    #[serde(default)]
    pub day_of_week: Vec<DayOfWeek>,

    #[serde(default)]
    pub time_of_day: Vec<String>,

    #[serde(default)]
    pub when: Vec<EventTiming>,

    #[serde(default)]
    pub offset: Option<Decimal>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
pub enum UnitOfTime {
    #[serde(rename = "s")]
    Second,

    #[serde(rename = "min")]
    Minute,

    #[serde(rename = "h")]
    Hour,

    #[serde(rename = "d")]
    Day,

    #[serde(rename = "wk")]
    Week,

    #[serde(rename = "mo")]
    Month,

    #[serde(rename = "a")]
    Year,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
pub enum EventTiming {
    #[serde(rename = "MORN")]
    Morning,

    #[serde(rename = "MORN.early")]
    EarlyMorning,

    #[serde(rename = "MORN.late")]
    LateMorning,

    #[serde(rename = "NOON")]
    Noon,

    #[serde(rename = "AFT")]
    Afternoon,

    #[serde(rename = "AFT.early")]
    EarlyAfternoon,

    #[serde(rename = "AFT.late")]
    LateAfternoon,

    #[serde(rename = "EVE")]
    Evening,

    #[serde(rename = "EVE.early")]
    EarlyEvening,

    #[serde(rename = "EVE.late")]
    LateEvening,

    #[serde(rename = "NIGHT")]
    Night,

    #[serde(rename = "PHS")]
    AfterSleep,

    #[serde(rename = "HS")]
    BeforeSleep,

    #[serde(rename = "WAKE")]
    UponWaking,

    #[serde(rename = "C")]
    AtMeal,

    #[serde(rename = "CM")]
    AtBreakfast,

    #[serde(rename = "CD")]
    AtLunch,

    #[serde(rename = "CV")]
    AtDinner,

    #[serde(rename = "AC")]
    BeforeMeal,

    #[serde(rename = "ACM")]
    BeforeBreakfast,

    #[serde(rename = "ACD")]
    BeforeLunch,

    #[serde(rename = "ACV")]
    BeforeDinner,

    #[serde(rename = "PC")]
    AfterMeal,

    #[serde(rename = "PCM")]
    AfterBreakfast,

    #[serde(rename = "PCD")]
    AfterLunch,

    #[serde(rename = "PCV")]
    AfterDinner,
}
