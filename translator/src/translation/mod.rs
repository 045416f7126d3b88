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

mod cancellation;
mod claim;
mod demographics;
mod dispense;
mod error;
mod line_item;
mod organization;
mod practitioner;
mod prescription;
mod release;
mod task;

pub mod dates;
pub mod dosage;
pub mod resolve;

pub use cancellation::convert_cancellation;
pub use claim::convert_dispense_claim;
pub use demographics::{
    convert_address, convert_gender, convert_name, convert_patient, convert_telecom,
};
pub use dispense::convert_dispense_notification;
pub use error::Error;
pub use line_item::{
    dosage_instructions, parse_additional_instructions, AdditionalInstructions,
};
pub use prescription::convert_parent_prescription;
pub use release::convert_release_request;
pub use task::{convert_dispense_proposal_return, convert_withdraw};
