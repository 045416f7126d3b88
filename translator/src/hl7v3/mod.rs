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

pub mod agent;
pub mod cancellation;
pub mod claim;
pub mod codes;
pub mod core;
pub mod dispense;
pub mod envelope;
pub mod line_item;
pub mod patient;
pub mod prescription;
pub mod release;
pub mod task;

pub use self::codes::{Code, Identifier};
pub use self::core::{Null, Relationship, Timestamp};
pub use envelope::{Interaction, Payload, SendMessagePayload};
