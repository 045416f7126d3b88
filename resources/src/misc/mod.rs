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

mod address;
mod coding;
mod contact_point;
mod extension;
mod identifier;
mod name;
mod quantity;
mod reference;

pub use address::Address;
pub use coding::{CodeableConcept, Coding};
pub use contact_point::ContactPoint;
pub use extension::{Extension, ExtensionValue};
pub use identifier::Identifier;
pub use name::HumanName;
pub use quantity::{Period, Quantity, Range, Ratio};
pub use reference::Reference;
