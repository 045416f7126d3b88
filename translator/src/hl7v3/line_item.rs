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

use serde::Serialize;

use super::{
    codes::{Code, Identifier},
    core::{Annotation, Interval, Null, NumericValue, QuantityInAlternativeUnits, Relationship},
};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItem {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub id: Identifier,

    pub code: Code,

    #[serde(rename = "effectiveTime")]
    pub effective_time: Null,

    #[serde(rename = "repeatNumber")]
    pub repeat_number: Option<Interval<NumericValue>>,

    pub product: Relationship<ManufacturedProduct>,

    pub component: Relationship<LineItemQuantity>,

    #[serde(rename = "pertinentInformation4")]
    pub pertinent_information4: Option<Relationship<Annotation<Code>>>,

    #[serde(rename = "pertinentInformation1")]
    pub pertinent_information1: Option<Relationship<Annotation<String>>>,

    #[serde(rename = "pertinentInformation3")]
    pub pertinent_information3: Vec<Relationship<Annotation<Code>>>,

    #[serde(rename = "pertinentInformation2")]
    pub pertinent_information2: Relationship<Annotation<String>>,
}

impl LineItem {
    pub fn new(
        id: Identifier,
        medication: Code,
        quantity: QuantityInAlternativeUnits,
        dosage_instructions: String,
    ) -> Self {
        Self {
            class_code: "SBADM",
            mood_code: "RQO",
            id,
            code: administration_code(),
            effective_time: Null::NOT_APPLICABLE,
            repeat_number: None,
            product: Relationship::new(
                "PRD",
                "manufacturedProduct",
                ManufacturedProduct::new("manufacturedRequestedMaterial", medication),
            )
            .context_control("OP"),
            component: Relationship::new(
                "COMP",
                "lineItemQuantity",
                LineItemQuantity::new(quantity),
            )
            .seperatable(false),
            pertinent_information4: None,
            pertinent_information1: None,
            pertinent_information3: Vec::new(),
            pertinent_information2: Relationship::pertinent(
                "pertinentDosageInstructions",
                false,
                Annotation::new("DI", dosage_instructions),
            ),
        }
    }

    pub fn with_item_status(mut self, status: Code) -> Self {
        self.pertinent_information4 = Some(Relationship::pertinent(
            "pertinentItemStatus",
            false,
            Annotation::new("IS", status),
        ));

        self
    }

    pub fn with_additional_instructions(mut self, instructions: String) -> Self {
        self.pertinent_information1 = Some(Relationship::pertinent(
            "pertinentAdditionalInstructions",
            false,
            Annotation::new("AI", instructions),
        ));

        self
    }

    pub fn with_endorsement(mut self, endorsement: Code) -> Self {
        self.pertinent_information3.push(Relationship::pertinent(
            "pertinentPrescriberEndorsement",
            false,
            Annotation::new("PE", endorsement),
        ));

        self
    }

    pub fn dosage_instructions(&self) -> Option<&str> {
        self.pertinent_information2.value().value.as_deref()
    }

    pub fn additional_instructions(&self) -> Option<&str> {
        self.pertinent_information1
            .as_ref()
            .and_then(|info| info.value().value.as_deref())
    }

    pub fn medication(&self) -> &Code {
        &self.product.value().material.code
    }

    pub fn quantity(&self) -> &QuantityInAlternativeUnits {
        &self.component.value().quantity
    }
}

/// SNOMED code of the administration act shared by prescriptions and their
/// line items.
pub fn administration_code() -> Code {
    Code::snomed("225426007").with_display("Administration of therapeutic substance (procedure)")
}

/// SNOMED code of a supply act.
pub fn dispensing_code() -> Code {
    Code::snomed("373784005").with_display("Dispensing medication (procedure)")
}

/// Manufactured product role wrapping a requested or supplied material. The
/// material element name depends on the message.
#[derive(Clone, Debug, PartialEq)]
pub struct ManufacturedProduct {
    pub material_name: &'static str,
    pub material: ManufacturedMaterial,
}

impl ManufacturedProduct {
    pub fn new(material_name: &'static str, code: Code) -> Self {
        Self {
            material_name,
            material: ManufacturedMaterial {
                class_code: "MMAT",
                determiner_code: "KIND",
                code,
            },
        }
    }
}

impl Serialize for ManufacturedProduct {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut s = serializer.serialize_struct("ManufacturedProduct", 2)?;
        s.serialize_field("attrib=classCode", "MANU")?;
        s.serialize_field(self.material_name, &self.material)?;
        s.end()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManufacturedMaterial {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=determinerCode")]
    pub determiner_code: &'static str,

    pub code: Code,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineItemQuantity {
    #[serde(rename = "attrib=classCode")]
    pub class_code: &'static str,

    #[serde(rename = "attrib=moodCode")]
    pub mood_code: &'static str,

    pub code: Code,

    pub quantity: QuantityInAlternativeUnits,
}

impl LineItemQuantity {
    pub fn new(quantity: QuantityInAlternativeUnits) -> Self {
        Self {
            class_code: "SPLY",
            mood_code: "RQO",
            code: dispensing_code(),
            quantity,
        }
    }
}
