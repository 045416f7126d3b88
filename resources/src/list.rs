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

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct List {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub entry: Vec<ListEntry>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ListEntry {
    pub item: ListItem,
}

/// Entry of a list. Repeat medication lists carry display text only.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ListItem {
    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub display: Option<String>,
}

impl ListItem {
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_may_be_display_only() {
        let list: List = serde_json::from_str(
            r#"{ "resourceType": "List", "entry": [ { "item": { "display": "Salbutamol" } } ] }"#,
        )
        .unwrap();

        assert_eq!(Some("Salbutamol"), list.entry[0].item.display());
    }
}
