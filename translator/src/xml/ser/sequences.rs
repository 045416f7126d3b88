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

use std::io::Write;

use quick_xml::{events::BytesStart, DeError as Error};
use serde::{ser::SerializeSeq as SerSerializeSeq, Serialize};

use super::Serializer;

/// Writes every item of a sequence as a repetition of the field element the
/// sequence was assigned to. Empty sequences drop the element entirely.
pub struct SerializeSeq<'a, W: Write> {
    serializer: &'a mut Serializer<W>,
    element_name: Vec<u8>,
    tag_id: usize,
    items: usize,
}

impl<'a, W: Write> SerializeSeq<'a, W> {
    pub fn new(serializer: &'a mut Serializer<W>, element_name: Vec<u8>) -> Self {
        let tag_id = serializer.current_tag_id();

        Self {
            serializer,
            element_name,
            tag_id,
            items: 0,
        }
    }

    fn repeat_element(&mut self) -> Result<(), Error> {
        self.serializer.close_tag(self.tag_id)?;

        let start = BytesStart::owned_name(self.element_name.clone());
        self.serializer.open_tag(start, false);

        Ok(())
    }
}

impl<'a, W: Write> SerSerializeSeq for SerializeSeq<'a, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, item: &T) -> Result<(), Error> {
        if self.items > 0 {
            self.repeat_element()?;
        }
        self.items += 1;

        item.serialize(&mut *self.serializer)
    }

    fn end(self) -> Result<(), Error> {
        match self.items {
            0 => self.serializer.drop_tag(),
            _ => Ok(()),
        }
    }
}
