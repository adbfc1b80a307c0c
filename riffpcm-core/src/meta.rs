// RiffPcm
// Copyright (c) 2024-2025 The Project RiffPcm Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `meta` module defines basic metadata elements.
//!
//! Metadata never influences decoding, it is carried alongside the stream for the caller.

use std::fmt;

/// A `Tag` encapsulates a key-value pair of metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// The raw key, e.g. `INAM` for a RIFF INFO title.
    pub key: String,
    /// The text value.
    pub value: String,
}

impl Tag {
    /// Create a new `Tag`.
    pub fn new(key: &str, value: &str) -> Tag {
        Tag { key: key.to_string(), value: value.to_string() }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ key={}, value={} }}", self.key, self.value)
    }
}

/// `Metadata` is an ordered collection of tags read from a stream.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    tags: Vec<Tag>,
}

impl Metadata {
    /// Add a tag.
    pub fn add_tag(&mut self, tag: Tag) -> &mut Self {
        self.tags.push(tag);
        self
    }

    /// Gets all tags in the order they were read.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Gets the value of the first tag with the given key, ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.iter().find(|tag| tag.key.eq_ignore_ascii_case(key)).map(|tag| tag.value.as_str())
    }

    /// Returns true if no tags were read.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
