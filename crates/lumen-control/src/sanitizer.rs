// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Derives filesystem-safe names from ROM header metadata.
//!
//! The header lives in big-endian cartridge memory that the host stores as
//! 32-bit little-endian words, so byte `i` of the header is found at
//! [`byte_addr`]`(i)`.

use std::fmt;

/// Byte index correction for the host's word-swapped header layout.
#[cfg(target_endian = "little")]
pub const BYTE_ADDR_XOR: usize = 3;
/// Byte index correction for the host's word-swapped header layout.
#[cfg(target_endian = "big")]
pub const BYTE_ADDR_XOR: usize = 0;

/// Smallest output capacity accepted by [`derive`], one byte more than the title.
pub const MIN_NAME_CAPACITY: usize = 21;

/// Offset and width of the game title field.
const TITLE_OFFSET: usize = 32;
const TITLE_LEN: usize = 20;

/// Offset and width of the four-character game ID.
const GAME_ID_OFFSET: usize = 59;
const GAME_ID_LEN: usize = 4;

/// Maps a logical header byte index to its position in host memory.
pub const fn byte_addr(index: usize) -> usize {
    index ^ BYTE_ADDR_XOR
}

/// A non-empty identifier made only of ASCII alphanumerics, `_`, `-`, `.` and
/// spaces. Names taken from the title carry no trailing spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName(String);

impl SanitizedName {
    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the name is empty. Never true for a derived name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SanitizedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn filter_byte(byte: u8) -> char {
    match byte {
        b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'-' | b'.' => byte as char,
        _ => ' ',
    }
}

fn read_field(header: &[u8], offset: usize, len: usize) -> String {
    (offset..offset + len)
        .map(|i| filter_byte(header[byte_addr(i)]))
        .collect()
}

/// Derives a name from the ROM `header`.
///
/// Returns `None` when `capacity` is below [`MIN_NAME_CAPACITY`], when no
/// header is available or it is too short to hold the game ID, or when both
/// the title and the game ID filter down to nothing.
pub fn derive(header: Option<&[u8]>, capacity: usize) -> Option<SanitizedName> {
    if capacity < MIN_NAME_CAPACITY {
        return None;
    }
    let header = header?;
    let required = (TITLE_OFFSET..TITLE_OFFSET + TITLE_LEN)
        .chain(GAME_ID_OFFSET..GAME_ID_OFFSET + GAME_ID_LEN)
        .map(byte_addr)
        .max()
        .unwrap_or(0)
        + 1;
    if header.len() < required {
        log::debug!(
            "sanitizer: Header too short ({} < {} bytes)",
            header.len(),
            required
        );
        return None;
    }

    let title = read_field(header, TITLE_OFFSET, TITLE_LEN);
    let title = title.trim_end_matches(' ');
    if !title.is_empty() {
        return Some(SanitizedName(title.to_string()));
    }

    // Title is empty or entirely non-ASCII, fall back to the untrimmed game ID.
    let game_id = read_field(header, GAME_ID_OFFSET, GAME_ID_LEN);
    if game_id.bytes().all(|b| b == b' ') {
        None
    } else {
        Some(SanitizedName(game_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a 64-byte header in host (word-swapped) layout.
    fn header_with(title: &[u8], game_id: &[u8]) -> Vec<u8> {
        let mut logical = [0u8; 64];
        logical[TITLE_OFFSET..TITLE_OFFSET + title.len()].copy_from_slice(title);
        logical[GAME_ID_OFFSET..GAME_ID_OFFSET + game_id.len()].copy_from_slice(game_id);
        let mut host = vec![0u8; 64];
        for (i, byte) in logical.iter().enumerate() {
            host[byte_addr(i)] = *byte;
        }
        host
    }

    #[test]
    fn test_byte_addr_is_an_involution() {
        for i in 0..64 {
            assert_eq!(byte_addr(byte_addr(i)), i);
        }
    }

    #[test]
    fn test_title_is_trimmed() {
        let header = header_with(b"SUPER MARIO 64      ", b"NSME");
        let name = derive(Some(&header), 32).unwrap();
        assert_eq!(name.as_str(), "SUPER MARIO 64");
        assert_eq!(name.len(), 14);
    }

    #[test]
    fn test_unsafe_bytes_become_spaces() {
        let header = header_with(b"ZELDA/OOT:v1.0*", b"CZLE");
        let name = derive(Some(&header), 32).unwrap();
        assert_eq!(name.as_str(), "ZELDA OOT v1.0");
    }

    #[test]
    fn test_non_printable_title_falls_back_to_game_id() {
        let header = header_with(&[0x83; 20], b"NABE");
        let name = derive(Some(&header), 32).unwrap();
        assert_eq!(name.as_str(), "NABE");
    }

    #[test]
    fn test_game_id_fallback_keeps_spaces() {
        let header = header_with(&[0u8; 20], b"NM\0\0");
        let name = derive(Some(&header), 32).unwrap();
        assert_eq!(name.as_str(), "NM  ");
        assert_eq!(name.len(), 4);
    }

    #[test]
    fn test_empty_title_and_id_yields_none() {
        let header = header_with(&[0u8; 20], &[0xff; 4]);
        assert!(derive(Some(&header), 32).is_none());
    }

    #[test]
    fn test_small_buffer_is_rejected() {
        let header = header_with(b"GAME", b"NGME");
        assert!(derive(Some(&header), MIN_NAME_CAPACITY - 1).is_none());
        assert!(derive(Some(&header), MIN_NAME_CAPACITY).is_some());
    }

    #[test]
    fn test_missing_header_yields_none() {
        assert!(derive(None, 32).is_none());
    }

    #[test]
    fn test_short_header_yields_none() {
        let header = header_with(b"GAME", b"NGME");
        assert!(derive(Some(&header[..40]), 32).is_none());
    }
}
