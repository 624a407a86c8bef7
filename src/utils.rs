// SPDX-License-Identifier: MIT OR Apache-2.0

//! Utility functions for ragpipe

use std::borrow::Cow;

/// Number of characters (not bytes) in `input`.
pub fn char_len(input: &str) -> usize {
    input.chars().count()
}

/// Truncates `input` to at most `max_chars` characters.
pub fn truncate_to_chars(input: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    let mut count = 0;
    for (idx, _) in input.char_indices() {
        if count == max_chars {
            return Cow::Owned(input[..idx].to_string());
        }
        count += 1;
    }

    Cow::Borrowed(input)
}

/// Splits `input` at `max_chars` characters, returning the head and the rest.
pub fn split_at_chars(input: &str, max_chars: usize) -> (&str, &str) {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => input.split_at(idx),
        None => (input, ""),
    }
}
