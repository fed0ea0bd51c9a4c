// Copyright 2025 Chris Custine
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

//! Natural ordering for stand names.
//!
//! Stand designators mix digits and letters ("2", "2A", "10B", "MAINT").
//! Plain lexicographic order puts "10" before "2"; controllers expect the
//! menu to read "2, 2A, 2B, 3, 10, 10A". The comparator splits each name
//! into a numeric prefix, the letter suffix right after it, and the
//! remainder, and orders on those parts in turn.

use std::cmp::Ordering;

/// Compare two stand names in natural display order.
///
/// Numbered names sort before unnumbered ones and order by numeric value,
/// then by the uppercased letter suffix directly after the digits (empty
/// suffix first, so "2" precedes "2A"), then by the uppercased remainder.
/// The raw trimmed string is the final tie-break, which makes this a strict
/// total order, stable across runs.
#[must_use]
pub fn compare_stand_names(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b))
}

/// Sort stand names in place in natural display order.
pub fn sort_stand_names(names: &mut [String]) {
    names.sort_by(|a, b| compare_stand_names(a, b));
}

// Field order is the comparison order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StandKey {
    unnumbered: bool,
    number: u64,
    suffix: String,
    rest: String,
    raw: String,
}

fn sort_key(name: &str) -> StandKey {
    let trimmed = name.trim();

    let digit_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, after) = trimmed.split_at(digit_end);

    // Absurdly long numeric prefixes clamp instead of wrapping.
    let mut number: u64 = 0;
    for digit in digits.bytes() {
        number = number
            .saturating_mul(10)
            .saturating_add(u64::from(digit - b'0'));
    }

    let suffix_end = after
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(after.len());
    let (suffix, rest) = after.split_at(suffix_end);

    StandKey {
        unnumbered: digits.is_empty(),
        number,
        suffix: suffix.to_ascii_uppercase(),
        rest: rest.to_ascii_uppercase(),
        raw: trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_value_beats_lexicographic() {
        assert_eq!(compare_stand_names("2", "10"), Ordering::Less);
        assert_eq!(compare_stand_names("9", "10"), Ordering::Less);
        assert_eq!(compare_stand_names("10", "11"), Ordering::Less);
    }

    #[test]
    fn test_bare_number_before_suffixed() {
        assert_eq!(compare_stand_names("2", "2A"), Ordering::Less);
        assert_eq!(compare_stand_names("2A", "2B"), Ordering::Less);
        assert_eq!(compare_stand_names("2B", "3"), Ordering::Less);
    }

    #[test]
    fn test_unnumbered_names_sort_last() {
        assert_eq!(compare_stand_names("2", "APRON"), Ordering::Less);
        assert_eq!(compare_stand_names("MAINT", "10"), Ordering::Greater);
        assert_eq!(compare_stand_names("A1", "1A"), Ordering::Greater);
    }

    #[test]
    fn test_unnumbered_names_order_alphabetically() {
        assert_eq!(compare_stand_names("APRON", "MAINT"), Ordering::Less);
        assert_eq!(compare_stand_names("A1", "A2"), Ordering::Less);
    }

    #[test]
    fn test_suffix_compares_case_insensitively_with_raw_tie_break() {
        // Keys are equal up to the raw string, so the order is still strict.
        assert_eq!(compare_stand_names("2a", "2A"), Ordering::Greater);
        assert_eq!(compare_stand_names("2A", "2A"), Ordering::Equal);
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(compare_stand_names(" 2 ", "2"), Ordering::Equal);
    }

    #[test]
    fn test_huge_numeric_prefix_clamps() {
        assert_eq!(
            compare_stand_names("99999999999999999999999", "1"),
            Ordering::Greater
        );
    }

    #[test]
    fn test_full_sort_order() {
        let mut names: Vec<String> = ["10A", "2B", "MAINT", "3", "2", "10", "2A", "APRON"]
            .iter()
            .map(ToString::to_string)
            .collect();
        sort_stand_names(&mut names);
        assert_eq!(
            names,
            vec!["2", "2A", "2B", "3", "10", "10A", "APRON", "MAINT"]
        );
    }
}
