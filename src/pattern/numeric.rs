//! Digit-run normalization for the numeric tier.
//!
//! Every maximal run of ASCII digits collapses to a single placeholder
//! byte, so "OS 6_0" and "OS 10_3" both become "OS \0_\0". The original
//! offsets and numbers are kept so matches can be mapped back onto the
//! input and scored by how far their numbers drift.
//!
//! Literal `\0` and [`ESCAPE`] characters are written as two-byte escapes,
//! so the placeholder only ever stands for a digit run.

pub(crate) const PLACEHOLDER: char = '\0';
pub(crate) const ESCAPE: char = '\u{1}';

fn escaped(ch: char) -> Option<&'static str> {
    match ch {
        PLACEHOLDER => Some("\u{1}0"),
        ESCAPE => Some("\u{1}1"),
        _ => None,
    }
}

/// A digit-normalized string with a map back to the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NormalizedText {
    pub text: String,
    /// Original start offset of each normalized byte
    starts: Vec<usize>,
    /// Original end offset of each normalized byte
    ends: Vec<usize>,
    /// Parsed number for each placeholder byte
    numbers: Vec<Option<u64>>,
}

impl NormalizedText {
    pub(crate) fn new(input: &str) -> Self {
        let bytes = input.as_bytes();
        let mut text = String::with_capacity(input.len());
        let mut starts = Vec::with_capacity(input.len());
        let mut ends = Vec::with_capacity(input.len());
        let mut numbers = Vec::with_capacity(input.len());

        let mut i = 0;
        while i < bytes.len() {
            if bytes[i].is_ascii_digit() {
                let run_start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                text.push(PLACEHOLDER);
                starts.push(run_start);
                ends.push(i);
                numbers.push(Some(parse_run(&input[run_start..i])));
            } else {
                // Copy one whole character so `text` stays valid UTF-8.
                let Some(ch) = input[i..].chars().next() else {
                    break;
                };
                let ch_len = ch.len_utf8();
                if let Some(escape) = escaped(ch) {
                    text.push_str(escape);
                    for _ in 0..escape.len() {
                        starts.push(i);
                        ends.push(i + 1);
                        numbers.push(None);
                    }
                } else {
                    text.push_str(&input[i..i + ch_len]);
                    for offset in i..i + ch_len {
                        starts.push(offset);
                        ends.push(offset + 1);
                        numbers.push(None);
                    }
                }
                i += ch_len;
            }
        }

        Self {
            text,
            starts,
            ends,
            numbers,
        }
    }

    /// Original byte span covered by normalized bytes `start..end`.
    pub(crate) fn original_span(&self, start: usize, end: usize) -> (usize, usize) {
        (self.starts[start], self.ends[end - 1])
    }

    /// Numbers found in normalized bytes `start..end`, in order.
    pub(crate) fn numbers_in(&self, start: usize, end: usize) -> impl Iterator<Item = u64> + '_ {
        self.numbers[start..end].iter().filter_map(|n| *n)
    }
}

/// Normalized form and digit runs of a fragment.
pub(crate) fn normalize_fragment(fragment: &str) -> (String, Vec<u64>) {
    let normalized = NormalizedText::new(fragment);
    let numbers = normalized.numbers.iter().filter_map(|n| *n).collect();
    (normalized.text, numbers)
}

/// Summed absolute difference between two equally long number lists.
pub(crate) fn numeric_delta(expected: &[u64], found: impl Iterator<Item = u64>) -> u64 {
    expected
        .iter()
        .zip(found)
        .fold(0u64, |acc, (a, b)| acc.saturating_add(a.abs_diff(b)))
}

fn parse_run(digits: &str) -> u64 {
    digits.parse::<u64>().unwrap_or(u64::MAX)
}
