//! Digit normalization and identifier extraction for transcribed speech.
//!
//! Callers read identifiers aloud, so a transcript may contain ASCII digits,
//! full-width digits, or digits spelled out one by one in kana
//! (`ぜろ いち いち さん ご`). Spelled-out digits are only recognized in runs
//! of two or more separated words, so that particles like `に` or prefixes
//! like `ご` in ordinary sentences stay untouched. Those one-kana words only
//! extend a run when another digit follows them or when they complete an
//! identifier.

use orderdesk_types::ID_DIGITS;
use serde::Serialize;

/// Digit runs heard in one utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeardIdentifiers {
    /// Runs of exactly five digits, in order of appearance.
    pub candidates: Vec<String>,
    /// Runs of any other length. These should be confirmed with the caller.
    pub misheard: Vec<String>,
}

impl HeardIdentifiers {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.misheard.is_empty()
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '、' | '，' | ',' | '・' | '。' | '-')
}

/// Digit readings that double as particles or prefixes.
fn is_ambiguous(word: &str) -> bool {
    matches!(word, "に" | "し" | "く" | "ご")
}

fn next_word<'a>(pieces: &[(&'a str, bool)], from: usize) -> Option<&'a str> {
    pieces[from..]
        .iter()
        .find(|(_, is_sep)| !is_sep)
        .map(|(word, _)| *word)
}

fn spoken_digit(word: &str) -> Option<char> {
    let digit = match word {
        "ぜろ" | "ゼロ" | "れい" | "レイ" | "まる" | "マル" | "0" => '0',
        "いち" | "イチ" | "1" => '1',
        "に" | "ニ" | "2" => '2',
        "さん" | "サン" | "3" => '3',
        "よん" | "ヨン" | "し" | "シ" | "4" => '4',
        "ご" | "ゴ" | "5" => '5',
        "ろく" | "ロク" | "6" => '6',
        "なな" | "ナナ" | "しち" | "シチ" | "7" => '7',
        "はち" | "ハチ" | "8" => '8',
        "きゅう" | "キュウ" | "く" | "ク" | "9" => '9',
        _ => return None,
    };
    Some(digit)
}

fn fold_full_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        _ => c,
    }
}

/// Rewrites the text with full-width digits folded to ASCII and runs of
/// spelled-out digits collapsed into digit strings.
pub fn normalize_digits(text: &str) -> String {
    let folded: String = text.chars().map(fold_full_width).collect();

    // Split into alternating word / separator pieces.
    let mut pieces: Vec<(&str, bool)> = Vec::new();
    let mut start = 0;
    let mut in_sep = None;
    for (i, c) in folded.char_indices() {
        let sep = is_separator(c);
        match in_sep {
            Some(prev) if prev != sep => {
                pieces.push((&folded[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_sep = Some(sep);
    }
    if let Some(sep) = in_sep {
        pieces.push((&folded[start..], sep));
    }

    let mut out = String::with_capacity(folded.len());
    let mut i = 0;
    while i < pieces.len() {
        let (piece, sep) = pieces[i];
        if sep || spoken_digit(piece).is_none() {
            out.push_str(piece);
            i += 1;
            continue;
        }

        // Collect word, sep, word, ... while every word is a single digit.
        let mut digits = String::new();
        let mut j = i;
        let mut last_word = i;
        while j < pieces.len() {
            let (word, is_sep) = pieces[j];
            if is_sep {
                j += 1;
                continue;
            }
            match spoken_digit(word) {
                Some(_)
                    if is_ambiguous(word)
                        && digits.len() + 1 != ID_DIGITS
                        && next_word(&pieces, j + 1)
                            .and_then(spoken_digit)
                            .is_none() =>
                {
                    break
                }
                Some(d) => {
                    digits.push(d);
                    last_word = j;
                    j += 1;
                }
                None => break,
            }
        }

        if digits.len() >= 2 {
            out.push_str(&digits);
            i = last_word + 1;
        } else {
            out.push_str(piece);
            i += 1;
        }
    }
    out
}

fn flush_run(run: &mut String, heard: &mut HeardIdentifiers) {
    if run.is_empty() {
        return;
    }
    let value = std::mem::take(run);
    if value.len() == ID_DIGITS {
        heard.candidates.push(value);
    } else {
        heard.misheard.push(value);
    }
}

/// Finds every maximal digit run in the utterance after normalization.
pub fn extract_identifiers(text: &str) -> HeardIdentifiers {
    let normalized = normalize_digits(text);
    let mut heard = HeardIdentifiers::default();
    let mut run = String::new();

    for c in normalized.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else {
            flush_run(&mut run, &mut heard);
        }
    }
    flush_run(&mut run, &mut heard);
    heard
}
