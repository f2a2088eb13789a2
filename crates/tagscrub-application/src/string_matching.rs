// SPDX-License-Identifier: GPL-3.0-or-later

//! Fuzzy comparison of noisy tag strings against catalog names.

use lazy_static::lazy_static;
use regex::Regex;
use tagscrub_config::MatchingConfig;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TRACK_JUNK_REGEX: Regex = Regex::new(
        r"(?i)\([^()]*(explicit|remaster|edit|live|alternate|version|mix|feat|\bft\b)[^()]*\)"
    )
    .expect("track junk regex is valid");
    static ref EMPTY_PARENS_REGEX: Regex = Regex::new(r"\(\s*\)").expect("empty parens regex is valid");
    static ref PARENTHETICAL_REGEX: Regex = Regex::new(r"\([^()]*\)").expect("parenthetical regex is valid");
    static ref ARTICLE_REGEX: Regex = Regex::new(r"\bthe\b").expect("article regex is valid");
    static ref LIVE_DATE_REGEX: Regex =
        Regex::new(r"\d{4}-\d{2}-\d{2}|\d{2}-\d{2}-\d{2}").expect("live date regex is valid");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Track,
    Artist,
}

/// Thresholds shared by track and artist matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchThresholds {
    /// A match needs a distance strictly below this.
    pub max_distance: usize,
    /// One edit is tolerated per this many characters of the candidate.
    pub length_divisor: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            max_distance: 5,
            length_divisor: 5,
        }
    }
}

impl From<&MatchingConfig> for MatchThresholds {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            max_distance: config.max_edit_distance,
            length_divisor: config.length_divisor.max(1),
        }
    }
}

impl MatchThresholds {
    fn accepts(&self, distance: usize, candidate_len: usize) -> bool {
        distance < self.max_distance && distance <= candidate_len / self.length_divisor.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumKind {
    Normal,
    Live,
    Hits,
}

impl AlbumKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Live => "live",
            Self::Hits => "hits",
        }
    }
}

/// Canonical comparison form of a tag string.
///
/// Folds compatibility characters and drops combining marks, lower-cases, and
/// removes whitespace. Track names also lose junk parentheticals such as
/// "(Remastered)"; artist names lose every parenthetical and the word "the".
/// The result is a fixed point: normalizing it again returns it unchanged.
pub fn normalize_for_comparison(value: &str, kind: MatchKind) -> String {
    let mut current = normalize_once(value, kind);
    loop {
        let next = normalize_once(&current, kind);
        // After the first round a round can only drop characters.
        if next == current || next.len() >= current.len() {
            return next;
        }
        current = next;
    }
}

fn normalize_once(value: &str, kind: MatchKind) -> String {
    let folded: String = value
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let stripped = match kind {
        MatchKind::Track => strip_nested(folded, &[&TRACK_JUNK_REGEX, &EMPTY_PARENS_REGEX]),
        MatchKind::Artist => {
            let without_parens = strip_nested(folded, &[&PARENTHETICAL_REGEX]);
            ARTICLE_REGEX.replace_all(&without_parens, "").into_owned()
        }
    };

    stripped.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Remove `patterns` until none matches, peeling one nesting level per pass.
fn strip_nested(mut value: String, patterns: &[&Regex]) -> String {
    loop {
        let before = value.len();
        for pattern in patterns {
            value = pattern.replace_all(&value, "").into_owned();
        }
        if value.len() == before {
            return value;
        }
    }
}

/// Strip junk parentheticals from a display name, keeping its case and spacing.
///
/// `"Come As You Are (Remastered)"` becomes `"Come As You Are"`.
pub fn remove_track_junk(value: &str) -> String {
    strip_nested(value.to_string(), &[&TRACK_JUNK_REGEX, &EMPTY_PARENS_REGEX])
        .trim()
        .to_string()
}

/// Drop every parenthetical, e.g. the disambiguation in `"Everclear (band)"`.
pub fn strip_parentheticals(value: &str) -> String {
    let stripped = PARENTHETICAL_REGEX.replace_all(value, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein distance over chars, keeping one row of the shorter string.
pub fn edit_distance(left: &str, right: &str) -> usize {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();

    let (long, short) = if left_chars.len() >= right_chars.len() {
        (left_chars, right_chars)
    } else {
        (right_chars, left_chars)
    };

    if short.is_empty() {
        return long.len();
    }

    let mut row: Vec<usize> = (0..=short.len()).collect();
    for (long_index, long_char) in long.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = long_index + 1;
        for (short_index, short_char) in short.iter().enumerate() {
            let above = row[short_index + 1];
            let substitution = diagonal + usize::from(long_char != short_char);
            row[short_index + 1] = (above + 1).min(row[short_index] + 1).min(substitution);
            diagonal = above;
        }
    }

    row[short.len()]
}

/// Distance between an observed track title and a catalog title when they
/// are close enough to be the same song; `None` otherwise.
pub fn track_matches(candidate: &str, reference: &str, thresholds: &MatchThresholds) -> Option<usize> {
    let candidate = normalize_for_comparison(candidate, MatchKind::Track);
    let reference = normalize_for_comparison(reference, MatchKind::Track);

    let distance = edit_distance(&candidate, &reference);
    thresholds
        .accepts(distance, candidate.chars().count())
        .then_some(distance)
}

/// Loose artist comparison.
///
/// An observed name that ends the reference ("bach" against "johann sebastian
/// bach") matches outright; otherwise the track distance rule applies.
pub fn artist_matches(candidate: &str, reference: &str, thresholds: &MatchThresholds) -> bool {
    let candidate = normalize_for_comparison(candidate, MatchKind::Artist);
    let reference = normalize_for_comparison(reference, MatchKind::Artist);

    if candidate.is_empty() {
        return false;
    }

    if reference.ends_with(&candidate) {
        return true;
    }

    let distance = edit_distance(&candidate, &reference);
    thresholds.accepts(distance, candidate.chars().count())
}

/// Rough release classification from the album title.
pub fn album_kind(name: &str) -> AlbumKind {
    let lower = name.to_lowercase();

    if ["hits", "greatest", "best of", "singles", "soundtrack"]
        .iter()
        .any(|marker| lower.contains(marker))
    {
        return AlbumKind::Hits;
    }

    if lower.contains("live") || LIVE_DATE_REGEX.is_match(&lower) {
        return AlbumKind::Live;
    }

    AlbumKind::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_track_drops_case_space_and_junk() {
        assert_eq!(
            normalize_for_comparison("Smells Like Teen Spirit (Album Version)", MatchKind::Track),
            "smellsliketeenspirit"
        );
        assert_eq!(
            normalize_for_comparison("Rape Me (Explicit)", MatchKind::Track),
            "rapeme"
        );
        assert_eq!(
            normalize_for_comparison("Paranoid (Live at the Apollo)", MatchKind::Track),
            "paranoid"
        );
    }

    #[test]
    fn normalize_track_keeps_meaningful_parentheticals() {
        assert_eq!(
            normalize_for_comparison("(Don't Fear) The Reaper", MatchKind::Track),
            "(don'tfear)thereaper"
        );
    }

    #[test]
    fn normalize_artist_drops_parentheticals_and_article() {
        assert_eq!(normalize_for_comparison("The Beatles", MatchKind::Artist), "beatles");
        assert_eq!(normalize_for_comparison("Everclear (band)", MatchKind::Artist), "everclear");
        assert_eq!(normalize_for_comparison("Theatre of Tragedy", MatchKind::Artist), "theatreoftragedy");
    }

    #[test]
    fn normalize_folds_accents() {
        assert_eq!(normalize_for_comparison("Motörhead", MatchKind::Artist), "motorhead");
        assert_eq!(normalize_for_comparison("Beyoncé", MatchKind::Artist), "beyonce");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "The The",
            "((Live)) Song",
            "Come As You Are (Remastered)",
            "  Sigur Rós  (band) ",
            "ＡＢＣ (feat. Someone)",
            "İstanbul",
            "",
        ];
        let nested_track = format!("song {}live{}", "(".repeat(20), ")".repeat(20));
        let nested_artist = format!("band {}x{}", "(".repeat(24), ")".repeat(24));
        let samples = samples
            .iter()
            .map(|s| s.to_string())
            .chain([nested_track, nested_artist]);

        for sample in samples {
            let sample = sample.as_str();
            for kind in [MatchKind::Track, MatchKind::Artist] {
                let once = normalize_for_comparison(sample, kind);
                let twice = normalize_for_comparison(&once, kind);
                assert_eq!(once, twice, "not idempotent for {sample:?} as {kind:?}");
            }
        }
    }

    #[test]
    fn deeply_nested_parentheses_are_removed_in_one_call() {
        let track = format!("song {}live{}", "(".repeat(20), ")".repeat(20));
        let artist = format!("band {}x{}", "(".repeat(20), ")".repeat(20));

        assert_eq!(normalize_for_comparison(&track, MatchKind::Track), "song");
        assert_eq!(normalize_for_comparison(&artist, MatchKind::Artist), "band");
    }

    #[test]
    fn remove_track_junk_keeps_display_form() {
        assert_eq!(remove_track_junk("Come As You Are (Remastered)"), "Come As You Are");
        assert_eq!(remove_track_junk("Lithium (Live) ()"), "Lithium");
        assert_eq!(remove_track_junk("In Bloom"), "In Bloom");
    }

    #[test]
    fn strip_parentheticals_tidies_spacing() {
        assert_eq!(strip_parentheticals("Everclear (band)"), "Everclear");
        assert_eq!(strip_parentheticals("Low (US) (rock)  Group"), "Low Group");
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("osborne", "osbourne"), 1);
    }

    #[test]
    fn edit_distance_is_symmetric() {
        let words = ["flaw", "lawn", "crazytrain", "crazy train", "", "ozzy", "osbourne"];
        for a in words {
            for b in words {
                assert_eq!(edit_distance(a, b), edit_distance(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn track_matches_scales_with_length() {
        let thresholds = MatchThresholds::default();

        // Short titles tolerate no edits.
        assert_eq!(track_matches("Hey", "Hey", &thresholds), Some(0));
        assert_eq!(track_matches("Hey", "Hex", &thresholds), None);

        // Ten characters tolerate two edits.
        assert_eq!(track_matches("Crazy Trian", "Crazy Train", &thresholds), Some(2));
        assert_eq!(track_matches("Crazy Tr", "Crazy Train", &thresholds), None);
    }

    #[test]
    fn track_matches_caps_absolute_distance() {
        let thresholds = MatchThresholds::default();
        let long = "abcdefghijklmnopqrstuvwxyzabcdefghij";
        let edited = "abcdefghijklmnopqrstuvwxyzabcde";
        assert_eq!(track_matches(long, edited, &thresholds), None);
    }

    #[test]
    fn artist_matches_trailing_substring() {
        let thresholds = MatchThresholds::default();
        assert!(artist_matches("bach", "Johann Sebastian Bach", &thresholds));
        assert!(!artist_matches("johann", "Johann Sebastian Bach", &thresholds));
    }

    #[test]
    fn artist_matches_small_typos() {
        let thresholds = MatchThresholds::default();
        assert!(artist_matches("ozzy osborne", "Ozzy Osbourne", &thresholds));
        assert!(artist_matches("the beatles", "Beatles", &thresholds));
        assert!(!artist_matches("ozzy", "Black Sabbath", &thresholds));
    }

    #[test]
    fn empty_artist_never_matches() {
        let thresholds = MatchThresholds::default();
        assert!(!artist_matches("", "Nirvana", &thresholds));
        assert!(!artist_matches("The", "Nirvana", &thresholds));
    }

    #[test]
    fn album_kind_heuristics() {
        assert_eq!(album_kind("Live at Budokan"), AlbumKind::Live);
        assert_eq!(album_kind("1982-03-12 Hammersmith"), AlbumKind::Live);
        assert_eq!(album_kind("The Ozzman Cometh: Greatest Hits"), AlbumKind::Hits);
        assert_eq!(album_kind("Blizzard of Ozz"), AlbumKind::Normal);
    }
}
