//! Intent routing — classifies one utterance into exactly one capability.
//!
//! Classification is pure and total: the rules below are evaluated in a
//! fixed priority order and the first match wins, with open-ended chat as
//! the catch-all. An utterance matching several keyword sets (say, both
//! "price" and "map") goes to the earlier rule; that precedence is
//! deliberate and locked by tests, even where it makes an overlapping
//! utterance land somewhere a user might not expect.

/// The classified capability plus its extracted arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    GenerateImage { prompt: String },
    EditImage { instruction: String },
    Search { query: String },
    Locate { query: String },
    Chat { prompt: String },
}

/// Reserved command prefix for image generation.
const IMAGE_COMMAND: &str = "/imagine";
/// Phrase form of the image-generation trigger.
const IMAGE_PHRASE: &str = "generate image";
/// Edit keywords; only consulted while an upload is buffered.
const EDIT_KEYWORDS: &[&str] = &["edit", "filter", "remove"];
const SEARCH_KEYWORDS: &[&str] = &["news", "price", "search"];
const LOCATION_KEYWORDS: &[&str] = &["where is", "location", "map"];

/// Classify `utterance` into exactly one intent.
///
/// Case-insensitive over the whole utterance; never mutates anything and
/// never fails — worst case an extracted argument is the empty string.
pub fn classify(utterance: &str, has_pending_upload: bool) -> Intent {
    let lower = utterance.to_lowercase();

    if starts_with_ignore_ascii_case(utterance, IMAGE_COMMAND) {
        let prompt = utterance[IMAGE_COMMAND.len()..].trim().to_string();
        return Intent::GenerateImage { prompt };
    }
    if let Some(idx) = find_ignore_ascii_case(utterance, IMAGE_PHRASE) {
        let mut prompt = String::new();
        prompt.push_str(&utterance[..idx]);
        prompt.push_str(&utterance[idx + IMAGE_PHRASE.len()..]);
        return Intent::GenerateImage {
            prompt: prompt.trim().to_string(),
        };
    }

    if has_pending_upload && contains_any(&lower, EDIT_KEYWORDS) {
        return Intent::EditImage {
            instruction: utterance.to_string(),
        };
    }

    if contains_any(&lower, SEARCH_KEYWORDS) {
        return Intent::Search {
            query: utterance.to_string(),
        };
    }

    if contains_any(&lower, LOCATION_KEYWORDS) {
        return Intent::Locate {
            query: utterance.to_string(),
        };
    }

    Intent::Chat {
        prompt: utterance.to_string(),
    }
}

fn contains_any(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| lower.contains(keyword))
}

fn starts_with_ignore_ascii_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Byte offset of the first ASCII-case-insensitive occurrence of `needle`.
///
/// The needle is ASCII, so matching against the original string keeps the
/// returned offset valid for slicing it (a lowercased copy could shift
/// byte positions for some Unicode input).
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    for idx in 0..=haystack.len() - needle.len() {
        if !haystack.is_char_boundary(idx) {
            continue;
        }
        if let Some(window) = haystack.get(idx..idx + needle.len()) {
            if window.eq_ignore_ascii_case(needle) {
                return Some(idx);
            }
        }
    }
    None
}
