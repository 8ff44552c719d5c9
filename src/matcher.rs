use once_cell::sync::Lazy;
use regex::Regex;

/// Solana addresses are base58 strings of 32–44 characters. The alphabet
/// excludes `0`, `O`, `I` and `l`; the word boundaries keep matches maximal.
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[1-9A-HJ-NP-Za-km-z]{32,44}\b").unwrap());

/// Extract candidate Solana addresses from free text, left to right,
/// duplicates included and strings returned verbatim. This is a heuristic
/// character-class filter only — no checksum, no on-chain lookup — so false
/// positives (hashes, signatures) are expected and accepted.
pub fn extract(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    ADDRESS_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    const SOL: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn finds_address_inside_text() {
        let found = extract(&format!("new gem just dropped {BONK} lfg"));
        assert_eq!(found, vec![BONK.to_string()]);
    }

    #[test]
    fn preserves_order_and_duplicates() {
        let found = extract(&format!("{SOL} then {BONK} then {SOL} again"));
        assert_eq!(found, vec![SOL, BONK, SOL]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(extract("").is_empty());
    }

    #[test]
    fn matches_are_in_alphabet_and_length_range() {
        let noisy = format!(
            "0x00ff {BONK} l1l1l1l1l1l1l1l1l1l1l1l1l1l1l1l1l1 short {SOL}"
        );
        for m in extract(&noisy) {
            assert!((32..=44).contains(&m.len()), "bad length: {m}");
            assert!(
                m.chars().all(|c| c.is_ascii_alphanumeric()
                    && !matches!(c, '0' | 'O' | 'I' | 'l')),
                "bad character in {m}"
            );
        }
    }

    #[test]
    fn rejects_too_short_and_too_long() {
        // 31 chars — below the minimum.
        assert!(extract("1111111111111111111111111111111").is_empty());
        // 45 chars of base58 — boundary-bounded but over the maximum.
        let long = "1".repeat(45);
        assert!(extract(&long).is_empty());
    }

    #[test]
    fn word_boundary_excludes_embedded_runs() {
        // Punctuation is a word boundary, so an address followed by `!`
        // still matches. An excluded letter like `O` is still a word
        // character, so it breaks the boundary and the run is skipped
        // entirely rather than partially matched.
        assert_eq!(extract(&format!("{BONK}!")), vec![BONK.to_string()]);
        assert!(extract(&format!("{BONK}O")).is_empty());
    }
}
