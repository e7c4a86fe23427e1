//! Address grammar and free-text scanning.

use crate::types::TokenAddress;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Unanchored base58 run of address length, used to scan free text.
pub static ADDRESS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[1-9A-HJ-NP-Za-km-z]{32,44}").expect("address pattern is valid")
});

/// Whether `candidate` as a whole satisfies the address grammar.
pub fn is_likely_address(candidate: &str) -> bool {
    TokenAddress::parse(candidate).is_ok()
}

/// Every distinct grammar match in `text`, in order of first appearance.
pub fn extract_potential_addresses(text: &str) -> Vec<TokenAddress> {
    let mut seen = HashSet::new();
    ADDRESS_PATTERN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|s| seen.insert(*s))
        .filter_map(|s| TokenAddress::parse(s).ok())
        .collect()
}

/// First grammar match in `text`, if any.
pub fn first_address(text: &str) -> Option<TokenAddress> {
    ADDRESS_PATTERN
        .find(text)
        .and_then(|m| TokenAddress::parse(m.as_str()).ok())
}

/// Pick the address that occurs the fewest times in `text`.
///
/// Boilerplate addresses (wrapped SOL in every table row, program ids in a
/// footer) repeat; the token being viewed usually appears once or twice.
/// Ties go to the address that appears first.
pub fn least_frequent_address(text: &str) -> Option<TokenAddress> {
    let mut best: Option<(TokenAddress, usize)> = None;
    for candidate in extract_potential_addresses(text) {
        let count = text.matches(candidate.as_str()).count();
        if count == 0 {
            continue;
        }
        match &best {
            Some((_, min)) if count >= *min => {}
            _ => best = Some((candidate, count)),
        }
    }
    best.map(|(address, _)| address)
}
