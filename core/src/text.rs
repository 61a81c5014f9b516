use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Everything that is neither a letter nor whitespace: digits,
    /// punctuation, symbols, and the combining marks NFD splits off.
    static ref STRIP: Regex = Regex::new(r"[^\p{L}\s]+").expect("valid regex");
}

/// Decomposes to NFD, drops every code point that is not a letter or
/// whitespace, and lower-cases the remainder. Idempotent.
pub fn clean(text: &str) -> String {
    let decomposed: String = text.nfd().collect();
    STRIP.replace_all(&decomposed, "").to_lowercase()
}

/// Splits on runs of Unicode whitespace; blank input yields nothing.
pub fn split(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Cleans and then splits the text into words.
pub fn parse(text: &str) -> Vec<String> {
    split(&clean(text))
}
