// src/tokenizer.rs - whitespace tokenizer for BLEU

/// Split text into word tokens on any run of whitespace.
///
/// Leading and trailing whitespace is ignored, so the result never holds an
/// empty token and is empty only when `text` has no non-whitespace characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(String::from).collect()
}

/// Tokenize every item of an iterator of texts.
pub fn tokenize_all<'a, I>(texts: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().map(tokenize).collect()
}
