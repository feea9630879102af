/// One token per non-whitespace character.
///
/// Works for text without word delimiters (Chinese course material) and is
/// used identically at build and query time.
pub fn tokenize(text: &str) -> Vec<String> {
    text.chars().filter(|c| !c.is_whitespace()).map(String::from).collect()
}
