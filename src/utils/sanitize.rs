//! Filename sanitization utilities

use deunicode::deunicode;

/// Punctuation allowed in track filenames besides ASCII letters and digits
const ALLOWED_PUNCTUATION: &[char] = &['-', '_', '.', '(', ')', '\'', ' ', ','];

/// Clean a track filename so it is portable and stable across runs
///
/// Non-ASCII text is transliterated to its closest ASCII spelling first, then
/// every character outside `[A-Za-z0-9-_.()' ,]` becomes `-`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_filename("Björk - Jóga.mp3"), "Bjork - Joga.mp3");
/// assert_eq!(clean_filename("AC/DC: Live?"), "AC-DC- Live-");
/// ```
pub fn clean_filename(name: &str) -> String {
    deunicode(name)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c) {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Make an album or playlist name usable as a single directory name
pub fn clean_dir_name(name: &str) -> String {
    name.replace('/', "-")
}
