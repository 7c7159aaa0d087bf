//! Textual scan of shell commands for output redirection and file mutation.

use regex::Regex;
use std::sync::LazyLock;

// `2>&1`, `>&2`: descriptor duplication, not a file write.
static FD_DUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d*>&\d+").unwrap());

// `> /dev/null`, `2>>/dev/null`: discarded output.
static DEV_NULL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d&]?>>?\s*/dev/null\b").unwrap());

const SEPARATORS: &[char] = &[';', '|', '&', '(', ')', '`', '\n'];

/// First token in `command` that redirects output or mutates the file tree.
///
/// Recognizes `>`/`>>` redirections, any word in `denied` (also as the
/// basename of a path such as `/bin/rm`), and in-place stream edits
/// (`sed -i`, `sed --in-place`, `perl -i`).
pub fn mutating_command_token(command: &str, denied: &[String]) -> Option<String> {
    let stripped = FD_DUP_REGEX.replace_all(command, " ");
    let stripped = DEV_NULL_REGEX.replace_all(&stripped, " ");

    if stripped.contains(">>") {
        return Some(">>".to_string());
    }
    if stripped.contains('>') {
        return Some(">".to_string());
    }

    for segment in stripped.split(SEPARATORS) {
        let words: Vec<&str> = segment.split_whitespace().collect();
        for (i, word) in words.iter().enumerate() {
            let base = word.rsplit('/').next().unwrap_or(word);
            if denied.iter().any(|d| d == base) {
                return Some(base.to_string());
            }
            if (base == "sed" || base == "perl")
                && words[i + 1..]
                    .iter()
                    .any(|w| w.starts_with("-i") || *w == "--in-place" || w.starts_with("--in-place="))
            {
                return Some(format!("{} -i", base));
            }
        }
    }

    None
}
