//! Key-value INI parsing.
use crate::error::ConfigError;

/// A parsed `[header]` section with its `key = value` entries in file order.
///
/// # Examples
///
/// ```
/// use dfman::config::ini::KvSection;
///
/// let section = KvSection {
///     header: "Overrides".to_string(),
///     entries: vec![("vimrc".to_string(), "~/.config/nvim/init.vim".to_string())],
/// };
/// assert_eq!(section.header, "Overrides");
/// assert_eq!(section.entries[0].0, "vimrc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvSection {
    /// The section header, case preserved (platform ids and file names are data).
    pub header: String,
    /// Key-value entries within this section.
    pub entries: Vec<(String, String)>,
}

impl KvSection {
    /// Look up the value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Insert or replace `key`, keeping the position of an existing key.
    pub fn set(&mut self, key: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.to_string();
        } else {
            self.entries.push((key.to_string(), value.to_string()));
        }
    }
}

/// Parse key-value INI content from a string.
///
/// `key = value` and `key: value` are both accepted. Full-line comments start
/// with `#` or `;`; inline comments (` #` or `\t#`) are stripped from values.
///
/// ```
/// use dfman::config::ini::parse_kv_sections_from_str;
///
/// let sections = parse_kv_sections_from_str(
///     "[Globals]\ndotfile_path = ~/dotfiles # my store\n"
/// ).unwrap();
/// assert_eq!(sections[0].header, "Globals");
/// assert_eq!(sections[0].entries[0].1, "~/dotfiles");
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::InvalidSyntax`] if:
/// - A line inside a section is not a key-value pair
/// - An entry appears outside of a section header
pub fn parse_kv_sections_from_str(content: &str) -> Result<Vec<KvSection>, ConfigError> {
    let mut sections = Vec::new();
    let mut current: Option<KvSection> = None;

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = parse_raw_header(trimmed) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(KvSection {
                header,
                entries: Vec::new(),
            });
        } else if let Some(ref mut section) = current {
            let Some((key, value)) = parse_kv_line(trimmed) else {
                return Err(ConfigError::InvalidSyntax {
                    line: line_num + 1,
                    message: format!("invalid key-value pair: {trimmed}"),
                });
            };
            section.entries.push((key, value));
        } else {
            return Err(ConfigError::InvalidSyntax {
                line: line_num + 1,
                message: format!("entry outside of section: {trimmed}"),
            });
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }

    Ok(sections)
}

/// Collapse repeated headers into one section each.
///
/// Sections keep the position of their first occurrence; a key repeated in a
/// later occurrence replaces the earlier value.
#[must_use]
pub fn merge_sections(sections: Vec<KvSection>) -> Vec<KvSection> {
    let mut merged: Vec<KvSection> = Vec::with_capacity(sections.len());
    for section in sections {
        if let Some(existing) = merged.iter_mut().find(|s| s.header == section.header) {
            for (key, value) in &section.entries {
                existing.set(key, value);
            }
        } else {
            merged.push(section);
        }
    }
    merged
}

/// Return the header of the last section in `content`, if any.
///
/// Used to decide whether appended lines land in the intended section.
#[must_use]
pub fn last_section_header(content: &str) -> Option<String> {
    content
        .lines()
        .rev()
        .find_map(|line| parse_raw_header(line.trim()))
}

/// Parse a `[header]` line preserving original case.
fn parse_raw_header(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Parse a `key = value` or `key: value` line, splitting at whichever
/// delimiter comes first.
fn parse_kv_line(line: &str) -> Option<(String, String)> {
    let idx = line.find(['=', ':'])?;
    let key = line.get(..idx)?.trim();
    let value = line.get(idx + 1..)?.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), strip_inline_comment(value).to_string()))
}

/// Strip inline comments (`#` preceded by whitespace) from a value.
fn strip_inline_comment(value: &str) -> &str {
    value
        .find(" #")
        .or_else(|| value.find("\t#"))
        .and_then(|idx| value.get(..idx))
        .map_or(value, str::trim_end)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn parse_kv_simple() {
        let content = "[section]\nkey1 = value1\nkey2 = value2\n";
        let sections = parse_kv_sections_from_str(content).expect("test data should parse");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].header, "section");
        assert_eq!(
            sections[0].entries,
            vec![
                ("key1".to_string(), "value1".to_string()),
                ("key2".to_string(), "value2".to_string()),
            ]
        );
    }

    #[test]
    fn parse_colon_delimiter() {
        let sections = parse_kv_sections_from_str("[s]\nkey: value\n").unwrap();
        assert_eq!(sections[0].get("key"), Some("value"));
    }

    #[test]
    fn first_delimiter_wins() {
        let sections = parse_kv_sections_from_str("[s]\nkey = C:/path\n").unwrap();
        assert_eq!(sections[0].get("key"), Some("C:/path"));
    }

    #[test]
    fn parse_kv_with_equals_in_value() {
        let sections = parse_kv_sections_from_str("[section]\nkey = val=ue\n").unwrap();
        assert_eq!(sections[0].entries[0].1, "val=ue");
    }

    #[test]
    fn parse_preserves_key_and_header_case() {
        let sections = parse_kv_sections_from_str("[Overrides]\nXresources = ~/.Xres\n").unwrap();
        assert_eq!(sections[0].header, "Overrides");
        assert_eq!(sections[0].entries[0].0, "Xresources");
    }

    #[test]
    fn parse_strips_inline_comments() {
        let sections = parse_kv_sections_from_str("[section]\nkey = value # comment\n").unwrap();
        assert_eq!(sections[0].entries[0].1, "value");
    }

    #[test]
    fn hash_inside_value_is_kept() {
        assert_eq!(strip_inline_comment("color#FF0000"), "color#FF0000");
    }

    #[test]
    fn semicolon_comments_ignored() {
        let sections = parse_kv_sections_from_str("; header comment\n[s]\n; note\na = 1\n").unwrap();
        assert_eq!(sections[0].entries.len(), 1);
    }

    #[test]
    fn entry_outside_section_fails() {
        let err = parse_kv_sections_from_str("orphan = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSyntax { line: 1, .. }));
    }

    #[test]
    fn line_without_delimiter_fails() {
        let err = parse_kv_sections_from_str("[s]\n\njust words\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSyntax { line: 3, .. }));
    }

    #[test]
    fn empty_key_fails() {
        assert!(parse_kv_sections_from_str("[s]\n= value\n").is_err());
    }

    #[test]
    fn empty_header_is_not_a_section() {
        assert!(parse_kv_sections_from_str("[]\na = 1\n").is_err());
    }

    #[test]
    fn merge_duplicate_sections() {
        let sections =
            parse_kv_sections_from_str("[Overrides]\na = 1\nb = 2\n[arch]\nc = 3\n[Overrides]\nb = 20\nd = 4\n")
                .unwrap();
        let merged = merge_sections(sections);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].header, "Overrides");
        assert_eq!(
            merged[0].entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "20".to_string()),
                ("d".to_string(), "4".to_string()),
            ]
        );
    }

    #[test]
    fn last_section_header_finds_final_header() {
        let content = "[Globals]\na = 1\n\n[Overrides]\nb = 2\n";
        assert_eq!(last_section_header(content).as_deref(), Some("Overrides"));
        assert_eq!(last_section_header("no headers"), None);
    }

    #[test]
    fn empty_input_returns_empty() {
        assert!(parse_kv_sections_from_str("").unwrap().is_empty());
        assert!(parse_kv_sections_from_str("# only a comment\n").unwrap().is_empty());
    }
}
