//! Line-level and structural diffing.
//!
//! [`line_diff`] compares texts line by line and [`structural_diff`] walks two
//! [`GenericValue`] trees key by key. [`unified_diff`] renders a git-style
//! patch from a minimal edit script.

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffTag, TextDiff};

use crate::convert::json_utils::{kind_name, parse_json};
use crate::convert::GenericValue;
use crate::error::DiffError;

/// How [`line_diff`] lines texts up.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineAlignment {
    /// Line N of one text is compared with line N of the other.
    #[default]
    Positional,
    /// Minimal edit script; inserted lines do not shift every later line.
    Myers,
}

/// Configuration for diff generation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffConfig {
    /// Number of context lines around changes in a unified diff (default: 3)
    pub context_lines: usize,
    pub algorithm: LineAlignment,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            context_lines: 3,
            algorithm: LineAlignment::Positional,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    Equal,
    Added,
    Removed,
    Changed,
}

/// One line of a line diff. `before` is the line from the first text and
/// `after` the line from the second; whichever side is absent is `None`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineDiffEntry {
    /// 1-indexed
    pub line_number: usize,
    pub kind: LineChange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

impl LineDiffEntry {
    fn new(line_number: usize, before: Option<&str>, after: Option<&str>) -> Self {
        let kind = match (before, after) {
            (Some(a), Some(b)) if a == b => LineChange::Equal,
            (Some(_), Some(_)) => LineChange::Changed,
            (Some(_), None) => LineChange::Removed,
            _ => LineChange::Added,
        };
        Self {
            line_number,
            kind,
            before: before.map(str::to_string),
            after: after.map(str::to_string),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineDiffStats {
    pub equal: usize,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
}

/// Result of a line diff
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    pub entries: Vec<LineDiffEntry>,
    pub stats: LineDiffStats,
}

impl LineDiff {
    fn from_entries(entries: Vec<LineDiffEntry>) -> Self {
        let mut stats = LineDiffStats::default();
        for entry in &entries {
            match entry.kind {
                LineChange::Equal => stats.equal += 1,
                LineChange::Added => stats.added += 1,
                LineChange::Removed => stats.removed += 1,
                LineChange::Changed => stats.changed += 1,
            }
        }
        Self { entries, stats }
    }

    pub fn is_identical(&self) -> bool {
        self.entries.iter().all(|entry| entry.kind == LineChange::Equal)
    }
}

/// Compares two texts line by line.
///
/// With the default positional alignment the result has exactly
/// `max(lines(a), lines(b))` entries.
pub fn line_diff(old_text: &str, new_text: &str, config: &DiffConfig) -> LineDiff {
    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();
    tracing::debug!(
        old = old_lines.len(),
        new = new_lines.len(),
        algorithm = ?config.algorithm,
        "line diff"
    );
    let entries = match config.algorithm {
        LineAlignment::Positional => positional(&old_lines, &new_lines),
        LineAlignment::Myers => myers(&old_lines, &new_lines),
    };
    LineDiff::from_entries(entries)
}

fn positional(old_lines: &[&str], new_lines: &[&str]) -> Vec<LineDiffEntry> {
    (0..old_lines.len().max(new_lines.len()))
        .map(|idx| {
            LineDiffEntry::new(
                idx + 1,
                old_lines.get(idx).copied(),
                new_lines.get(idx).copied(),
            )
        })
        .collect()
}

// Line numbers follow the old text except for additions, which carry the
// line number they land on in the new text.
fn myers(old_lines: &[&str], new_lines: &[&str]) -> Vec<LineDiffEntry> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(old_lines, new_lines);

    let mut entries = Vec::new();
    for op in diff.ops() {
        let old_range = op.old_range();
        let new_range = op.new_range();
        match op.tag() {
            DiffTag::Equal | DiffTag::Replace => {
                // Replace pairs lines up as Changed; the longer side's tail is
                // reported as Removed or Added.
                let paired = old_range.len().max(new_range.len());
                for offset in 0..paired {
                    let before = old_lines.get(old_range.start + offset).filter(|_| offset < old_range.len());
                    let after = new_lines.get(new_range.start + offset).filter(|_| offset < new_range.len());
                    let line_number = if before.is_some() {
                        old_range.start + offset + 1
                    } else {
                        new_range.start + offset + 1
                    };
                    entries.push(LineDiffEntry::new(line_number, before.copied(), after.copied()));
                }
            }
            DiffTag::Delete => {
                for (i, line) in old_lines[old_range.clone()].iter().enumerate() {
                    entries.push(LineDiffEntry::new(old_range.start + i + 1, Some(*line), None));
                }
            }
            DiffTag::Insert => {
                for (i, line) in new_lines[new_range.clone()].iter().enumerate() {
                    entries.push(LineDiffEntry::new(new_range.start + i + 1, None, Some(*line)));
                }
            }
        }
    }
    entries
}

/// Generate unified diff format string (similar to git diff)
///
/// # Arguments
/// * `old_text` - The original text
/// * `new_text` - The modified text
/// * `old_name` - Name/label for old text (e.g., "a/file.txt")
/// * `new_name` - Name/label for new text (e.g., "b/file.txt")
/// * `config` - Configuration for diff generation
///
/// # Returns
/// The patch text, or an empty string when the texts are equal
pub fn unified_diff(
    old_text: &str,
    new_text: &str,
    old_name: &str,
    new_name: &str,
    config: &DiffConfig,
) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(old_text, new_text);
    diff.unified_diff()
        .context_radius(config.context_lines)
        .header(old_name, new_name)
        .to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralChange {
    Added,
    Removed,
    Modified,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructuralDiffEntry {
    /// Dot-joined key path; empty for the root.
    pub path: String,
    pub kind: StructuralChange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<GenericValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<GenericValue>,
}

/// Recursively compares two values below `path`.
///
/// Mappings are walked key by key (keys of `old` first, then keys only in
/// `new`). Anything else, sequences included, is compared by equality and
/// reported as a single `Modified` entry.
pub fn structural_diff(old: &GenericValue, new: &GenericValue, path: &str) -> Vec<StructuralDiffEntry> {
    let mut entries = Vec::new();
    walk(old, new, path, &mut entries);
    entries
}

fn walk(old: &GenericValue, new: &GenericValue, path: &str, out: &mut Vec<StructuralDiffEntry>) {
    match (old, new) {
        (GenericValue::Object(old_map), GenericValue::Object(new_map)) => {
            for (key, old_value) in old_map {
                let child = join_path(path, key);
                match new_map.get(key) {
                    Some(new_value) => walk(old_value, new_value, &child, out),
                    None => out.push(StructuralDiffEntry {
                        path: child,
                        kind: StructuralChange::Removed,
                        old_value: Some(old_value.clone()),
                        new_value: None,
                    }),
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    out.push(StructuralDiffEntry {
                        path: join_path(path, key),
                        kind: StructuralChange::Added,
                        old_value: None,
                        new_value: Some(new_value.clone()),
                    });
                }
            }
        }
        _ if old == new => {}
        _ => out.push(StructuralDiffEntry {
            path: path.to_string(),
            kind: StructuralChange::Modified,
            old_value: Some(old.clone()),
            new_value: Some(new.clone()),
        }),
    }
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Parses both texts as JSON and diffs them structurally.
pub fn json_diff(old_text: &str, new_text: &str) -> Result<Vec<StructuralDiffEntry>, DiffError> {
    let old = parse_json(old_text).map_err(DiffError::Left)?;
    let new = parse_json(new_text).map_err(DiffError::Right)?;
    let (left, right) = (kind_name(&old), kind_name(&new));
    if left != right {
        tracing::warn!(left, right, "refusing to diff values of different kinds");
        return Err(DiffError::IncompatibleKinds { left, right });
    }
    Ok(structural_diff(&old, &new, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_identical_texts() {
        let text = "line 1\nline 2\nline 3";
        let result = line_diff(text, text, &DiffConfig::default());

        assert!(result.is_identical());
        assert_eq!(result.stats.equal, 3);
        assert_eq!(result.entries.len(), 3);
    }

    #[test]
    fn test_changed_middle_line() {
        let result = line_diff("a\nb\nc", "a\nx\nc", &DiffConfig::default());
        assert_eq!(
            result.entries,
            vec![
                LineDiffEntry::new(1, Some("a"), Some("a")),
                LineDiffEntry {
                    line_number: 2,
                    kind: LineChange::Changed,
                    before: Some("b".into()),
                    after: Some("x".into()),
                },
                LineDiffEntry::new(3, Some("c"), Some("c")),
            ]
        );
        assert_eq!(result.stats.changed, 1);
    }

    #[test]
    fn test_length_mismatch_is_added_or_removed() {
        let grown = line_diff("line 1\nline 2", "line 1\nline 2\nline 3", &DiffConfig::default());
        assert_eq!(grown.stats.added, 1);
        assert_eq!(grown.entries[2].after.as_deref(), Some("line 3"));
        assert_eq!(grown.entries[2].before, None);

        let shrunk = line_diff("line 1\nline 2\nline 3", "line 1\nline 2", &DiffConfig::default());
        assert_eq!(shrunk.stats.removed, 1);
        assert_eq!(shrunk.entries[2].kind, LineChange::Removed);
    }

    #[test]
    fn test_positional_does_not_realign_but_myers_does() {
        let old = "a\nb\nc";
        let new = "new\na\nb\nc";
        let positional = line_diff(old, new, &DiffConfig::default());
        assert_eq!(positional.stats.changed, 3);
        assert_eq!(positional.stats.added, 1);

        let config = DiffConfig {
            algorithm: LineAlignment::Myers,
            ..DiffConfig::default()
        };
        let myers = line_diff(old, new, &config);
        assert_eq!(myers.stats, LineDiffStats { equal: 3, added: 1, removed: 0, changed: 0 });
        assert_eq!(myers.entries[0], LineDiffEntry::new(1, None, Some("new")));
    }

    #[test]
    fn test_myers_replace_pairs_lines() {
        let config = DiffConfig {
            algorithm: LineAlignment::Myers,
            ..DiffConfig::default()
        };
        let result = line_diff("a\nb\nz", "a\nc\nz", &config);
        assert_eq!(result.stats, LineDiffStats { equal: 2, added: 0, removed: 0, changed: 1 });
        assert!(line_diff("same\ntext", "same\ntext", &config).is_identical());
    }

    #[test]
    fn test_unified_diff_format() {
        let old = "line 1\nline 2\nline 3\n";
        let new = "line 1\nline 2\nline 4\n";
        let diff = unified_diff(old, new, "a/file.txt", "b/file.txt", &DiffConfig::default());

        assert!(diff.starts_with("--- a/file.txt\n+++ b/file.txt\n"));
        assert!(diff.contains("@@ -1,3 +1,3 @@"));
        assert!(diff.contains("-line 3"));
        assert!(diff.contains("+line 4"));
        assert_eq!(unified_diff(old, old, "a", "b", &DiffConfig::default()), "");
    }

    #[test]
    fn test_structural_added_removed_modified() {
        let old = json!({"name": "Ada", "tags": ["x"], "meta": {"v": 1, "gone": true}});
        let new = json!({"name": "Ada", "tags": ["x", "y"], "meta": {"v": 2}, "extra": null});
        let entries = structural_diff(&old, &new, "");
        assert_eq!(
            entries,
            vec![
                StructuralDiffEntry {
                    path: "tags".into(),
                    kind: StructuralChange::Modified,
                    old_value: Some(json!(["x"])),
                    new_value: Some(json!(["x", "y"])),
                },
                StructuralDiffEntry {
                    path: "meta.v".into(),
                    kind: StructuralChange::Modified,
                    old_value: Some(json!(1)),
                    new_value: Some(json!(2)),
                },
                StructuralDiffEntry {
                    path: "meta.gone".into(),
                    kind: StructuralChange::Removed,
                    old_value: Some(json!(true)),
                    new_value: None,
                },
                StructuralDiffEntry {
                    path: "extra".into(),
                    kind: StructuralChange::Added,
                    old_value: None,
                    new_value: Some(json!(null)),
                },
            ]
        );
    }

    #[test]
    fn test_structural_diff_is_reflexive_and_prefixes_paths() {
        let value = json!({"a": {"b": [1, 2]}, "c": "d"});
        assert!(structural_diff(&value, &value, "").is_empty());
        let entries = structural_diff(&json!({"k": 1}), &json!({"k": 2}), "root");
        assert_eq!(entries[0].path, "root.k");
        let scalars = structural_diff(&json!(1), &json!("1"), "");
        assert_eq!(scalars[0].path, "");
        assert_eq!(scalars[0].kind, StructuralChange::Modified);
    }

    #[test]
    fn test_json_diff_errors() {
        let err = json_diff("{}", "[]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        let err = json_diff("{", "{}").unwrap_err();
        assert!(matches!(err, DiffError::Left(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidJson);
        assert!(matches!(json_diff("{}", "nope").unwrap_err(), DiffError::Right(_)));
        assert_eq!(json_diff(r#"{"a":1}"#, r#"{"a":1}"#).unwrap(), vec![]);
    }

    #[test]
    fn test_config_deserializes_camel_case() {
        let config: DiffConfig = serde_json::from_str(r#"{"contextLines":1,"algorithm":"myers"}"#).unwrap();
        assert_eq!(config.context_lines, 1);
        assert_eq!(config.algorithm, LineAlignment::Myers);
    }
}
