use crate::model::ChangeReport;
use regex::Regex;
use std::sync::OnceLock;

const FIELD_SEP: char = '\u{1f}';

/// `git log` pretty format: hash, parents, author name, author email, strict ISO date.
pub const LOG_FORMAT: &str = "--pretty=format:%H%x1f%P%x1f%an%x1f%ae%x1f%aI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub parents: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub date: String,
}

impl LogEntry {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// `N file(s) changed[, N insertion(s)(+)][, N deletion(s)(-)]`, the whole line.
fn summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\d+ files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?\s*$")
            .expect("valid regex")
    })
}

pub fn parse_log_line(line: &str) -> Option<LogEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let mut fields = line.split(FIELD_SEP);
    let hash = fields.next()?.trim().to_string();
    let parents = fields.next()?;
    let author_name = fields.next()?.to_string();
    let author_email = fields.next()?.to_string();
    let date = fields.next()?.trim().to_string();

    if hash.is_empty() {
        return None;
    }

    Some(LogEntry {
        hash,
        parents: parents.split_whitespace().map(str::to_string).collect(),
        author_name,
        author_email,
        date,
    })
}

/// Parses the full `git log` output, newest first as git emits it.
pub fn parse_log(output: &str) -> Vec<LogEntry> {
    output.lines().filter_map(parse_log_line).collect()
}

fn capture_count(caps: &regex::Captures<'_>, group: usize) -> u64 {
    caps.get(group)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Undoes git's C-style quoting (`"caf\303\251.txt"`). Unquoted input is returned as is.
pub fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };

    let bytes = inner.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' || i + 1 == bytes.len() {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        let octal = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)));
        if let Some(digits) = octal {
            let value = digits.iter().fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
            out.push(value as u8);
            i += 4;
            continue;
        }
        out.push(match next {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            other => other,
        });
        i += 2;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parses the per-commit detail output of `git show --stat` (or `--name-only`).
///
/// Rows with ` | ` always name a file. Other lines are the summary when they
/// match its full shape, and a bare path otherwise.
pub fn parse_change_report(output: &str) -> ChangeReport {
    let mut report = ChangeReport::default();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let path = match line.rsplit_once(" | ") {
            Some((path, _)) => path.trim(),
            None => {
                if let Some(caps) = summary_re().captures(line) {
                    report.insertions += capture_count(&caps, 1);
                    report.deletions += capture_count(&caps, 2);
                    continue;
                }
                line.trim()
            }
        };
        if !path.is_empty() {
            report.files.push(unquote_path(path));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_log_line_with_parents() {
        let line = "abc\u{1f}p1 p2\u{1f}Ada Lovelace\u{1f}ada@example.com\u{1f}2024-01-01T09:00:00+02:00";
        let entry = parse_log_line(line).unwrap();
        assert_eq!(entry.hash, "abc");
        assert_eq!(entry.parents, vec!["p1".to_string(), "p2".to_string()]);
        assert_eq!(entry.author_name, "Ada Lovelace");
        assert!(entry.is_merge());
    }

    #[test]
    fn root_commit_has_no_parents_and_pipes_in_names_survive() {
        let line = "abc\u{1f}\u{1f}A | B\u{1f}ab@example.com\u{1f}2024-01-01T09:00:00Z";
        let entry = parse_log_line(line).unwrap();
        assert!(entry.parents.is_empty());
        assert_eq!(entry.author_name, "A | B");
    }

    #[test]
    fn malformed_log_lines_are_dropped() {
        let out = "\nonly-a-hash\nabc\u{1f}\u{1f}n\u{1f}e\u{1f}2024-01-01T00:00:00Z\n";
        let entries = parse_log(out);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hash, "abc");
    }

    #[test]
    fn parses_stat_output() {
        let out = " d/y.txt | 1 -\n d/z.txt | 1 +\n 2 files changed, 1 insertion(+), 1 deletion(-)\n";
        let report = parse_change_report(out);
        assert_eq!(report.files, vec!["d/y.txt".to_string(), "d/z.txt".to_string()]);
        assert_eq!(report.insertions, 1);
        assert_eq!(report.deletions, 1);
    }

    #[test]
    fn parses_name_only_output() {
        let out = "src/a.rs\nsrc/b.rs\n\n";
        let report = parse_change_report(out);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.insertions, 0);
        assert_eq!(report.deletions, 0);
    }

    #[test]
    fn totals_sum_over_every_summary_line_in_any_order() {
        let a = " 1 file changed, 10 insertions(+)";
        let b = " 3 files changed, 2 insertions(+), 7 deletions(-)";
        let c = " 1 file changed, 1 deletion(-)";

        let forward = parse_change_report(&[a, b, c].join("\n"));
        let backward = parse_change_report(&[c, b, a].join("\n"));

        assert_eq!(forward.insertions, 12);
        assert_eq!(forward.deletions, 8);
        assert_eq!(forward.insertions, backward.insertions);
        assert_eq!(forward.deletions, backward.deletions);
        assert!(forward.files.is_empty());
    }

    #[test]
    fn stat_row_named_like_a_summary_is_a_path() {
        let out = " 1 file changed.txt | 1 +\n notes.md | 2 ++\n 2 files changed, 3 insertions(+)\n";
        let report = parse_change_report(out);
        assert_eq!(report.files, vec!["1 file changed.txt".to_string(), "notes.md".to_string()]);
        assert_eq!(report.insertions, 3);
        assert_eq!(report.deletions, 0);
    }

    #[test]
    fn quoted_paths_are_decoded() {
        let out = " \"\\303\\251t\\303\\251.txt\" | 1 +\n \"tab\\there.txt\" | 1 +\n 2 files changed, 2 insertions(+)\n";
        let report = parse_change_report(out);
        assert_eq!(report.files, vec!["été.txt".to_string(), "tab\there.txt".to_string()]);
        assert_eq!(unquote_path("plain.txt"), "plain.txt");
        assert_eq!(unquote_path("\"say \\\"hi\\\".md\""), "say \"hi\".md");
    }

    #[test]
    fn file_named_like_summary_word_is_still_a_path() {
        let report = parse_change_report("docs/changed.md | 4 ++++\n 1 file changed, 4 insertions(+)");
        assert_eq!(report.files, vec!["docs/changed.md".to_string()]);
        assert_eq!(report.insertions, 4);
    }
}
