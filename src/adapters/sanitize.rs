//! Log sanitization for patient data.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`] before reaching
//! the sink. Identifiers (assessment UUIDs, SSN, MRN), contact details and
//! inline lab values such as `ast=80` are replaced with fixed markers.
//!
//! Input is capped at `LIVERAID_SANITIZE_MAX_BYTES` (default 16 KiB) per
//! line; anything beyond the cap is dropped and marked `[TRUNCATED]`.

use std::io::Write;
use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const MAX_BYTES_ENV: &str = "LIVERAID_SANITIZE_MAX_BYTES";

/// (pattern, replacement). Replacements may reference capture groups.
const RULES: &[(&str, &str)] = &[
    (
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        "[REDACTED-UUID]",
    ),
    (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
    (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
    (
        r#"(?i)\b(age|gender|ast|alt|alp|albumin|afp|inr|bmi|creatinine|creatin|obesity|ascites|encephalopathy|(?:total|direct)_bilirubin|total_bil|dir_bil|platelets?|platelet_count|trombosit)"?\s*[:=]\s*"?-?\d+(?:\.\d+)?"#,
        "${1}=[REDACTED]",
    ),
];

struct Rules {
    set: RegexSet,
    compiled: Vec<(Regex, &'static str)>,
}

static COMPILED: OnceLock<Rules> = OnceLock::new();

fn rules() -> &'static Rules {
    COMPILED.get_or_init(|| Rules {
        set: RegexSet::new(RULES.iter().map(|(p, _)| *p)).expect("valid sanitize patterns"),
        compiled: RULES
            .iter()
            .map(|(p, r)| (Regex::new(p).expect("valid sanitize pattern"), *r))
            .collect(),
    })
}

fn max_bytes() -> usize {
    std::env::var(MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Longest prefix of `input` within `limit` bytes that ends on a char boundary.
fn bounded(input: &str, limit: usize) -> (&str, bool) {
    if input.len() <= limit {
        return (input, false);
    }
    let mut end = limit;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

/// Redact identifiers and lab values from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_bounded(input, max_bytes())
}

fn sanitize_bounded(input: &str, limit: usize) -> String {
    let rules = rules();
    let (head, truncated) = bounded(input, limit);

    let mut out = head.to_string();
    for idx in rules.set.matches(head).iter() {
        let (regex, replacement) = &rules.compiled[idx];
        out = regex.replace_all(&out, *replacement).into_owned();
    }
    if truncated {
        out.push_str(" [TRUNCATED]");
    }
    out
}

/// `MakeWriter` wrapper that sanitizes each formatted line.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: Write> {
    inner: W,
    pending: Vec<u8>,
}

impl<W: Write> SanitizingWriter<W> {
    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let clean = sanitize(&String::from_utf8_lossy(bytes));
        self.inner.write_all(clean.as_bytes())
    }

    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);

        // A line with no newline is flushed once it grows past twice the cap.
        if self.pending.len() > max_bytes().saturating_mul(2) {
            let line = std::mem::take(&mut self.pending);
            self.emit(&line)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.drain_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_assessment_id() {
        let out = sanitize("Assessment 550e8400-e29b-41d4-a716-446655440000 complete");
        assert!(out.contains("[REDACTED-UUID]"));
        assert!(!out.contains("550e8400"));
    }

    #[test]
    fn test_redacts_identifiers() {
        assert!(sanitize("SSN: 123-45-6789").contains("[REDACTED-SSN]"));
        assert!(sanitize("MRN:12345678 admitted").contains("[REDACTED-MRN]"));
        assert!(sanitize("Contact: patient@hospital.com").contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_redacts_inline_lab_values() {
        let out = sanitize(r#"mapped ast=80 platelet: 150.5 "afp":280 model=legacy"#);
        assert!(out.contains("ast=[REDACTED]"));
        assert!(out.contains("platelet=[REDACTED]"));
        assert!(out.contains("afp=[REDACTED]"));
        assert!(out.contains("model=legacy"));
        assert!(!out.contains("150.5"));
    }

    #[test]
    fn test_leaves_plain_messages_alone() {
        assert_eq!(sanitize("albumin = 3.1"), "albumin=[REDACTED]");
        let plain = "Cirrhosis predictor ready: Enhanced Rule-based Calculation";
        assert_eq!(sanitize(plain), plain);
    }

    #[test]
    fn test_truncates_long_input() {
        let out = sanitize_bounded("ééééé", 3);
        assert_eq!(out, "é [TRUNCATED]");
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter {
                inner: &mut sink,
                pending: Vec::new(),
            };
            writer.write_all(b"inr=1.8\npartial ").expect("write");
            writer.write_all(b"bmi=31\n").expect("write");
            writer.flush().expect("flush");
        }
        let text = String::from_utf8(sink).expect("utf8");
        assert_eq!(text, "inr=[REDACTED]\npartial bmi=[REDACTED]\n");
    }
}
