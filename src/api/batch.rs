use std::io::{BufRead, Write};

use tracing::{debug, info};

use super::error::{LpmError, Result};
use super::parser::{parse_count, parse_entry, parse_query, NO_MATCH};
use super::routing_trie::PrefixTrie;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub entries: usize,
    pub queries: usize,
    pub matched: usize,
}

/// Hands out non-blank lines together with their 1-based line numbers.
struct Lines<R> {
    input: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> Lines<R> {
    fn new(input: R) -> Self {
        Lines { input, line_no: 0, buf: String::new() }
    }

    fn next_line(&mut self, expected: &str) -> Result<(usize, &str)> {
        loop {
            self.buf.clear();
            if self.input.read_line(&mut self.buf)? == 0 {
                return Err(LpmError::unexpected_eof(expected));
            }
            self.line_no += 1;
            if !self.buf.trim().is_empty() {
                return Ok((self.line_no, self.buf.as_str()));
            }
        }
    }
}

/// Run the line protocol: a count and that many `a.b.c.d/mask routing`
/// lines, then a count and that many query addresses. Writes one line per
/// query with the matched routing number, or -1.
pub fn run<R: BufRead, W: Write>(input: R, mut output: W) -> Result<BatchSummary> {
    let mut lines = Lines::new(input);
    let mut summary = BatchSummary::default();

    let (line_no, line) = lines.next_line("entry count")?;
    let n = parse_count(line_no, line)?;

    let mut trie = PrefixTrie::new();
    for i in 0..n {
        let (line_no, line) = lines.next_line(&format!("entry {} of {}", i + 1, n))?;
        let entry = parse_entry(line_no, line)?;
        if let Some(old) = trie.insert_prefix(entry.prefix, entry.routing_number)? {
            debug!(line = line_no, prefix = %entry.prefix, old, "duplicate prefix, last entry wins");
        }
        summary.entries += 1;
    }
    let snapshot = trie.freeze();
    info!(entries = summary.entries, routes = snapshot.len(), "routing table built");

    let (line_no, line) = lines.next_line("query count")?;
    let m = parse_count(line_no, line)?;

    for i in 0..m {
        let (line_no, line) = lines.next_line(&format!("query {} of {}", i + 1, m))?;
        let addr = parse_query(line_no, line)?;
        let result = snapshot.lookup_addr(addr);
        if result.is_some() {
            summary.matched += 1;
        }
        writeln!(output, "{}", result.unwrap_or(NO_MATCH))?;
        summary.queries += 1;
    }
    output.flush()?;

    info!(queries = summary.queries, matched = summary.matched, "lookups answered");
    Ok(summary)
}
