//! Keyword highlighting for batch scripts.
//!
//! Every rescan walks the whole buffer once per keyword. Matching is literal
//! and case-insensitive, so `set` also lights up inside `setlocal`. Matches of
//! one keyword never overlap each other; matches of different keywords may.

use ratatui::style::Color;
use regex::{Regex, RegexBuilder};
use std::ops::Range;

pub const KEYWORDS: &[&str] = &[
    "pip", "echo", "set", "Title", "else", "for", "goto", "call", "pause", "rem", "::", "start",
    "del", "mkdir", "rmdir", "copy", "move", "exit", "setlocal", "endlocal", "@echo off", "if",
    "cls",
];

pub const KEYWORD_COLOR: Color = Color::Blue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Index into [`KEYWORDS`].
    pub keyword: usize,
    /// Byte range in the scanned text.
    pub range: Range<usize>,
}

pub struct Highlighter {
    patterns: Vec<Regex>,
    tags: Vec<Tag>,
    // Union of all tag ranges, sorted and merged.
    coverage: Vec<Range<usize>>,
}

impl Highlighter {
    pub fn new() -> Self {
        let patterns = KEYWORDS
            .iter()
            .map(|keyword| {
                RegexBuilder::new(&regex::escape(keyword))
                    .case_insensitive(true)
                    .build()
                    .expect("escaped keyword is a valid pattern")
            })
            .collect();
        Self {
            patterns,
            tags: Vec::new(),
            coverage: Vec::new(),
        }
    }

    /// Drops every previous tag and tags all keyword occurrences in `text`.
    pub fn rescan(&mut self, text: &str) {
        self.tags.clear();
        for (keyword, pattern) in self.patterns.iter().enumerate() {
            self.tags.extend(pattern.find_iter(text).map(|m| Tag {
                keyword,
                range: m.range(),
            }));
        }
        self.coverage = merge_ranges(self.tags.iter().map(|t| t.range.clone()).collect());
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn count_for(&self, keyword: &str) -> usize {
        match KEYWORDS.iter().position(|k| *k == keyword) {
            Some(idx) => self.tags.iter().filter(|t| t.keyword == idx).count(),
            None => 0,
        }
    }

    /// Highlighted ranges inside `line_start..line_end`, relative to `line_start`.
    pub fn line_ranges(&self, line_start: usize, line_end: usize) -> Vec<Range<usize>> {
        let first = self.coverage.partition_point(|r| r.end <= line_start);
        self.coverage[first..]
            .iter()
            .take_while(|r| r.start < line_end)
            .map(|r| r.start.max(line_start) - line_start..r.end.min(line_end) - line_start)
            .collect()
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_ranges(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}
