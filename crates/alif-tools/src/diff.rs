//! Character-level diff of serialized glyph runs, rendered as HTML.
//!
//! Matching follows the longest-matching-block approach: find the longest
//! common block, recurse on both sides, then turn the matching blocks into
//! edit opcodes. Separator characters of the serialization are treated as
//! junk so that blocks are anchored on glyph names and numbers.

use std::collections::{HashMap, HashSet};

/// Characters that never start a matching block.
const JUNK: [char; 5] = ['|', '+', '=', '@', ','];

/// Sequences at least this long drop very common characters from matching.
const AUTOJUNK_MIN_LEN: usize = 200;

/// An edit operation between `a[a0..a1]` and `b[b0..b1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// The ranges are identical.
    Equal {
        /// Range start in `a`.
        a0: usize,
        /// Range end in `a`.
        a1: usize,
        /// Range start in `b`.
        b0: usize,
        /// Range end in `b`.
        b1: usize,
    },
    /// `a[a0..a1]` should be replaced by `b[b0..b1]`; either may be empty.
    Change {
        /// Range start in `a`.
        a0: usize,
        /// Range end in `a`.
        a1: usize,
        /// Range start in `b`.
        b0: usize,
        /// Range end in `b`.
        b1: usize,
    },
}

/// Sequence matcher over two character sequences.
#[derive(Debug)]
pub struct SequenceMatcher {
    a: Vec<char>,
    b: Vec<char>,
    b2j: HashMap<char, Vec<usize>>,
    junk: HashSet<char>,
}

impl SequenceMatcher {
    /// Prepare matching of `a` against `b`; `is_junk` marks characters of `b`
    /// that may not anchor a match.
    #[must_use]
    pub fn new(a: &str, b: &str, is_junk: impl Fn(char) -> bool) -> Self {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();

        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }

        let junk: HashSet<char> = b2j.keys().copied().filter(|&c| is_junk(c)).collect();
        for c in &junk {
            b2j.remove(c);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let popular_limit = n / 100 + 1;
            b2j.retain(|_, indices| indices.len() <= popular_limit);
        }

        Self { a, b, b2j, junk }
    }

    fn is_junk(&self, c: char) -> bool {
        self.junk.contains(&c)
    }

    /// Longest matching block in `a[alo..ahi]` and `b[blo..bhi]` as
    /// `(i, j, size)`.
    fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (a, b) = (&self.a, &self.b);
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut new_j2len = HashMap::new();
            if let Some(indices) = self.b2j.get(c) {
                for &j in indices {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Extend with non-junk matches that were skipped as popular, then
        // with junk on either side.
        for junk in [false, true] {
            while best_i > alo
                && best_j > blo
                && self.is_junk(b[best_j - 1]) == junk
                && a[best_i - 1] == b[best_j - 1]
            {
                best_i -= 1;
                best_j -= 1;
                best_size += 1;
            }
            while best_i + best_size < ahi
                && best_j + best_size < bhi
                && self.is_junk(b[best_j + best_size]) == junk
                && a[best_i + best_size] == b[best_j + best_size]
            {
                best_size += 1;
            }
        }

        (best_i, best_j, best_size)
    }

    /// Matching blocks as `(i, j, size)`, ending with a `(len_a, len_b, 0)`
    /// sentinel.
    #[must_use]
    pub fn matching_blocks(&self) -> Vec<(usize, usize, usize)> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k > 0 {
                blocks.push((i, j, k));
                if alo < i && blo < j {
                    queue.push((alo, i, blo, j));
                }
                if i + k < ahi && j + k < bhi {
                    queue.push((i + k, ahi, j + k, bhi));
                }
            }
        }
        blocks.sort_unstable();

        // Merge adjacent blocks.
        let mut merged: Vec<(usize, usize, usize)> = Vec::with_capacity(blocks.len() + 1);
        for (i, j, k) in blocks {
            if let Some(last) = merged.last_mut() {
                if last.0 + last.2 == i && last.1 + last.2 == j {
                    last.2 += k;
                    continue;
                }
            }
            merged.push((i, j, k));
        }
        merged.push((la, lb, 0));
        merged
    }

    /// Edit opcodes turning `a` into `b`.
    #[must_use]
    pub fn opcodes(&self) -> Vec<Opcode> {
        let (mut i, mut j) = (0, 0);
        let mut opcodes = Vec::new();
        for (ai, bj, size) in self.matching_blocks() {
            if i < ai || j < bj {
                opcodes.push(Opcode::Change {
                    a0: i,
                    a1: ai,
                    b0: j,
                    b1: bj,
                });
            }
            i = ai + size;
            j = bj + size;
            if size > 0 {
                opcodes.push(Opcode::Equal {
                    a0: ai,
                    a1: i,
                    b0: bj,
                    b1: j,
                });
            }
        }
        opcodes
    }
}

fn slice(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end].iter().collect()
}

/// HTML diff of an expected (`old`) and actual (`new`) serialization.
///
/// Changed spans are wrapped in `<del>` on the expected line and `<ins>` on
/// the actual line.
#[must_use]
pub fn diff(old: &str, new: &str) -> String {
    let matcher = SequenceMatcher::new(new, old, |c| JUNK.contains(&c));
    let old_chars: Vec<char> = old.chars().collect();
    let new_chars: Vec<char> = new.chars().collect();

    let mut old_out = String::new();
    let mut new_out = String::new();
    for opcode in matcher.opcodes() {
        match opcode {
            Opcode::Equal { a0, a1, b0, b1 } => {
                old_out.push_str(&slice(&old_chars, b0, b1));
                new_out.push_str(&slice(&new_chars, a0, a1));
            }
            Opcode::Change { a0, a1, b0, b1 } => {
                old_out.push_str("<del>");
                old_out.push_str(&slice(&old_chars, b0, b1));
                old_out.push_str("</del>");
                new_out.push_str("<ins>");
                new_out.push_str(&slice(&new_chars, a0, a1));
                new_out.push_str("</ins>");
            }
        }
    }

    format!(
        "<pre><span class='expected'>{old_out}</span>\n<span class='actual'>{new_out}</span></pre>"
    )
}
