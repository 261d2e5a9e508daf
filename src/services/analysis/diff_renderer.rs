// Diff Renderer
// Word-level alignment between an original paragraph and its neutral rewrite

use std::collections::HashMap;

const INSERTED_OPEN: &str = "<span class='inserted'>";
const DELETED_OPEN: &str = "<span class='deleted'>";
const SPAN_CLOSE: &str = "</span>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Insert,
    Delete,
    Replace,
}

/// One aligned run: `a[a_start..a_end]` maps onto `b[b_start..b_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Match {
    a: usize,
    b: usize,
    size: usize,
}

/// Longest-contiguous-block matcher (Ratcliff/Obershelp), no junk heuristics.
struct SequenceMatcher<'a> {
    a: &'a [&'a str],
    b: &'a [&'a str],
    b2j: HashMap<&'a str, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [&'a str], b: &'a [&'a str]) -> Self {
        let mut b2j: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (j, word) in b.iter().enumerate() {
            b2j.entry(*word).or_default().push(j);
        }
        Self { a, b, b2j }
    }

    /// Longest equal block inside `a[alo..ahi]` x `b[blo..bhi]`.
    ///
    /// Ties go to the block starting earliest in `a`, then earliest in `b`.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let mut best = Match {
            a: alo,
            b: blo,
            size: 0,
        };
        // j2len[j] = length of the match ending at a[i-1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(self.a[i]) {
                for &j in positions {
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
                    next.insert(j, k);
                    if k > best.size {
                        best = Match {
                            a: i + 1 - k,
                            b: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            j2len = next;
        }
        best
    }

    fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.size < ahi && m.b + m.size < bhi {
                queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
            }
            blocks.push(m);
        }
        blocks.sort();

        // Collapse adjacent blocks so equal runs are reported once.
        let mut merged: Vec<Match> = Vec::with_capacity(blocks.len() + 1);
        for m in blocks {
            if let Some(last) = merged.last_mut() {
                if last.a + last.size == m.a && last.b + last.size == m.b {
                    last.size += m.size;
                    continue;
                }
            }
            merged.push(m);
        }
        merged.push(Match {
            a: la,
            b: lb,
            size: 0,
        });
        merged
    }

    fn opcodes(&self) -> Vec<Opcode> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);
        for m in self.matching_blocks() {
            let tag = match (i < m.a, j < m.b) {
                (true, true) => Some(OpTag::Replace),
                (true, false) => Some(OpTag::Delete),
                (false, true) => Some(OpTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode {
                    tag,
                    a_start: i,
                    a_end: m.a,
                    b_start: j,
                    b_end: m.b,
                });
            }
            i = m.a + m.size;
            j = m.b + m.size;
            if m.size > 0 {
                ops.push(Opcode {
                    tag: OpTag::Equal,
                    a_start: m.a,
                    a_end: i,
                    b_start: m.b,
                    b_end: j,
                });
            }
        }
        ops
    }
}

/// Opcode alignment between two word sequences.
pub fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    SequenceMatcher::new(a, b).opcodes()
}

/// Render a word diff of `original` -> `edited` with inserted/deleted spans.
///
/// Replaced runs emit the deleted words before the inserted ones. Fragments are joined with
/// single spaces.
pub fn html_diff(original: &str, edited: &str) -> String {
    let orig_words: Vec<&str> = original.split_whitespace().collect();
    let edit_words: Vec<&str> = edited.split_whitespace().collect();

    let mut output: Vec<String> = Vec::new();
    for op in opcodes(&orig_words, &edit_words) {
        let removed = orig_words[op.a_start..op.a_end].join(" ");
        let added = edit_words[op.b_start..op.b_end].join(" ");
        match op.tag {
            OpTag::Equal => output.push(added),
            OpTag::Insert => output.push(format!("{}{}{}", INSERTED_OPEN, added, SPAN_CLOSE)),
            OpTag::Delete => output.push(format!("{}{}{}", DELETED_OPEN, removed, SPAN_CLOSE)),
            OpTag::Replace => {
                output.push(format!("{}{}{}", DELETED_OPEN, removed, SPAN_CLOSE));
                output.push(format!("{}{}{}", INSERTED_OPEN, added, SPAN_CLOSE));
            }
        }
    }
    output.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    /// Drop deleted spans and unwrap inserted ones, leaving the edited words.
    fn strip_markup(diff: &str) -> Vec<String> {
        let deleted = Regex::new(r"<span class='deleted'>[^<]*</span>").unwrap();
        let without_deleted = deleted.replace_all(diff, " ");
        without_deleted
            .replace(INSERTED_OPEN, " ")
            .replace(SPAN_CLOSE, " ")
            .split_whitespace()
            .map(|w| w.to_string())
            .collect()
    }

    #[test]
    fn test_scenario_dog_and_mat() {
        let diff = html_diff("The dog sat on the mat.", "The big dog sat on the red rug.");
        assert_eq!(
            diff,
            "The <span class='inserted'>big</span> dog sat on the \
             <span class='deleted'>mat.</span> <span class='inserted'>red rug.</span>"
        );
    }

    #[test]
    fn test_identical_text_has_no_markup() {
        let text = "Markets rose slightly on Tuesday after the report.";
        assert_eq!(html_diff(text, text), text);
        assert_eq!(html_diff("a   b\tc", "a b c"), "a b c");
    }

    #[test]
    fn test_pure_delete_and_insert() {
        assert_eq!(
            html_diff("the very bad plan", "the plan"),
            "the <span class='deleted'>very bad</span> plan"
        );
        assert_eq!(html_diff("", "new words"), "<span class='inserted'>new words</span>");
        assert_eq!(html_diff("old words", ""), "<span class='deleted'>old words</span>");
        assert_eq!(html_diff("", ""), "");
    }

    #[test]
    fn test_strip_markup_reconstructs_edited() {
        let cases = [
            ("The dog sat on the mat.", "The big dog sat on the red rug."),
            (
                "Radical politicians are destroying everything we love.",
                "Politicians are changing several policies.",
            ),
            ("a b c d e f", "f e d c b a"),
            ("one two two three", "two one three three"),
            ("", "fresh text"),
            ("gone", ""),
        ];
        for (original, edited) in cases {
            let diff = html_diff(original, edited);
            let expected: Vec<String> = edited.split_whitespace().map(|w| w.to_string()).collect();
            assert_eq!(strip_markup(&diff), expected, "diff was {:?}", diff);
        }
    }

    #[test]
    fn test_opcodes_cover_both_sequences() {
        let a = ["x", "a", "b", "y", "c"];
        let b = ["a", "b", "z", "c", "w"];
        let ops = opcodes(&a, &b);
        let mut i = 0;
        let mut j = 0;
        for op in &ops {
            assert_eq!(op.a_start, i);
            assert_eq!(op.b_start, j);
            i = op.a_end;
            j = op.b_end;
        }
        assert_eq!((i, j), (a.len(), b.len()));
        assert_eq!(ops[0].tag, OpTag::Delete);
        assert_eq!(ops[1].tag, OpTag::Equal);
    }

    #[test]
    fn test_longest_block_preferred() {
        let a = ["p", "q", "r", "s", "t"];
        let b = ["q", "r", "s", "p"];
        let ops = opcodes(&a, &b);
        let equal: Vec<&Opcode> = ops.iter().filter(|o| o.tag == OpTag::Equal).collect();
        assert_eq!(equal.len(), 1);
        assert_eq!((equal[0].a_start, equal[0].a_end), (1, 4));
    }
}
