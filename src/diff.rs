//! Line-based unified diff between two snapshots.

use std::fmt;

/// Header every rendered diff starts with
pub const DIFF_HEADER: &str = "--- Original\n+++ New\n";

/// Unchanged lines kept around each change
const CONTEXT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Removed(String),
    Added(String),
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffLine::Context(line) => write!(f, " {}", line),
            DiffLine::Removed(line) => write!(f, "-{}", line),
            DiffLine::Added(line) => write!(f, "+{}", line),
        }
    }
}

/// One `@@` block. Starts are 1-based like `diff -u`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "@@ -{} +{} @@",
            range(self.old_start, self.old_len),
            range(self.new_start, self.new_len)
        )?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

fn range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{},0", start.saturating_sub(1)),
        1 => start.to_string(),
        _ => format!("{},{}", start, len),
    }
}

/// Difference between an original and a new text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineDiff {
    pub hunks: Vec<Hunk>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal(usize),
    Delete(usize),
    Insert(usize),
}

impl LineDiff {
    pub fn compute(original: &str, new: &str) -> Self {
        let old_lines: Vec<&str> = original.lines().collect();
        let new_lines: Vec<&str> = new.lines().collect();
        let edits = shortest_edit(&old_lines, &new_lines);

        Self {
            hunks: build_hunks(&edits, &old_lines, &new_lines),
        }
    }

    /// No line was added or removed
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    pub fn added(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Added(_)))
    }

    pub fn removed(&self) -> usize {
        self.count(|l| matches!(l, DiffLine::Removed(_)))
    }

    fn count(&self, pred: impl Fn(&DiffLine) -> bool) -> usize {
        self.hunks
            .iter()
            .flat_map(|h| h.lines.iter())
            .filter(|l| pred(l))
            .count()
    }

    /// Render as unified diff text. An empty diff renders as the bare header.
    pub fn to_unified(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LineDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(DIFF_HEADER)?;
        for hunk in &self.hunks {
            write!(f, "{}", hunk)?;
        }
        Ok(())
    }
}

/// Myers' O(ND) shortest edit script, in forward order
fn shortest_edit(a: &[&str], b: &[&str]) -> Vec<Edit> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = (n + m) as usize;
    if max == 0 {
        return Vec::new();
    }

    let offset = max as isize;
    let mut v = vec![0isize; 2 * max + 2];
    // Frontier d only keeps diagonals -d..=d+1, the ones the walk back reads,
    // so the trace grows as O(D^2) instead of O((N+M)*D)
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let idx = |k: isize| (k + offset) as usize;

    'search: for d in 0..=max as isize {
        trace.push(v[idx(-d)..=idx(d + 1)].to_vec());
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the recorded frontiers back from (n, m)
    let mut edits = Vec::new();
    let (mut x, mut y) = (n, m);
    for (d, frontier) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let at = |k: isize| frontier[(k + d) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            edits.push(Edit::Equal(x as usize));
        }

        if d > 0 {
            if x == prev_x {
                edits.push(Edit::Insert((y - 1) as usize));
            } else {
                edits.push(Edit::Delete((x - 1) as usize));
            }
        }

        x = prev_x;
        y = prev_y;
    }

    edits.reverse();
    edits
}

/// Group edits into hunks with `CONTEXT` lines around each change
fn build_hunks(edits: &[Edit], old: &[&str], new: &[&str]) -> Vec<Hunk> {
    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, e)| !matches!(e, Edit::Equal(_)))
        .map(|(i, _)| i)
        .collect();

    let Some(&first) = changes.first() else {
        return Vec::new();
    };

    // Line positions before each edit
    let mut positions = Vec::with_capacity(edits.len());
    let (mut old_pos, mut new_pos) = (0usize, 0usize);
    for edit in edits {
        positions.push((old_pos, new_pos));
        match edit {
            Edit::Equal(_) => {
                old_pos += 1;
                new_pos += 1;
            }
            Edit::Delete(_) => old_pos += 1,
            Edit::Insert(_) => new_pos += 1,
        }
    }

    let mut groups = Vec::new();
    let (mut start, mut end) = (first, first);
    for &change in &changes[1..] {
        if change - end - 1 <= 2 * CONTEXT {
            end = change;
        } else {
            groups.push((start, end));
            start = change;
            end = change;
        }
    }
    groups.push((start, end));

    groups
        .into_iter()
        .map(|(first_change, last_change)| {
            let lo = first_change.saturating_sub(CONTEXT);
            let hi = (last_change + CONTEXT).min(edits.len() - 1);
            let (old_start, new_start) = positions[lo];

            let mut hunk = Hunk {
                old_start: old_start + 1,
                old_len: 0,
                new_start: new_start + 1,
                new_len: 0,
                lines: Vec::with_capacity(hi - lo + 1),
            };

            for edit in &edits[lo..=hi] {
                match *edit {
                    Edit::Equal(i) => {
                        hunk.old_len += 1;
                        hunk.new_len += 1;
                        hunk.lines.push(DiffLine::Context(old[i].to_string()));
                    }
                    Edit::Delete(i) => {
                        hunk.old_len += 1;
                        hunk.lines.push(DiffLine::Removed(old[i].to_string()));
                    }
                    Edit::Insert(i) => {
                        hunk.new_len += 1;
                        hunk.lines.push(DiffLine::Added(new[i].to_string()));
                    }
                }
            }

            hunk
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_texts_are_empty() {
        let diff = LineDiff::compute("A 1.1.1.1\n", "A 1.1.1.1\n");
        assert!(diff.is_empty());
        assert_eq!(diff.to_unified(), DIFF_HEADER);

        assert!(LineDiff::compute("", "").is_empty());
    }

    #[test]
    fn test_single_line_change() {
        let diff = LineDiff::compute("A 1.1.1.1\n", "A 1.1.1.2\n");
        assert!(!diff.is_empty());
        assert_eq!(diff.added(), 1);
        assert_eq!(diff.removed(), 1);
        assert_eq!(
            diff.to_unified(),
            "--- Original\n+++ New\n@@ -1 +1 @@\n-A 1.1.1.1\n+A 1.1.1.2\n"
        );
    }

    #[test]
    fn test_context_is_limited() {
        let original = "1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n";
        let new = "1\n2\n3\n4\n5\nsix\n7\n8\n9\n10\n";
        let diff = LineDiff::compute(original, new);

        assert_eq!(diff.hunks.len(), 1);
        assert_eq!(
            diff.to_unified(),
            "--- Original\n+++ New\n@@ -3,7 +3,7 @@\n 3\n 4\n 5\n-6\n+six\n 7\n 8\n 9\n"
        );
    }

    #[test]
    fn test_distant_changes_split_hunks() {
        let original: String = (1..=20).map(|i| format!("{}\n", i)).collect();
        let new: String = (1..=20)
            .map(|i| match i {
                2 => "two\n".to_string(),
                19 => "nineteen\n".to_string(),
                _ => format!("{}\n", i),
            })
            .collect();
        let diff = LineDiff::compute(&original, &new);

        assert_eq!(diff.hunks.len(), 2);
        assert_eq!(diff.hunks[0].old_start, 1);
        assert_eq!(diff.hunks[1].old_start, 16);
        assert_eq!(diff.removed(), 2);
        assert_eq!(diff.added(), 2);
    }

    #[test]
    fn test_pure_insert_and_delete() {
        let diff = LineDiff::compute("", "new line\n");
        assert_eq!(diff.to_unified(), "--- Original\n+++ New\n@@ -0,0 +1 @@\n+new line\n");

        let diff = LineDiff::compute("a\nb\n", "a\n");
        assert_eq!(diff.to_unified(), "--- Original\n+++ New\n@@ -1,2 +1 @@\n a\n-b\n");
    }

    #[test]
    fn test_ordering_change_is_detected() {
        let diff = LineDiff::compute("a\nb\n", "b\na\n");
        assert!(!diff.is_empty());
        assert_eq!(diff.added(), 1);
        assert_eq!(diff.removed(), 1);
    }

    #[test]
    fn test_many_scattered_changes() {
        let original: String = (0..300).map(|i| format!("line {}\n", i)).collect();
        let new: String = (0..300)
            .map(|i| {
                if i % 3 == 0 {
                    format!("changed {}\n", i)
                } else {
                    format!("line {}\n", i)
                }
            })
            .collect();
        let diff = LineDiff::compute(&original, &new);

        assert_eq!(diff.removed(), 100);
        assert_eq!(diff.added(), 100);
        let text = diff.to_unified();
        assert!(text.contains("\n-line 297\n"));
        assert!(text.contains("\n+changed 297\n"));
        assert!(!text.contains("-line 298\n"));
    }
}
