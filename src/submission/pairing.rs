//! Forward/reverse read detection for paired-end uploads.
//!
//! Roles are never stored: they are recomputed from the filename whenever needed.

use std::cmp::Ordering;

/// Direction of a sequencing read file, as far as its name reveals it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadRole {
    /// Forward read.
    R1,
    /// Reverse read.
    R2,
    Unknown,
}

struct RoleRule {
    marker: &'static str,
    role: ReadRole,
}

/// Evaluated top to bottom against the lower-cased filename; first hit wins.
/// `_r` must stay below `_r1`/`_r2` or every forward file would read as reverse.
const ROLE_RULES: &[RoleRule] = &[
    RoleRule { marker: "_r1", role: ReadRole::R1 },
    RoleRule { marker: "_1", role: ReadRole::R1 },
    RoleRule { marker: "_f", role: ReadRole::R1 },
    RoleRule { marker: "_forward", role: ReadRole::R1 },
    RoleRule { marker: "_r2", role: ReadRole::R2 },
    RoleRule { marker: "_2", role: ReadRole::R2 },
    RoleRule { marker: "_r", role: ReadRole::R2 },
    RoleRule { marker: "_reverse", role: ReadRole::R2 },
];

/// Anything that carries an upload filename.
pub trait NamedFile {
    fn file_name(&self) -> &str;
}

impl NamedFile for str {
    fn file_name(&self) -> &str {
        self
    }
}

impl NamedFile for String {
    fn file_name(&self) -> &str {
        self
    }
}

impl<T: NamedFile + ?Sized> NamedFile for &T {
    fn file_name(&self) -> &str {
        (**self).file_name()
    }
}

/// Classify a filename by the first matching marker in [`ROLE_RULES`].
pub fn classify(filename: &str) -> ReadRole {
    let lowered = filename.to_lowercase();
    ROLE_RULES
        .iter()
        .find(|rule| lowered.contains(rule.marker))
        .map(|rule| rule.role)
        .unwrap_or(ReadRole::Unknown)
}

/// Put a forward/reverse pair into canonical order (R1 first).
///
/// Batches of any other size come back untouched, as do pairs whose roles do not
/// decide an order (both unknown, same role, or only one side recognised).
pub fn order<T: NamedFile>(mut files: Vec<T>) -> Vec<T> {
    if files.len() != 2 {
        return files;
    }
    // Stable, so undecided pairs keep their input order.
    files.sort_by(|a, b| compare_roles(classify(a.file_name()), classify(b.file_name())));
    files
}

/// True when the classified roles of `files` are exactly one forward and one reverse read.
pub fn is_complete_pair<T: NamedFile>(files: &[T]) -> bool {
    if files.len() != 2 {
        return false;
    }
    let first = classify(files[0].file_name());
    let second = classify(files[1].file_name());
    matches!(
        (first, second),
        (ReadRole::R1, ReadRole::R2) | (ReadRole::R2, ReadRole::R1)
    )
}

fn compare_roles(a: ReadRole, b: ReadRole) -> Ordering {
    match (a, b) {
        (ReadRole::R1, ReadRole::R2) => Ordering::Less,
        (ReadRole::R2, ReadRole::R1) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_markers_classify_as_r1() {
        for name in [
            "sample_R1.fastq.gz",
            "sample_1.fq.gz",
            "SAMPLE_F.fastq.gz",
            "gut_forward.fastq.gz",
            "lane3_r1_001.fastq.gz",
        ] {
            assert_eq!(classify(name), ReadRole::R1, "{name}");
        }
    }

    #[test]
    fn reverse_markers_classify_as_r2() {
        for name in [
            "sample_R2.fastq.gz",
            "sample_2.fq.gz",
            "sample_R.fastq.gz",
            "gut_Reverse.fastq.gz",
        ] {
            assert_eq!(classify(name), ReadRole::R2, "{name}");
        }
    }

    #[test]
    fn unmarked_names_are_unknown() {
        assert_eq!(classify("sample.fastq.gz"), ReadRole::Unknown);
        assert_eq!(classify("reads-a.fq.gz"), ReadRole::Unknown);
        assert_eq!(classify(""), ReadRole::Unknown);
    }

    #[test]
    fn r1_marker_beats_the_bare_reverse_marker() {
        assert_eq!(classify("x_R1_run.fastq.gz"), ReadRole::R1);
    }

    #[test]
    fn run_suffix_is_read_as_reverse() {
        // Heuristic limitation kept on purpose: `_run2` contains `_r`.
        assert_eq!(classify("sample_run2.fastq.gz"), ReadRole::R2);
    }

    #[test]
    fn pair_is_reordered_forward_first() {
        let ordered = order(vec!["sample_R2.fastq.gz", "sample_R1.fastq.gz"]);
        assert_eq!(ordered, vec!["sample_R1.fastq.gz", "sample_R2.fastq.gz"]);

        let ordered = order(vec!["sample_R1.fastq.gz", "sample_R2.fastq.gz"]);
        assert_eq!(ordered, vec!["sample_R1.fastq.gz", "sample_R2.fastq.gz"]);
    }

    #[test]
    fn undecided_pairs_keep_input_order() {
        let unknown = order(vec!["b.fastq.gz", "a.fastq.gz"]);
        assert_eq!(unknown, vec!["b.fastq.gz", "a.fastq.gz"]);

        let same_role = order(vec!["x_R2.fastq.gz", "y_2.fastq.gz"]);
        assert_eq!(same_role, vec!["x_R2.fastq.gz", "y_2.fastq.gz"]);

        let half_known = order(vec!["reads.fastq.gz", "reads_R1.fastq.gz"]);
        assert_eq!(half_known, vec!["reads.fastq.gz", "reads_R1.fastq.gz"]);
    }

    #[test]
    fn other_batch_sizes_are_untouched() {
        let single = order(vec!["s_R2.fastq.gz"]);
        assert_eq!(single, vec!["s_R2.fastq.gz"]);

        let three = order(vec!["c_R2.fq.gz", "b_R1.fq.gz", "a_R2.fq.gz"]);
        assert_eq!(three, vec!["c_R2.fq.gz", "b_R1.fq.gz", "a_R2.fq.gz"]);

        let empty: Vec<&str> = order(Vec::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn complete_pair_needs_both_roles() {
        assert!(is_complete_pair(&["a_R2.fq.gz", "a_R1.fq.gz"]));
        assert!(!is_complete_pair(&["a.fq.gz", "b.fq.gz"]));
        assert!(!is_complete_pair(&["a_R1.fq.gz", "b_1.fq.gz"]));
        assert!(!is_complete_pair(&["a_R1.fq.gz"]));
    }
}
