use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The underlying line source failed. This is a collaborator problem
    /// (truncated pull, unreadable file), not format drift, so it is
    /// surfaced instead of swallowed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Two records of the same identity disagree on a field value.
    #[error("merge conflict on field `{field}`: {left} != {right}")]
    MergeConflict {
        field: &'static str,
        left: String,
        right: String,
    },

    /// A zipped bugreport could not be opened or scanned.
    #[error("failed to read bugreport archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
}

impl ParseError {
    pub fn conflict(
        field: &'static str,
        left: impl ToString,
        right: impl ToString,
    ) -> Self {
        ParseError::MergeConflict {
            field,
            left: left.to_string(),
            right: right.to_string(),
        }
    }
}

/// Merge one optional field, preferring whichever side is set. Both sides
/// set to different values is a conflict.
pub fn merge_field<T: PartialEq + Clone + std::fmt::Debug>(
    field: &'static str,
    left: &Option<T>,
    right: &Option<T>,
) -> Result<Option<T>, ParseError> {
    match (left, right) {
        (Some(a), Some(b)) if a != b => Err(ParseError::MergeConflict {
            field,
            left: format!("{a:?}"),
            right: format!("{b:?}"),
        }),
        (Some(a), _) => Ok(Some(a.clone())),
        (_, Some(b)) => Ok(Some(b.clone())),
        (None, None) => Ok(None),
    }
}

/// Merge one list-valued field. An empty side yields to the other; two
/// non-empty lists must be equal.
pub fn merge_list<T: PartialEq + Clone>(
    field: &'static str,
    left: &[T],
    right: &[T],
) -> Result<Vec<T>, ParseError> {
    match (left.is_empty(), right.is_empty()) {
        (true, _) => Ok(right.to_vec()),
        (_, true) => Ok(left.to_vec()),
        _ if left == right => Ok(left.to_vec()),
        _ => Err(ParseError::conflict(field, left.len(), right.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_field_prefers_set_side() {
        let merged = merge_field("pid", &Some(12), &None).expect("merge");
        assert_eq!(merged, Some(12));
        let merged = merge_field("pid", &None, &Some(34)).expect("merge");
        assert_eq!(merged, Some(34));
    }

    #[test]
    fn merge_field_keeps_agreeing_values() {
        let merged = merge_field("app", &Some("com.foo"), &Some("com.foo")).expect("merge");
        assert_eq!(merged, Some("com.foo"));
    }

    #[test]
    fn merge_field_rejects_conflicts() {
        let err = merge_field("pid", &Some(1), &Some(2)).expect_err("conflict");
        match err {
            ParseError::MergeConflict { field, .. } => assert_eq!(field, "pid"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn merge_list_yields_to_the_non_empty_side() {
        let merged = merge_list("packages", &["com.foo".to_string()], &[]).expect("merge");
        assert_eq!(merged, vec!["com.foo".to_string()]);
        let merged = merge_list::<String>("packages", &[], &[]).expect("merge");
        assert!(merged.is_empty());
    }

    #[test]
    fn merge_list_rejects_differing_non_empty_lists() {
        let err = merge_list("packages", &["a"], &["a", "b"]).expect_err("conflict");
        match err {
            ParseError::MergeConflict { field, .. } => assert_eq!(field, "packages"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
