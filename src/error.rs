use thiserror::Error;

/// Load-level failures. Everything below this level (unparseable timestamps,
/// malformed embedded JSON, non-numeric ages) degrades to `None`/empty in the
/// normalizers instead of erroring.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("required sheet not found: {name}")]
    MissingSheet { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sheet_names_the_sheet() {
        let err = LoadError::MissingSheet {
            name: "diagnosis".into(),
        };
        assert_eq!(err.to_string(), "required sheet not found: diagnosis");
    }
}
