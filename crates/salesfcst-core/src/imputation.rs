//! Missing value imputation for loaded sales columns.

/// Fill missing cells with the last observed value (forward fill / LOCF).
///
/// Leading gaps stay `None` since there is nothing to carry forward.
pub fn fill_forward<T: Clone>(values: &[Option<T>]) -> Vec<Option<T>> {
    let mut result = Vec::with_capacity(values.len());
    let mut last_value: Option<T> = None;

    for v in values {
        match v {
            Some(x) => {
                last_value = Some(x.clone());
                result.push(Some(x.clone()));
            }
            None => {
                result.push(last_value.clone());
            }
        }
    }

    result
}

/// Forward fill a column of text cells in place, treating blank cells as missing.
pub fn fill_forward_text(values: &mut [Option<String>]) {
    let mut last_value: Option<String> = None;
    for v in values.iter_mut() {
        match v {
            Some(s) if !s.trim().is_empty() => last_value = Some(s.clone()),
            _ => *v = last_value.clone(),
        }
    }
}
