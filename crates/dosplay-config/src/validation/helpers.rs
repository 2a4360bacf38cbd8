//! Shared range-validation helpers.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if a capacity is zero.
pub(crate) fn validate_nonzero(errors: &mut Vec<String>, name: &str, value: usize) {
    if value == 0 {
        errors.push(format!("{name} must be at least 1"));
    }
}
