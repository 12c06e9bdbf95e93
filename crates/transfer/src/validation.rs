use crate::TransferError;

/// Validates a relative object name before it is announced for upload.
///
/// Multi-file platforms encode their directory structure in the object
/// name, so a name must be a `/`-separated relative path that stays
/// below the bundle root: no leading `/`, no backslashes, no empty,
/// `.` or `..` segments.
pub fn validate_object_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty name".into()));
    }
    if name.starts_with('/') {
        return Err(TransferError::InvalidName(format!(
            "absolute name not allowed: {name}"
        )));
    }
    if name.contains('\\') {
        return Err(TransferError::InvalidName(format!(
            "backslash not allowed: {name}"
        )));
    }

    for segment in name.split('/') {
        match segment {
            "" => {
                return Err(TransferError::InvalidName(format!(
                    "empty segment in {name}"
                )));
            }
            "." | ".." => {
                return Err(TransferError::InvalidName(format!(
                    "relative segment `{segment}` in {name}"
                )));
            }
            _ => {}
        }
    }

    Ok(())
}
