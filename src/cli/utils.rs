use simple_error::{SimpleResult, bail};

/// Check a required input filename
///
/// Assumes no logger has been configured yet
///
pub fn check_required_filename(filename: &str, label: &str) -> SimpleResult<()> {
    if filename.is_empty() {
        bail!("Must specify {} file", label);
    }
    let path = std::path::Path::new(&filename);
    if !path.exists() {
        bail!("Can't find specified {} file: '{}'", label, filename);
    }
    if !path.is_file() {
        bail!(
            "Specified {} file path does not appear to be a file: '{}'",
            label,
            filename
        );
    }
    Ok(())
}
