//! Cleanup configuration.

/// Options controlling how generated files are removed.
#[derive(Clone, Debug, Default)]
pub struct CleanOptions {
    /// Whether to move `node_modules/` to the system trash instead of
    /// permanently deleting it.
    ///
    /// Defaults to `false`. Enable with `--trash` or `use_trash = true` in
    /// the `[clean]` section of the config file.
    pub use_trash: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_options_default() {
        assert!(!CleanOptions::default().use_trash);
    }
}
