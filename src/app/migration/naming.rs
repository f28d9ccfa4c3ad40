//! Environment suffix convention for asset ids and names.
//!
//! Assets in each environment carry a trailing `-<ENV>` marker (`sales-DEV`,
//! `sales-UAT`); production assets usually carry none. Migrating swaps the
//! source marker for the target one on ids, names and dataset placeholders.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentNaming {
    pub source_suffix: Option<String>,
    pub target_suffix: Option<String>,
}

impl EnvironmentNaming {
    pub fn new(source_suffix: Option<String>, target_suffix: Option<String>) -> Self {
        let clean = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            source_suffix: clean(source_suffix),
            target_suffix: clean(target_suffix),
        }
    }

    /// True when ids and names are copied unchanged.
    pub fn is_identity(&self) -> bool {
        self.source_suffix == self.target_suffix
    }

    /// Map a source id or name to its target counterpart.
    pub fn map(&self, value: &str) -> String {
        if self.is_identity() {
            return value.to_string();
        }
        let base = match &self.source_suffix {
            Some(suffix) => value
                .strip_suffix(&format!("-{}", suffix))
                .unwrap_or(value),
            None => value,
        };
        match &self.target_suffix {
            Some(suffix) => format!("{}-{}", base, suffix),
            None => base.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming(source: Option<&str>, target: Option<&str>) -> EnvironmentNaming {
        EnvironmentNaming::new(source.map(String::from), target.map(String::from))
    }

    #[test]
    fn test_swaps_suffix() {
        let n = naming(Some("DEV"), Some("UAT"));
        assert_eq!(n.map("sales-DEV"), "sales-UAT");
        assert_eq!(n.map("Sales Dataset-DEV"), "Sales Dataset-UAT");
    }

    #[test]
    fn test_suffix_only_stripped_at_end() {
        let n = naming(Some("DEV"), Some("UAT"));
        assert_eq!(n.map("DEV-sales"), "DEV-sales-UAT");
    }

    #[test]
    fn test_promote_to_main_environment() {
        let n = naming(Some("UAT"), None);
        assert_eq!(n.map("sales-UAT"), "sales");
    }

    #[test]
    fn test_from_main_environment() {
        let n = naming(None, Some("DEV"));
        assert_eq!(n.map("sales"), "sales-DEV");
    }

    #[test]
    fn test_identity_without_suffixes() {
        let n = naming(None, Some(" "));
        assert!(n.is_identity());
        assert_eq!(n.map("sales-DEV"), "sales-DEV");
    }

    #[test]
    fn test_other_markers_are_kept() {
        let n = naming(Some("DEV"), Some("UAT"));
        assert_eq!(n.map("Sales DB-EU"), "Sales DB-EU-UAT");
        assert_eq!(n.map("Revenue-KPI-DEV"), "Revenue-KPI-UAT");
    }
}
