//! Section classification.
//!
//! Pure mapping from a canonical URL's path to organizational labels:
//! configured path-prefix overrides win, otherwise the first non-empty path
//! segment is the section and the second the subsection. No I/O.

use url::Url;

use crate::config::SectionsConfig;

/// Derived organizational labels for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Empty string for pages at the site root.
    pub section: String,
    pub subsection: Option<String>,
}

pub struct SectionClassifier {
    overrides: Vec<(String, String, Option<String>)>,
}

impl SectionClassifier {
    pub fn from_config(config: &SectionsConfig) -> Self {
        let overrides = config
            .overrides
            .iter()
            .map(|o| (o.prefix.clone(), o.section.clone(), o.subsection.clone()))
            .collect();
        Self { overrides }
    }

    pub fn classify(&self, url: &str) -> Classification {
        let path = Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_default();

        for (prefix, section, subsection) in &self.overrides {
            if path.starts_with(prefix.as_str()) {
                return Classification {
                    section: section.clone(),
                    subsection: subsection.clone(),
                };
            }
        }

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let section = segments.next().unwrap_or("").to_string();
        let subsection = segments.next().map(|s| s.to_string());

        Classification {
            section,
            subsection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectionOverride;

    fn classifier(overrides: Vec<SectionOverride>) -> SectionClassifier {
        SectionClassifier::from_config(&SectionsConfig { overrides })
    }

    #[test]
    fn test_segments_become_labels() {
        let c = classifier(vec![]);
        let got = c.classify("https://docs.example.com/guides/install/linux");
        assert_eq!(got.section, "guides");
        assert_eq!(got.subsection.as_deref(), Some("install"));
    }

    #[test]
    fn test_single_segment_has_no_subsection() {
        let c = classifier(vec![]);
        let got = c.classify("https://docs.example.com/reference");
        assert_eq!(got.section, "reference");
        assert_eq!(got.subsection, None);
    }

    #[test]
    fn test_root_page_has_empty_section() {
        let c = classifier(vec![]);
        let got = c.classify("https://docs.example.com/");
        assert_eq!(got.section, "");
        assert_eq!(got.subsection, None);
    }

    #[test]
    fn test_override_checked_first() {
        let c = classifier(vec![SectionOverride {
            prefix: "/v2/api".to_string(),
            section: "reference".to_string(),
            subsection: Some("api".to_string()),
        }]);
        let got = c.classify("https://docs.example.com/v2/api/errors");
        assert_eq!(got.section, "reference");
        assert_eq!(got.subsection.as_deref(), Some("api"));

        // Non-matching paths fall through to the segment rule.
        let other = c.classify("https://docs.example.com/v2/guides");
        assert_eq!(other.section, "v2");
        assert_eq!(other.subsection.as_deref(), Some("guides"));
    }

    #[test]
    fn test_deterministic() {
        let c = classifier(vec![]);
        let a = c.classify("https://docs.example.com/guides/install");
        let b = c.classify("https://docs.example.com/guides/install");
        assert_eq!(a, b);
    }
}
