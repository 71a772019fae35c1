//! Filter resolution
//!
//! The registry is the polymorphic dispatch point of the engine: given an
//! input extension it decides which configured filter (if any) handles it,
//! deterministically, in configuration order.

use crate::config::MirrorConfig;
use crate::database::FilterBinding;

use super::descriptor::FilterDescriptor;

/// How a source file will be mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A filter converts the file, changing its extension
    Convert {
        /// The winning filter's executable reference
        filter: String,
        /// The extension of the produced artifact
        output_extension: String,
    },
    /// No filter claims the extension; copy byte-for-byte
    Verbatim,
    /// No filter claims the extension and unmatched files are skipped
    Skip,
}

impl Resolution {
    /// The filter binding a record gets for this resolution.
    pub fn binding(&self) -> FilterBinding {
        match self {
            Self::Convert { filter, .. } => FilterBinding::Converted {
                name: filter.clone(),
            },
            Self::Verbatim => FilterBinding::Verbatim,
            Self::Skip => FilterBinding::Ignored,
        }
    }
}

/// The set of configured filters for one mirror, in precedence order.
pub struct FilterRegistry {
    filters: Vec<FilterDescriptor>,
    skip_unmatched: bool,
}

impl FilterRegistry {
    /// Build the registry from a mirror's configuration.
    pub fn from_config(config: &MirrorConfig) -> Self {
        Self {
            filters: config.filters.iter().map(FilterDescriptor::new).collect(),
            skip_unmatched: config.skip_unmatched,
        }
    }

    /// Resolve an input extension to a conversion decision.
    ///
    /// When several configured filters claim the same extension, the first
    /// in configuration order wins; the tie-break is a documented policy,
    /// not a race. Files without an extension are always unmatched.
    pub fn resolve(&self, extension: Option<&str>) -> Resolution {
        if let Some(extension) = extension {
            for filter in &self.filters {
                if let Some(output_extension) = filter.output_extension(extension) {
                    return Resolution::Convert {
                        filter: filter.name().to_string(),
                        output_extension,
                    };
                }
            }
        }

        if self.skip_unmatched {
            Resolution::Skip
        } else {
            Resolution::Verbatim
        }
    }

    /// Look up a descriptor by its configured reference.
    pub fn descriptor(&self, name: &str) -> Option<&FilterDescriptor> {
        self.filters.iter().find(|f| f.name() == name)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn registry(dir: &Path, filters: Vec<String>, skip_unmatched: bool) -> FilterRegistry {
        let mut config = MirrorConfig::new(dir.join("src"), dir.join("dst"), filters);
        config.skip_unmatched = skip_unmatched;
        FilterRegistry::from_config(&config)
    }

    #[test]
    fn first_configured_filter_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_script(
            dir.path(),
            "first",
            r#"case "$1" in ext) echo ogg; exit 0;; esac"#,
        );
        let second = write_script(
            dir.path(),
            "second",
            r#"case "$1" in ext) echo mp3; exit 0;; esac"#,
        );

        let registry = registry(dir.path(), vec![first.clone(), second], false);

        for _ in 0..3 {
            assert_eq!(
                registry.resolve(Some("flac")),
                Resolution::Convert {
                    filter: first.clone(),
                    output_extension: "ogg".to_string(),
                }
            );
        }
    }

    #[test]
    fn unmatched_extension_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let never = write_script(dir.path(), "never", "exit 1");

        let registry = registry(dir.path(), vec![never], false);
        assert_eq!(registry.resolve(Some("jpg")), Resolution::Verbatim);
        assert_eq!(registry.resolve(None), Resolution::Verbatim);
    }

    #[test]
    fn unmatched_extension_can_be_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry(dir.path(), vec![], true);
        assert_eq!(registry.resolve(Some("jpg")), Resolution::Skip);
    }

    #[test]
    fn later_filter_claims_what_earlier_declines() {
        let dir = tempfile::tempdir().unwrap();
        let flac_only = write_script(
            dir.path(),
            "flac_only",
            r#"case "$1" in ext) [ "$2" = flac ] && { echo mp3; exit 0; }; exit 1;; esac"#,
        );
        let raw_only = write_script(
            dir.path(),
            "raw_only",
            r#"case "$1" in ext) [ "$2" = cr2 ] && { echo jpg; exit 0; }; exit 1;; esac"#,
        );

        let registry = registry(dir.path(), vec![flac_only, raw_only.clone()], false);
        assert_eq!(
            registry.resolve(Some("cr2")),
            Resolution::Convert {
                filter: raw_only,
                output_extension: "jpg".to_string(),
            }
        );
    }

    #[test]
    fn binding_maps_resolution() {
        assert_eq!(Resolution::Verbatim.binding(), FilterBinding::Verbatim);
        assert_eq!(Resolution::Skip.binding(), FilterBinding::Ignored);
        assert_eq!(
            Resolution::Convert {
                filter: "mp3ify".to_string(),
                output_extension: "mp3".to_string(),
            }
            .binding(),
            FilterBinding::Converted {
                name: "mp3ify".to_string(),
            }
        );
    }

    #[test]
    fn descriptor_lookup_by_name() {
        let config = MirrorConfig::new(
            PathBuf::from("/src"),
            PathBuf::from("/dst"),
            vec!["a".to_string(), "b".to_string()],
        );
        let registry = FilterRegistry::from_config(&config);
        assert!(registry.descriptor("b").is_some());
        assert!(registry.descriptor("c").is_none());
    }
}
