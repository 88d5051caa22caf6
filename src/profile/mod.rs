// src/profile/mod.rs
//! Keyword profile registry: built-ins plus user-defined profiles from config.

mod builtin;

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::Profile;

/// Errors from profile resolution and lookup.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown profile {name:?}; available: {}", available.join(", "))]
    UnknownProfile { name: String, available: Vec<String> },

    #[error("profile {name:?} extends unknown base {base:?}")]
    UnknownBase { name: String, base: String },
}

/// Registry of keyword profiles, seeded with the built-ins ("crypto",
/// "phishing", "all") and extended with custom profiles from config.
/// Immutable after construction.
#[derive(Debug)]
pub struct Manager {
    profiles: HashMap<String, Profile>,
}

impl Manager {
    /// Build a registry from config. Custom profiles whose description is
    /// `extends:<base>` inherit the base's keywords, TLDs, and skip
    /// suffixes with their own entries appended (first occurrence wins).
    /// `extra_skip_suffixes` from config are merged into every profile.
    pub fn new(
        custom_profiles: &HashMap<String, Profile>,
        extra_skip_suffixes: &[String],
    ) -> Result<Self, ProfileError> {
        let mut profiles = HashMap::new();
        profiles.insert("crypto".to_string(), builtin::crypto_profile());
        profiles.insert("phishing".to_string(), builtin::phishing_profile());
        profiles.insert("all".to_string(), builtin::all_profile());

        // Sorted order keeps resolution deterministic when a custom profile
        // extends another custom one.
        let mut names: Vec<&String> = custom_profiles.keys().collect();
        names.sort();
        for name in names {
            let resolved = resolve_profile(name, &custom_profiles[name], &profiles)?;
            profiles.insert(name.clone(), resolved);
        }

        if !extra_skip_suffixes.is_empty() {
            for profile in profiles.values_mut() {
                profile.skip_suffixes =
                    builtin::merge_unique(&profile.skip_suffixes, extra_skip_suffixes);
            }
        }

        Ok(Manager { profiles })
    }

    /// Return the named profile, or an error listing what is available.
    pub fn load_profile(&self, name: &str) -> Result<Profile, ProfileError> {
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ProfileError::UnknownProfile {
                name: name.to_string(),
                available: self.list_profiles(),
            })
    }

    /// All profile names in ascending order.
    pub fn list_profiles(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Apply the extension convention: a description of `extends:<base>`
/// inherits the base profile's three sets and rewrites the description.
fn resolve_profile(
    name: &str,
    custom: &Profile,
    registry: &HashMap<String, Profile>,
) -> Result<Profile, ProfileError> {
    const PREFIX: &str = "extends:";

    if let Some(base_name) = custom.description.strip_prefix(PREFIX) {
        let base = registry.get(base_name).ok_or_else(|| ProfileError::UnknownBase {
            name: name.to_string(),
            base: base_name.to_string(),
        })?;
        return Ok(Profile {
            name: name.to_string(),
            keywords: builtin::merge_unique(&base.keywords, &custom.keywords),
            suspicious_tlds: builtin::merge_unique(&base.suspicious_tlds, &custom.suspicious_tlds),
            skip_suffixes: builtin::merge_unique(&base.skip_suffixes, &custom.skip_suffixes),
            description: format!("Custom profile extending {base_name}"),
        });
    }

    let mut result = custom.clone();
    if result.name.is_empty() {
        result.name = name.to_string();
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(keywords: &[&str], description: &str) -> Profile {
        Profile {
            name: String::new(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            suspicious_tlds: Vec::new(),
            skip_suffixes: Vec::new(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_builtins_are_registered() {
        let mgr = Manager::new(&HashMap::new(), &[]).unwrap();
        assert_eq!(mgr.list_profiles(), vec!["all", "crypto", "phishing"]);
        for name in ["crypto", "phishing", "all"] {
            let p = mgr.load_profile(name).unwrap();
            assert_eq!(p.name, name);
            assert!(!p.keywords.is_empty());
        }
    }

    #[test]
    fn test_load_unknown_profile_fails() {
        let mgr = Manager::new(&HashMap::new(), &[]).unwrap();
        let err = mgr.load_profile("nope").unwrap_err();
        match err {
            ProfileError::UnknownProfile { name, available } => {
                assert_eq!(name, "nope");
                assert_eq!(available, vec!["all", "crypto", "phishing"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_profile_extends_builtin() {
        let mut customs = HashMap::new();
        customs.insert(
            "mybrand".to_string(),
            custom(&["mybrand", "bitcoin"], "extends:crypto"),
        );
        let mgr = Manager::new(&customs, &[]).unwrap();

        let p = mgr.load_profile("mybrand").unwrap();
        assert_eq!(p.name, "mybrand");
        assert_eq!(p.description, "Custom profile extending crypto");
        // Base keywords come first, custom additions appended once.
        assert_eq!(p.keywords[0], "casino");
        assert!(p.keywords.contains(&"mybrand".to_string()));
        assert_eq!(p.keywords.iter().filter(|k| *k == "bitcoin").count(), 1);
        // Skip suffixes inherited from the base.
        assert!(p.skip_suffixes.contains(&"cloudflaressl.com".to_string()));
    }

    #[test]
    fn test_extends_unknown_base_fails() {
        let mut customs = HashMap::new();
        customs.insert("broken".to_string(), custom(&["x"], "extends:missing"));
        let err = Manager::new(&customs, &[]).unwrap_err();
        match err {
            ProfileError::UnknownBase { name, base } => {
                assert_eq!(name, "broken");
                assert_eq!(base, "missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_standalone_custom_profile_keeps_description() {
        let mut customs = HashMap::new();
        customs.insert(
            "standalone".to_string(),
            custom(&["acme"], "watches for acme impersonation"),
        );
        let mgr = Manager::new(&customs, &[]).unwrap();
        let p = mgr.load_profile("standalone").unwrap();
        assert_eq!(p.name, "standalone");
        assert_eq!(p.keywords, vec!["acme"]);
        assert_eq!(p.description, "watches for acme impersonation");
    }

    #[test]
    fn test_config_skip_suffixes_merged_into_all_profiles() {
        let extra = vec!["internal.example.com".to_string()];
        let mgr = Manager::new(&HashMap::new(), &extra).unwrap();
        for name in ["crypto", "phishing", "all"] {
            let p = mgr.load_profile(name).unwrap();
            assert!(p.skip_suffixes.contains(&"internal.example.com".to_string()));
        }
    }

    #[test]
    fn test_list_profiles_sorted_with_customs() {
        let mut customs = HashMap::new();
        customs.insert("zeta".to_string(), custom(&["z"], ""));
        customs.insert("acme".to_string(), custom(&["a"], ""));
        let mgr = Manager::new(&customs, &[]).unwrap();
        assert_eq!(mgr.list_profiles(), vec!["acme", "all", "crypto", "phishing", "zeta"]);
    }
}
