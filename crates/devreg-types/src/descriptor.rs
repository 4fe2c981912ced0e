use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File name of a stack's primary content, both on disk and inside the
/// registry artifact.
pub const DEVFILE_NAME: &str = "devfile.yaml";

/// Key in [`BundleDescriptor::links`] holding the registry reference path.
pub const SELF_LINK: &str = "self";

/// One stack entry from the registry index.
///
/// Descriptors are created once when the index is loaded and never mutated
/// afterwards. Unknown index fields are preserved in `extra` so the catalog
/// can be re-served as loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_memory_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub starter_projects: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BundleDescriptor {
    /// Minimal descriptor with a name and a `self` link.
    pub fn new(name: impl Into<String>, self_link: impl Into<String>) -> Self {
        let mut links = BTreeMap::new();
        links.insert(SELF_LINK.to_string(), self_link.into());
        Self {
            name: name.into(),
            version: None,
            display_name: None,
            description: None,
            kind: None,
            tags: Vec::new(),
            icon: None,
            global_memory_limit: None,
            project_type: None,
            language: None,
            links,
            resources: Vec::new(),
            starter_projects: Vec::new(),
            extra: BTreeMap::new(),
        }
    }

    /// The registry reference path (`links.self`), if declared.
    pub fn self_link(&self) -> Option<&str> {
        self.links.get(SELF_LINK).map(String::as_str)
    }

    /// Location of the stack file relative to the stacks root:
    /// `{name}/devfile.yaml`.
    pub fn source_path(&self) -> PathBuf {
        PathBuf::from(&self.name).join(DEVFILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_self_link() {
        let d = BundleDescriptor::new("go", "devfile-catalog/go:1.0.2");
        assert_eq!(d.self_link(), Some("devfile-catalog/go:1.0.2"));
        assert_eq!(d.source_path(), PathBuf::from("go").join("devfile.yaml"));
    }

    #[test]
    fn deserializes_index_entry() {
        let json = r#"{
            "name": "java-maven",
            "version": "1.1.0",
            "displayName": "Maven Java",
            "type": "stack",
            "tags": ["Java", "Maven"],
            "projectType": "maven",
            "language": "java",
            "links": {"self": "devfile-catalog/java-maven:latest"},
            "resources": ["devfile.yaml"],
            "starterProjects": ["springbootproject"],
            "provider": "Red Hat"
        }"#;
        let d: BundleDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d.name, "java-maven");
        assert_eq!(d.kind.as_deref(), Some("stack"));
        assert_eq!(d.tags, vec!["Java", "Maven"]);
        assert_eq!(d.self_link(), Some("devfile-catalog/java-maven:latest"));
        assert_eq!(d.starter_projects, vec!["springbootproject"]);
        assert_eq!(d.extra.get("provider"), Some(&serde_json::json!("Red Hat")));
    }

    #[test]
    fn missing_links_is_empty() {
        let d: BundleDescriptor = serde_json::from_str(r#"{"name": "bare"}"#).unwrap();
        assert!(d.links.is_empty());
        assert_eq!(d.self_link(), None);
    }

    #[test]
    fn serializes_camel_case() {
        let mut d = BundleDescriptor::new("go", "go");
        d.display_name = Some("Go Runtime".into());
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["displayName"], "Go Runtime");
        assert_eq!(value["links"]["self"], "go");
        assert!(value.get("tags").is_none());
    }
}
