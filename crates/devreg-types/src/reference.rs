//! Registry references of the form `{host}/{repository}[:tag|@digest]`.
//!
//! A reference is composed once from the registry host and a stack's
//! `links.self` path. Composition is pure: the same host and path always
//! produce the same reference, which is what lets a restarted server push
//! over its previous artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag used when a reference path names no tag or digest.
pub const DEFAULT_TAG: &str = "latest";

/// What a reference points at inside its repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceTarget<'a> {
    Tag(&'a str),
    Digest(&'a str),
}

impl ReferenceTarget<'_> {
    /// The string used in `/v2/<repo>/manifests/<target>`.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tag(t) | Self::Digest(t) => t,
        }
    }
}

/// Registry-side key of one stack artifact.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactReference(String);

impl ArtifactReference {
    /// Join `host` and `path` with a single `/`.
    ///
    /// Empty and `.` path segments are dropped and `..` removes the previous
    /// segment, so `"localhost:5000"` + `"/go/"` and `"localhost:5000/"` +
    /// `"go"` both give `localhost:5000/go`.
    pub fn new(host: &str, path: &str) -> Self {
        let host = host.trim_end_matches('/');
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            Self(host.to_string())
        } else {
            Self(format!("{host}/{}", segments.join("/")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Registry host (and port), the part before the first `/`.
    pub fn registry(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(host, _)| host)
    }

    /// Repository path without host, tag or digest.
    pub fn repository(&self) -> &str {
        let path = self.path();
        if let Some((repo, _)) = path.split_once('@') {
            return repo;
        }
        match Self::tag_split(path) {
            Some((repo, _)) => repo,
            None => path,
        }
    }

    /// Tag or digest the reference resolves through. Defaults to
    /// [`DEFAULT_TAG`].
    pub fn target(&self) -> ReferenceTarget<'_> {
        let path = self.path();
        if let Some((_, digest)) = path.split_once('@') {
            return ReferenceTarget::Digest(digest);
        }
        match Self::tag_split(path) {
            Some((_, tag)) => ReferenceTarget::Tag(tag),
            None => ReferenceTarget::Tag(DEFAULT_TAG),
        }
    }

    fn path(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, path)| path)
    }

    /// Split `repo:tag`, only looking at the last path segment so a port in
    /// an upstream path never reads as a tag.
    fn tag_split(path: &str) -> Option<(&str, &str)> {
        let last_segment_start = path.rfind('/').map_or(0, |i| i + 1);
        let colon = path[last_segment_start..].rfind(':')? + last_segment_start;
        Some((&path[..colon], &path[colon + 1..]))
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn joins_host_and_path() {
        let r = ArtifactReference::new("localhost:5000", "go");
        assert_eq!(r.as_str(), "localhost:5000/go");
        assert_eq!(r.registry(), "localhost:5000");
        assert_eq!(r.repository(), "go");
        assert_eq!(r.target(), ReferenceTarget::Tag("latest"));
    }

    #[test]
    fn collapses_slashes() {
        assert_eq!(ArtifactReference::new("localhost:5000/", "/go/").as_str(), "localhost:5000/go");
        assert_eq!(
            ArtifactReference::new("localhost:5000", "devfile-catalog//go").as_str(),
            "localhost:5000/devfile-catalog/go"
        );
        assert_eq!(ArtifactReference::new("localhost:5000", "a/./b/../c").as_str(), "localhost:5000/a/c");
    }

    #[test]
    fn splits_tag() {
        let r = ArtifactReference::new("localhost:5000", "devfile-catalog/java-maven:1.1.0");
        assert_eq!(r.repository(), "devfile-catalog/java-maven");
        assert_eq!(r.target(), ReferenceTarget::Tag("1.1.0"));
        assert_eq!(r.target().as_str(), "1.1.0");
    }

    #[test]
    fn splits_digest() {
        let digest = format!("sha256:{}", "a".repeat(64));
        let r = ArtifactReference::new("registry:5000", &format!("stacks/go@{digest}"));
        assert_eq!(r.repository(), "stacks/go");
        assert_eq!(r.target(), ReferenceTarget::Digest(&digest));
    }

    #[test]
    fn empty_path_is_host_only() {
        let r = ArtifactReference::new("localhost:5000", "");
        assert_eq!(r.as_str(), "localhost:5000");
        assert_eq!(r.repository(), "");
    }

    #[test]
    fn serde_transparent() {
        let r = ArtifactReference::new("localhost:5000", "go");
        assert_eq!(serde_json::to_string(&r).unwrap(), "\"localhost:5000/go\"");
    }

    proptest! {
        #[test]
        fn composition_is_deterministic(host in "[a-z]{1,8}(:[0-9]{2,5})?", path in "[a-z0-9/._:-]{0,24}") {
            let a = ArtifactReference::new(&host, &path);
            let b = ArtifactReference::new(&host, &path);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.registry(), host.as_str());
            prop_assert!(!a.as_str().contains("//"));
        }
    }
}
