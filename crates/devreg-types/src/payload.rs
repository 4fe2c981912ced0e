use crate::descriptor::DEVFILE_NAME;
use crate::media::media_types;

/// Bytes of one stack file tagged with its media type and logical name.
///
/// Payloads are transient: one is built per push from the file on disk and
/// one per pull from the fetched layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactPayload {
    pub name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ArtifactPayload {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// A `devfile.yaml` payload with the devfile layer media type.
    pub fn devfile(data: Vec<u8>) -> Self {
        Self::new(DEVFILE_NAME, media_types::DEVFILE_LAYER, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn devfile_payload() {
        let p = ArtifactPayload::devfile(b"schemaVersion: 2.0.0".to_vec());
        assert_eq!(p.name, "devfile.yaml");
        assert_eq!(p.media_type, media_types::DEVFILE_LAYER);
        assert_eq!(p.data, b"schemaVersion: 2.0.0");
    }
}
