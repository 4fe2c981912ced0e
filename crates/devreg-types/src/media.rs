/// Media types understood by the registry.
///
/// The devfile pair is fixed for the whole process: pushes tag the stack file
/// with [`DEVFILE_LAYER`](media_types::DEVFILE_LAYER) and the manifest config
/// with [`DEVFILE_CONFIG`](media_types::DEVFILE_CONFIG), and pulls only accept
/// artifacts that carry both.
pub mod media_types {
    /// Layer media type of a devfile stack file.
    pub const DEVFILE_LAYER: &str = "application/vnd.devfileio.devfile.layer.v1";
    /// Config envelope media type of a devfile artifact manifest.
    pub const DEVFILE_CONFIG: &str = "application/vnd.devfileio.devfile.config.v2+json";
    /// OCI image manifest.
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
    /// Generic byte stream, used for blob uploads.
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

#[cfg(test)]
mod tests {
    use super::media_types;

    #[test]
    fn devfile_pair_is_distinct() {
        assert_ne!(media_types::DEVFILE_LAYER, media_types::DEVFILE_CONFIG);
        assert!(media_types::DEVFILE_CONFIG.ends_with("+json"));
    }
}
