use crate::api::models::ArtworkBlob;
use crate::error::AppResult;
use crate::view::render::{RenderPort, ResourceId};

/// A display-ready artwork handle owned by the rendering layer.
///
/// The handle is a scarce external resource: it must be given back through
/// [`ArtworkResource::release`] exactly once. Consuming `self` there makes a
/// second release impossible; dropping it unreleased is logged as a leak.
#[must_use]
#[derive(Debug)]
pub struct ArtworkResource {
    id: ResourceId,
    source_url: String,
    released: bool,
}

impl ArtworkResource {
    pub fn create(render: &mut dyn RenderPort, blob: &ArtworkBlob) -> AppResult<Self> {
        let id = render.create_resource(blob)?;
        log::debug!(
            "Created artwork resource {} from {} ({} bytes, {})",
            id,
            blob.source_url,
            blob.bytes.len(),
            blob.mime
        );
        Ok(Self {
            id,
            source_url: blob.source_url.clone(),
            released: false,
        })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn release(mut self, render: &mut dyn RenderPort) {
        log::debug!("Releasing artwork resource {}", self.id);
        render.release_resource(self.id);
        self.released = true;
    }
}

impl Drop for ArtworkResource {
    fn drop(&mut self) {
        if !self.released {
            log::error!(
                "Artwork resource {} ({}) dropped without being released",
                self.id,
                self.source_url
            );
        }
    }
}
