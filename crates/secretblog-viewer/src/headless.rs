//! Page that exports everything it is given to a directory.
//!
//! Every marked element is reported visible in a batch of its own, so the
//! whole post loads regardless of the viewer limit. Rendering completes
//! immediately after the file is written.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Arc,
};

use secretblog_app::{Page, PageEvent};
use secretblog_core::{
    Blob, BlobHandle, ElementId, PanoramaCrop, Span, TileCoord, TileIndex, VisibilityEntry,
    scan_markers,
};
use serde_json::json;

use crate::ViewerError;

/// Height of the simulated viewport in pixels.
const VIEWPORT_HEIGHT: i64 = 800;

/// File name of the exported post body.
pub const CONTENT_FILE: &str = "index.html";

/// Headless rendering surface writing into an output directory.
pub struct HeadlessPage {
    out_dir: PathBuf,
    events: VecDeque<PageEvent>,
    elements: Vec<ElementId>,
    written: Vec<PathBuf>,
}

impl HeadlessPage {
    /// Page exporting into `out_dir`, created on first write.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            events: VecDeque::new(),
            elements: Vec::new(),
            written: Vec::new(),
        }
    }

    /// Marked elements found in the installed content.
    pub fn elements(&self) -> &[ElementId] {
        &self.elements
    }

    /// Files written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write(&mut self, name: impl AsRef<Path>, bytes: &[u8]) -> Result<(), ViewerError> {
        let path = self.out_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ViewerError::Write { path: parent.to_path_buf(), source })?;
        }
        std::fs::write(&path, bytes)
            .map_err(|source| ViewerError::Write { path: path.clone(), source })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "exported");
        self.written.push(path);
        Ok(())
    }
}

/// File extension for an exported blob.
fn extension(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "application/json" => "json",
        _ => "bin",
    }
}

impl Page for HeadlessPage {
    type Error = ViewerError;

    fn insert_content(&mut self, markup: &str) -> Result<(), Self::Error> {
        self.write(CONTENT_FILE, markup.as_bytes())?;

        let viewport = Span::new(0, VIEWPORT_HEIGHT);
        for marker in scan_markers(markup) {
            self.elements.push(marker.element);
            self.events.push_back(PageEvent::Viewport {
                viewport,
                entries: vec![VisibilityEntry { element: marker.element, bounds: viewport }],
            });
        }
        Ok(())
    }

    fn show_image(
        &mut self,
        element: ElementId,
        _handle: BlobHandle,
        blob: &Blob,
    ) -> Result<(), Self::Error> {
        self.write(format!("element-{}.{}", element.0, extension(&blob.mime)), &blob.bytes)?;
        self.events.push_back(PageEvent::DisplayReady { element });
        Ok(())
    }

    fn show_panorama(
        &mut self,
        element: ElementId,
        _handle: BlobHandle,
        blob: &Blob,
        crop: Option<PanoramaCrop>,
    ) -> Result<(), Self::Error> {
        self.write(format!("element-{}.{}", element.0, extension(&blob.mime)), &blob.bytes)?;

        // Without crop metadata the image is a full sphere.
        if let Some(crop) = crop {
            let sidecar = json!({
                "full_width": crop.full_width,
                "full_height": crop.full_height,
                "cropped_width": crop.cropped_width,
                "cropped_height": crop.cropped_height,
                "cropped_left": crop.cropped_left,
                "cropped_top": crop.cropped_top,
                "pose_heading": crop.pose_heading,
            });
            let sidecar = serde_json::to_vec_pretty(&sidecar)?;
            self.write(format!("element-{}.crop.json", element.0), &sidecar)?;
        }

        self.events.push_back(PageEvent::DisplayReady { element });
        Ok(())
    }

    fn show_map(&mut self, element: ElementId, index: &Arc<TileIndex>) -> Result<(), Self::Error> {
        let features = serde_json::to_vec_pretty(&index.features)?;
        self.write(format!("element-{}.geojson", element.0), &features)?;

        self.events.extend(index.tiles().map(|&tile| PageEvent::TileRequested { element, tile }));
        Ok(())
    }

    fn show_tile(
        &mut self,
        element: ElementId,
        tile: TileCoord,
        _handle: BlobHandle,
        blob: &Blob,
    ) -> Result<(), Self::Error> {
        self.write(format!("element-{}-tiles/{tile}.png", element.0), &blob.bytes)?;
        self.events.push_back(PageEvent::TileReady { element, tile });
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<PageEvent>, Self::Error> {
        Ok(self.events.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use secretblog_core::BlobStore;

    use super::*;

    #[test]
    fn one_visibility_batch_per_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = HeadlessPage::new(dir.path());

        page.insert_content(r#"<img data-src="a.jpg"><div data-panorama="b.jpg"></div>"#)
            .unwrap();

        assert_eq!(page.elements(), [ElementId(0), ElementId(1)]);
        assert_eq!(page.events.len(), 2);
        assert!(dir.path().join(CONTENT_FILE).exists());
    }

    #[test]
    fn images_are_named_by_element_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut page = HeadlessPage::new(dir.path());
        let mut blobs = BlobStore::new();
        let handle = blobs.create(b"webp".to_vec(), "image/webp");

        page.show_image(ElementId(3), handle, blobs.get(handle).unwrap()).unwrap();

        assert_eq!(std::fs::read(dir.path().join("element-3.webp")).unwrap(), b"webp");
        assert_eq!(page.events.pop_front(), Some(PageEvent::DisplayReady { element: ElementId(3) }));
    }

    #[test]
    fn unknown_media_type_exports_as_bin() {
        assert_eq!(extension("application/octet-stream"), "bin");
        assert_eq!(extension("image/jpeg"), "jpg");
    }
}
