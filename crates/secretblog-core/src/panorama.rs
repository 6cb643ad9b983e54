//! Panorama crop parameters.
//!
//! Panoramas that do not cover the full sphere carry Google Photo Sphere
//! (`GPano`) XMP metadata describing where the image sits inside the full
//! equirectangular canvas. The viewer needs these to place it correctly.

/// Where a partial panorama sits in its full equirectangular canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanoramaCrop {
    /// Width of the full canvas in pixels
    pub full_width: u32,
    /// Height of the full canvas in pixels
    pub full_height: u32,
    /// Width of the image actually present
    pub cropped_width: u32,
    /// Height of the image actually present
    pub cropped_height: u32,
    /// Horizontal offset of the image in the canvas
    pub cropped_left: u32,
    /// Vertical offset of the image in the canvas
    pub cropped_top: u32,
    /// Compass heading of the image centre, if recorded
    pub pose_heading: Option<f64>,
}

impl PanoramaCrop {
    /// Read crop parameters from decrypted image bytes.
    ///
    /// Both the attribute form (`GPano:FullPanoWidthPixels="8000"`) and the
    /// element form (`<GPano:FullPanoWidthPixels>8000</...>`) are accepted.
    /// Returns `None` unless all six size fields are present.
    pub fn from_image(bytes: &[u8]) -> Option<Self> {
        let xmp = xmp_packet(bytes)?;
        let field = |name| gpano_value(xmp, name).and_then(|v| v.trim().parse().ok());

        Some(Self {
            full_width: field("FullPanoWidthPixels")?,
            full_height: field("FullPanoHeightPixels")?,
            cropped_width: field("CroppedAreaImageWidthPixels")?,
            cropped_height: field("CroppedAreaImageHeightPixels")?,
            cropped_left: field("CroppedAreaLeftPixels")?,
            cropped_top: field("CroppedAreaTopPixels")?,
            pose_heading: gpano_value(xmp, "PoseHeadingDegrees").and_then(|v| v.trim().parse().ok()),
        })
    }

    /// Whether the image covers the whole canvas.
    pub fn is_full(&self) -> bool {
        self.cropped_left == 0
            && self.cropped_top == 0
            && self.cropped_width == self.full_width
            && self.cropped_height == self.full_height
    }
}

/// XMP text embedded in the image, or `None` if there is none.
fn xmp_packet(bytes: &[u8]) -> Option<&str> {
    const START: &[u8] = b"<x:xmpmeta";
    const END: &[u8] = b"</x:xmpmeta>";

    let start = find(bytes, START)?;
    let len = find(&bytes[start..], END)? + END.len();
    std::str::from_utf8(&bytes[start..start + len]).ok()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn gpano_value<'a>(xmp: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("GPano:{name}");
    let mut rest = xmp;

    while let Some(at) = rest.find(&needle) {
        let after = &rest[at + needle.len()..];
        let trimmed = after.trim_start();

        if let Some(value) = trimmed.strip_prefix('=') {
            let value = value.trim_start();
            let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
            let body = &value[1..];
            return body.find(quote).map(|end| &body[..end]);
        }
        if let Some(body) = after.strip_prefix('>') {
            return body.find('<').map(|end| &body[..end]);
        }
        rest = after;
    }
    None
}
