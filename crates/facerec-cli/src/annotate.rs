//! Frame annotation for `facerec predict`.

use facerec_core::{Annotator, FaceRect, ResolvedIdentity};
use image::{GrayImage, Luma};

const BOX_THICKNESS: u32 = 2;
const KNOWN_SHADE: u8 = 255;
const UNKNOWN_SHADE: u8 = 0;

/// `"Alice (87%)"`.
pub fn label_text(identity: &ResolvedIdentity) -> String {
    format!("{} ({:.0}%)", identity.display_name, identity.confidence)
}

/// Collects the faces resolved in one frame and draws them on demand.
#[derive(Default)]
pub struct OverlayAnnotator {
    faces: Vec<(FaceRect, ResolvedIdentity)>,
}

impl OverlayAnnotator {
    /// Forget the previous frame's faces.
    pub fn begin_frame(&mut self) {
        self.faces.clear();
    }

    pub fn faces(&self) -> &[(FaceRect, ResolvedIdentity)] {
        &self.faces
    }

    /// Copy the frame and outline each face: white if known, black if unknown.
    pub fn render(&self, frame: &[u8], width: u32, height: u32) -> Option<GrayImage> {
        let mut img = GrayImage::from_raw(width, height, frame.to_vec())?;
        for (rect, identity) in &self.faces {
            let shade = if identity.is_known() { KNOWN_SHADE } else { UNKNOWN_SHADE };
            draw_rect(&mut img, rect, Luma([shade]), BOX_THICKNESS);
        }
        Some(img)
    }
}

impl Annotator for OverlayAnnotator {
    fn annotate(&mut self, rect: &FaceRect, identity: &ResolvedIdentity) {
        tracing::info!(
            x = rect.x,
            y = rect.y,
            w = rect.width,
            h = rect.height,
            "{}",
            label_text(identity)
        );
        self.faces.push((*rect, identity.clone()));
    }
}

/// Outline `rect` with a border `thickness` pixels wide, clipped to the image.
fn draw_rect(img: &mut GrayImage, rect: &FaceRect, color: Luma<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let x_end = (rect.x + rect.width).min(w);
    let y_end = (rect.y + rect.height).min(h);

    for y in rect.y..y_end {
        for x in rect.x..x_end {
            let on_border = x < rect.x + thickness
                || y < rect.y + thickness
                || x + thickness >= x_end
                || y + thickness >= y_end;
            if on_border {
                img.put_pixel(x, y, color);
            }
        }
    }
}
