use std::sync::Arc;

use anyhow::{Result, bail};
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;

/// Still-image quality for uploaded samples (JPEG, 0-100).
const SAMPLE_JPEG_QUALITY: u8 = 80;

/// Raw frame read from a live video source.
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One live video element rendered by the host page. Dimensions are the
/// current stream dimensions; a source that has not started streaming yet
/// reports zero width and height.
pub trait VideoSource: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Rasterizes the current moment of the stream.
    fn capture(&self) -> Result<Frame>;
}

/// The host page's set of currently rendered video sources. Re-queried on
/// every polling tick; a source's position in the returned list is its
/// transient identity.
pub trait VideoStage: Send + Sync {
    fn sources(&self) -> Vec<Arc<dyn VideoSource>>;
}

/// Encodes a frame as the JPEG data URL the detection service expects.
pub fn to_data_url(frame: Frame) -> Result<String> {
    let Frame {
        rgba,
        width,
        height,
    } = frame;
    let Some(rgba) = image::RgbaImage::from_raw(width, height, rgba) else {
        bail!("frame buffer does not match {width}x{height}");
    };
    // JPEG carries no alpha channel.
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, SAMPLE_JPEG_QUALITY).encode_image(&rgb)?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&jpeg);
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn solid_frame(width: u32, height: u32) -> Frame {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            rgba.extend_from_slice(&[200, 40, 40, 255]);
        }
        Frame {
            rgba,
            width,
            height,
        }
    }

    #[test]
    fn frames_encode_as_jpeg_data_urls() {
        let url = to_data_url(solid_frame(4, 2)).expect("encode frame");
        let payload = url
            .strip_prefix("data:image/jpeg;base64,")
            .expect("data url prefix");

        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .expect("valid base64");
        let decoded = image::load_from_memory(&jpeg).expect("decodable jpeg");
        assert_eq!(decoded.dimensions(), (4, 2));
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let frame = Frame {
            rgba: vec![0; 8],
            width: 10,
            height: 10,
        };
        assert!(to_data_url(frame).is_err());
    }
}
