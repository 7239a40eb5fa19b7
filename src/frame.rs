//! Decoding of submitted frames.
//!
//! Capture pages post a canvas snapshot as a data URL
//! (`data:image/jpeg;base64,...`). Bare base64 is accepted too.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use drowsiness_core::ImageSize;
use image::ImageReader;

const DATA_URL_PREFIX: &str = "data:";

/// An encoded image plus the dimensions needed to denormalize landmarks.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub size: ImageSize,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("image payload is empty")]
    Empty,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("image has zero width or height")]
    ZeroSize,
}

pub fn decode_data_url(input: &str) -> Result<DecodedFrame, FrameError> {
    let (declared_mime, encoded) = split_data_url(input.trim());
    let encoded: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if encoded.is_empty() {
        return Err(FrameError::Empty);
    }

    let bytes = STANDARD.decode(encoded.as_bytes())?;

    // Only the header is parsed; the detector gets the encoded bytes anyway.
    let reader = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?;
    let sniffed = reader.format();
    let (width, height) = reader.into_dimensions()?;
    let size = ImageSize::new(width, height);
    if size.is_empty() {
        return Err(FrameError::ZeroSize);
    }

    let mime = match declared_mime {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => sniffed
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    };

    Ok(DecodedFrame { bytes, mime, size })
}

/// Splits `data:<mime>[;base64],<payload>` into its mime type and payload.
fn split_data_url(input: &str) -> (Option<&str>, &str) {
    let Some(rest) = input.strip_prefix(DATA_URL_PREFIX) else {
        return (None, input);
    };
    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header.split(';').next().map(str::trim);
            (mime, payload)
        }
        None => (None, rest),
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::*;

    fn png_base64(width: u32, height: u32) -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([40, 80, 120])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        STANDARD.encode(buf.into_inner())
    }

    #[test]
    fn decodes_data_url() {
        let url = format!("data:image/png;base64,{}", png_base64(8, 6));
        let frame = decode_data_url(&url).unwrap();
        assert_eq!(frame.size, ImageSize::new(8, 6));
        assert_eq!(frame.mime, "image/png");
        assert!(!frame.bytes.is_empty());
    }

    #[test]
    fn decodes_bare_base64_and_guesses_mime() {
        let frame = decode_data_url(&png_base64(3, 2)).unwrap();
        assert_eq!(frame.size, ImageSize::new(3, 2));
        assert_eq!(frame.mime, "image/png");
    }

    #[test]
    fn jpeg_dimensions_come_from_the_header() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([10, 20, 30])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
        let encoded = STANDARD.encode(buf.into_inner());

        let frame = decode_data_url(&format!("data:;base64,{encoded}")).unwrap();
        assert_eq!(frame.size, ImageSize::new(64, 48));
        assert_eq!(frame.mime, "image/jpeg");
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,"),
            Err(FrameError::Empty)
        ));
        assert!(matches!(decode_data_url("   "), Err(FrameError::Empty)));
    }

    #[test]
    fn bad_base64_rejected() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@not-base64@@"),
            Err(FrameError::Base64(_))
        ));
    }

    #[test]
    fn non_image_bytes_rejected() {
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"hello world"));
        assert!(matches!(decode_data_url(&url), Err(FrameError::Image(_))));
    }

    #[test]
    fn header_parsing() {
        assert_eq!(
            split_data_url("data:image/jpeg;base64,AAAA"),
            (Some("image/jpeg"), "AAAA")
        );
        assert_eq!(split_data_url("AAAA"), (None, "AAAA"));
    }
}
