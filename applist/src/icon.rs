use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader, Limits, RgbaImage};

use crate::package::Icon;
use crate::utils::base64_bytes;

/// Intrinsic size used when an icon doesn't have one
pub const DEFAULT_ICON_SIZE: u32 = 48;

/// Largest width or height decoded or drawn, anything bigger comes from a
/// broken or hostile APK
pub const MAX_ICON_SIZE: u32 = 1024;

const DATA_URI_PREFIX: &str = "data:image/png;base64, ";

/// Rasterize the icon into 32 bit RGBA pixels
pub fn rasterize(icon: &Icon) -> crate::Result<RgbaImage> {
    match icon {
        Icon::Encoded(data) => decode(data),
        Icon::Argb {
            width,
            height,
            pixels,
        } => argb_to_rgba(*width, *height, pixels),
        Icon::Layered {
            width,
            height,
            layers,
        } => flatten(*width, *height, layers),
    }
}

fn decode(data: &[u8]) -> crate::Result<RgbaImage> {
    let mut reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_ICON_SIZE);
    limits.max_image_height = Some(MAX_ICON_SIZE);
    reader.limits(limits);
    Ok(reader.decode()?.to_rgba8())
}

fn argb_to_rgba(width: u32, height: u32, pixels: &[u32]) -> crate::Result<RgbaImage> {
    let mut buf = Vec::with_capacity(pixels.len() * 4);
    for px in pixels {
        let [a, r, g, b] = px.to_be_bytes();
        buf.extend_from_slice(&[r, g, b, a]);
    }
    RgbaImage::from_raw(width, height, buf).ok_or_else(|| {
        crate::Error::Icon(format!(
            "{} pixels don't fill a {}x{} bitmap",
            pixels.len(),
            width,
            height
        ))
    })
}

/// Draw every layer onto a transparent canvas sized to the intrinsic size,
/// layers of a different size are scaled to fit
fn flatten(width: u32, height: u32, layers: &[Vec<u8>]) -> crate::Result<RgbaImage> {
    let (width, height) = if width == 0 || height == 0 {
        log::debug!(
            "icon has no intrinsic size, using {0}x{0}",
            DEFAULT_ICON_SIZE
        );
        (DEFAULT_ICON_SIZE, DEFAULT_ICON_SIZE)
    } else {
        (width.min(MAX_ICON_SIZE), height.min(MAX_ICON_SIZE))
    };

    let mut canvas = RgbaImage::new(width, height);
    for data in layers {
        let layer = decode(data)?;
        if layer.dimensions() == (width, height) {
            imageops::overlay(&mut canvas, &layer, 0, 0);
        } else {
            let scaled = imageops::resize(&layer, width, height, FilterType::Triangle);
            imageops::overlay(&mut canvas, &scaled, 0, 0);
        }
    }
    Ok(canvas)
}

/// The icon if it can be drawn. Anything else is logged and dropped so a bad
/// resource can't sink a report.
pub fn usable(package: &str, icon: Icon) -> Option<Icon> {
    match rasterize(&icon) {
        Ok(_) => Some(icon),
        Err(e) => {
            log::warn!("unusable icon for {}: {}", package, e);
            None
        }
    }
}

pub fn encode_png(img: &RgbaImage) -> crate::Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// PNG bytes for the icon, a transparent canvas if there is no icon
pub fn icon_png(icon: Option<&Icon>) -> crate::Result<Vec<u8>> {
    let img = match icon {
        Some(it) => rasterize(it)?,
        None => RgbaImage::new(DEFAULT_ICON_SIZE, DEFAULT_ICON_SIZE),
    };
    encode_png(&img)
}

/// The icon as an inline `data:` URI suitable for an `<img src>`
pub fn data_uri(icon: Option<&Icon>) -> crate::Result<String> {
    let png = icon_png(icon)?;
    let encoded = base64_bytes(&png);
    let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + encoded.len());
    uri.push_str(DATA_URI_PREFIX);
    uri.push_str(&encoded);
    Ok(uri)
}
