//! 图像解码与缩放
//!
//! 编码帧 (JPEG/PNG 等) → RGB → 处理分辨率 (默认 320x240)。
//! 解码失败的帧 (包括分片乱序造成的损坏帧) 在这里被拒绝。

use anyhow::{bail, Context, Result};
use fast_image_resize as fr;
use image::RgbImage;

/// 编码帧解码能力, 每个处理线程持有一个实例
pub trait FrameDecoder: Send {
    /// 解码并缩放到处理分辨率
    fn decode(&mut self, bytes: &[u8]) -> Result<RgbImage>;
}

/// 基于 `image` 解码 + `fast_image_resize` 缩放
pub struct ImageFrameDecoder {
    width: u32,
    height: u32,
    resizer: fr::Resizer,
}

impl ImageFrameDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resizer: fr::Resizer::new(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, rgb: RgbImage) -> Result<RgbImage> {
        let (src_w, src_h) = rgb.dimensions();
        if (src_w, src_h) == (self.width, self.height) {
            return Ok(rgb);
        }

        let src =
            fr::images::Image::from_vec_u8(src_w, src_h, rgb.into_raw(), fr::PixelType::U8x3)
                .context("invalid source image buffer")?;
        let mut dst = fr::images::Image::new(self.width, self.height, fr::PixelType::U8x3);

        // 双线性插值: 姿态估计对缩放质量比检测框更敏感
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));
        self.resizer
            .resize(&src, &mut dst, &options)
            .context("resize failed")?;

        RgbImage::from_raw(self.width, self.height, dst.into_vec())
            .context("resized buffer does not match target size")
    }
}

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&mut self, bytes: &[u8]) -> Result<RgbImage> {
        if self.width == 0 || self.height == 0 {
            bail!("processing size {}x{} is empty", self.width, self.height);
        }
        let decoded = image::load_from_memory(bytes).context("failed to decode frame")?;
        let rgb = decoded.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            bail!("decoded frame has no pixels");
        }
        self.resize(rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_and_resize() {
        let mut decoder = ImageFrameDecoder::new(320, 240);
        let img = decoder.decode(&encode_png(640, 480)).unwrap();
        assert_eq!(img.dimensions(), (320, 240));
    }

    #[test]
    fn test_matching_size_is_kept() {
        let mut decoder = ImageFrameDecoder::new(32, 24);
        let img = decoder.decode(&encode_png(32, 24)).unwrap();
        assert_eq!(img.dimensions(), (32, 24));
        assert_eq!(img.get_pixel(5, 7), &Rgb([5, 7, 128]));
    }

    #[test]
    fn test_corrupt_frame_is_rejected() {
        let mut decoder = ImageFrameDecoder::new(320, 240);
        assert!(decoder.decode(b"0123456789").is_err());

        // 截断的 PNG (模拟丢失分片)
        let png = encode_png(64, 64);
        assert!(decoder.decode(&png[..png.len() / 2]).is_err());
    }
}
