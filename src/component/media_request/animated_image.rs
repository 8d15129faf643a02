//! GIF 解碼與逐格合成
//!
//! 影格以索引色保存，取樣時才依處置方式（disposal）合成到畫布上。

use gif::{ColorOutput, DecodeOptions, DisposalMethod};
use image::{Rgba, RgbaImage};
use std::io::Read;

/// GIF 延遲為 0 時視為 100ms（與瀏覽器行為一致）
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// 單一索引色影格
#[derive(Debug, Clone)]
pub struct IndexedFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub indices: Vec<u8>,
    pub palette: Option<Vec<u8>>,
    pub transparent: Option<u8>,
    pub dispose: DisposalMethod,
    pub delay_ms: u32,
}

#[derive(Debug, Clone)]
pub struct AnimatedImage {
    width: u16,
    height: u16,
    global_palette: Option<Vec<u8>>,
    frames: Vec<IndexedFrame>,
}

impl AnimatedImage {
    pub fn decode<R: Read>(reader: R) -> Result<Self, gif::DecodingError> {
        let mut options = DecodeOptions::new();
        options.set_color_output(ColorOutput::Indexed);

        let mut decoder = options.read_info(reader)?;
        let width = decoder.width();
        let height = decoder.height();
        let global_palette = decoder.global_palette().map(<[u8]>::to_vec);

        let mut frames = Vec::new();
        while let Some(frame) = decoder.read_next_frame()? {
            frames.push(IndexedFrame {
                left: frame.left,
                top: frame.top,
                width: frame.width,
                height: frame.height,
                indices: frame.buffer.to_vec(),
                palette: frame.palette.clone(),
                transparent: frame.transparent,
                dispose: frame.dispose,
                delay_ms: delay_to_ms(frame.delay),
            });
        }

        Ok(Self {
            width,
            height,
            global_palette,
            frames,
        })
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.frames
            .iter()
            .map(|f| f64::from(f.delay_ms))
            .sum::<f64>()
            / 1000.0
    }

    /// 各影格起始時間（延遲的累計和）
    #[must_use]
    pub fn frame_starts(&self) -> Vec<f64> {
        let mut elapsed_ms = 0u64;
        self.frames
            .iter()
            .map(|frame| {
                let start = elapsed_ms as f64 / 1000.0;
                elapsed_ms += u64::from(frame.delay_ms);
                start
            })
            .collect()
    }

    #[must_use]
    pub fn compositor(&self) -> Compositor<'_> {
        Compositor::new(self)
    }
}

/// 時間點對應到「之前最近」的影格索引
#[must_use]
pub fn frame_index_at(frame_starts: &[f64], timestamp: f64) -> usize {
    frame_starts
        .partition_point(|start| *start <= timestamp)
        .saturating_sub(1)
}

#[must_use]
const fn delay_to_ms(delay_cs: u16) -> u32 {
    if delay_cs == 0 {
        DEFAULT_FRAME_DELAY_MS
    } else {
        delay_cs as u32 * 10
    }
}

enum PendingDisposal {
    Background {
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    },
    Restore(RgbaImage),
}

/// 依序合成影格，只能往前推進
pub struct Compositor<'a> {
    image: &'a AnimatedImage,
    canvas: RgbaImage,
    next_frame: usize,
    pending: Option<PendingDisposal>,
}

impl<'a> Compositor<'a> {
    fn new(image: &'a AnimatedImage) -> Self {
        Self {
            image,
            canvas: RgbaImage::from_pixel(
                u32::from(image.width),
                u32::from(image.height),
                TRANSPARENT,
            ),
            next_frame: 0,
            pending: None,
        }
    }

    /// 合成到指定影格並回傳畫布
    ///
    /// 要求的索引小於已合成的位置時，直接回傳目前畫布
    pub fn advance_to(&mut self, index: usize) -> &RgbaImage {
        let last = self.image.frames.len().saturating_sub(1);
        let target = index.min(last);
        while self.next_frame <= target {
            self.draw_next();
        }
        &self.canvas
    }

    fn draw_next(&mut self) {
        let frame = &self.image.frames[self.next_frame];
        self.next_frame += 1;

        match self.pending.take() {
            Some(PendingDisposal::Background {
                left,
                top,
                width,
                height,
            }) => {
                for y in top..(top + height).min(self.canvas.height()) {
                    for x in left..(left + width).min(self.canvas.width()) {
                        self.canvas.put_pixel(x, y, TRANSPARENT);
                    }
                }
            }
            Some(PendingDisposal::Restore(saved)) => self.canvas = saved,
            None => {}
        }

        if frame.dispose == DisposalMethod::Previous {
            self.pending = Some(PendingDisposal::Restore(self.canvas.clone()));
        }

        let palette = frame
            .palette
            .as_deref()
            .or(self.image.global_palette.as_deref());
        let (left, top) = (u32::from(frame.left), u32::from(frame.top));
        let frame_width = u32::from(frame.width);

        for (offset, &index) in frame.indices.iter().enumerate() {
            if frame.transparent == Some(index) {
                continue;
            }
            let x = left + offset as u32 % frame_width.max(1);
            let y = top + offset as u32 / frame_width.max(1);
            if x >= self.canvas.width() || y >= self.canvas.height() {
                continue;
            }
            self.canvas.put_pixel(x, y, palette_color(palette, index));
        }

        if frame.dispose == DisposalMethod::Background {
            self.pending = Some(PendingDisposal::Background {
                left,
                top,
                width: frame_width,
                height: u32::from(frame.height),
            });
        }
    }
}

/// 色盤展開；沒有色盤時以索引值當灰階
fn palette_color(palette: Option<&[u8]>, index: u8) -> Rgba<u8> {
    let Some(palette) = palette else {
        return Rgba([index, index, index, u8::MAX]);
    };
    let base = usize::from(index) * 3;
    match palette.get(base..base + 3) {
        Some(rgb) => Rgba([rgb[0], rgb[1], rgb[2], u8::MAX]),
        None => Rgba([0, 0, 0, u8::MAX]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    const PALETTE: [u8; 9] = [255, 0, 0, 0, 255, 0, 0, 0, 255];

    fn encode_gif(frames: &[(u16, u16, u16, u16, Vec<u8>, u16, DisposalMethod, Option<u8>)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut bytes, 4, 4, &PALETTE).unwrap();
            for (left, top, width, height, pixels, delay, dispose, transparent) in frames {
                let frame = gif::Frame {
                    left: *left,
                    top: *top,
                    width: *width,
                    height: *height,
                    delay: *delay,
                    dispose: *dispose,
                    transparent: *transparent,
                    buffer: Cow::Borrowed(pixels.as_slice()),
                    ..gif::Frame::default()
                };
                encoder.write_frame(&frame).unwrap();
            }
        }
        bytes
    }

    #[test]
    fn test_decode_timing() {
        let bytes = encode_gif(&[
            (0, 0, 4, 4, vec![0; 16], 50, DisposalMethod::Keep, None),
            (0, 0, 4, 4, vec![1; 16], 0, DisposalMethod::Keep, None),
            (0, 0, 4, 4, vec![2; 16], 25, DisposalMethod::Keep, None),
        ]);
        let image = AnimatedImage::decode(bytes.as_slice()).unwrap();

        assert_eq!(image.frame_count(), 3);
        assert!((image.duration_seconds() - 0.85).abs() < 1e-9);
        assert_eq!(image.frame_starts(), vec![0.0, 0.5, 0.6]);
    }

    #[test]
    fn test_frame_index_at() {
        let starts = [0.0, 0.5, 0.6];
        assert_eq!(frame_index_at(&starts, 0.0), 0);
        assert_eq!(frame_index_at(&starts, 0.49), 0);
        assert_eq!(frame_index_at(&starts, 0.5), 1);
        assert_eq!(frame_index_at(&starts, 0.7), 2);
        assert_eq!(frame_index_at(&starts, 99.0), 2);
    }

    #[test]
    fn test_compositor_keeps_partial_frames() {
        let bytes = encode_gif(&[
            (0, 0, 4, 4, vec![0; 16], 10, DisposalMethod::Keep, None),
            (1, 1, 2, 2, vec![2; 4], 10, DisposalMethod::Keep, None),
        ]);
        let image = AnimatedImage::decode(bytes.as_slice()).unwrap();
        let mut compositor = image.compositor();

        let canvas = compositor.advance_to(1);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_compositor_background_disposal_clears_rect() {
        let bytes = encode_gif(&[
            (0, 0, 4, 4, vec![0; 16], 10, DisposalMethod::Background, None),
            (0, 0, 1, 1, vec![1], 10, DisposalMethod::Keep, None),
        ]);
        let image = AnimatedImage::decode(bytes.as_slice()).unwrap();
        let mut compositor = image.compositor();

        let canvas = compositor.advance_to(1);
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(canvas.get_pixel(3, 3)[3], 0);
    }

    #[test]
    fn test_compositor_transparent_index_keeps_underlying() {
        let bytes = encode_gif(&[
            (0, 0, 4, 4, vec![0; 16], 10, DisposalMethod::Keep, None),
            (0, 0, 4, 4, vec![2; 16], 10, DisposalMethod::Keep, Some(2)),
        ]);
        let image = AnimatedImage::decode(bytes.as_slice()).unwrap();
        let mut compositor = image.compositor();

        let canvas = compositor.advance_to(1);
        assert!(canvas.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
    }
}
