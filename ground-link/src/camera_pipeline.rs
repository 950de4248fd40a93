//! Raw camera frames to base64 JPEG payloads.

use std::collections::VecDeque;
use std::time::Instant;

use base64::Engine;
use bytes::Bytes;
use flight_control::RawFrame;
use flight_protocol::{CameraBlock, CameraId};
use image::{ImageBuffer, RgbImage};

use crate::error::LinkError;

/// Brightness kept when rendering the secondary view (30% toward black)
const SECONDARY_BRIGHTNESS: f32 = 0.7;
/// Frame intervals averaged into the reported rate
const FPS_WINDOW: usize = 10;

/// A compressed frame ready to go on the wire.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub jpeg_data: Bytes,
    pub width: u32,
    pub height: u32,
    pub camera: CameraId,
    pub fps: f64,
}

impl EncodedFrame {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.jpeg_data)
    }

    /// Camera section of an outbound message.
    pub fn camera_block(&self) -> CameraBlock {
        CameraBlock {
            width: self.width,
            height: self.height,
            data: self.to_base64(),
            active: self.camera,
            resolution: format!("{}x{}", self.width, self.height),
            fps: round_to(self.fps, 1),
        }
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Encodes frames for the active camera and tracks the encode rate.
#[derive(Debug, Clone)]
pub struct CameraPipeline {
    quality: u8,
    active: CameraId,
    /// Recent instantaneous rates, oldest first
    fps_samples: VecDeque<f64>,
    last_frame_time: Option<Instant>,
    total_frames: u64,
}

impl CameraPipeline {
    /// `quality` is the JPEG quality, 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            active: CameraId::Primary,
            fps_samples: VecDeque::with_capacity(FPS_WINDOW),
            last_frame_time: None,
            total_frames: 0,
        }
    }

    pub fn active_camera(&self) -> CameraId {
        self.active
    }

    pub fn set_active_camera(&mut self, camera: CameraId) {
        if camera != self.active {
            tracing::info!("Active camera {} -> {}", self.active, camera);
            self.active = camera;
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Average frame rate over the recent window.
    pub fn fps(&self) -> f64 {
        if self.fps_samples.is_empty() {
            0.0
        } else {
            self.fps_samples.iter().sum::<f64>() / self.fps_samples.len() as f64
        }
    }

    /// Note that a frame was produced at `now`.
    pub fn record_frame_at(&mut self, now: Instant) {
        if let Some(last) = self.last_frame_time {
            let elapsed = now.duration_since(last).as_secs_f64();
            if elapsed > 0.0 {
                if self.fps_samples.len() >= FPS_WINDOW {
                    self.fps_samples.pop_front();
                }
                self.fps_samples.push_back(1.0 / elapsed);
            }
        }
        self.last_frame_time = Some(now);
        self.total_frames += 1;
    }

    /// Compress `frame` as seen through the active camera.
    pub fn encode(&mut self, frame: &RawFrame) -> Result<EncodedFrame, LinkError> {
        self.encode_at(frame, Instant::now())
    }

    pub fn encode_at(&mut self, frame: &RawFrame, now: Instant) -> Result<EncodedFrame, LinkError> {
        let image = bgra_to_rgb(frame)?;
        let image = match self.active {
            CameraId::Primary => image,
            CameraId::Secondary => secondary_view(&image),
        };
        let jpeg_data = encode_rgb_jpeg(&image, self.quality)?;

        self.record_frame_at(now);
        Ok(EncodedFrame {
            jpeg_data,
            width: frame.width,
            height: frame.height,
            camera: self.active,
            fps: self.fps(),
        })
    }
}

/// Drop the alpha channel and reorder BGRA to RGB.
pub fn bgra_to_rgb(frame: &RawFrame) -> Result<RgbImage, LinkError> {
    let expected = RawFrame::expected_len(frame.width, frame.height);
    if frame.data.len() != expected {
        return Err(LinkError::FrameSize {
            expected,
            actual: frame.data.len(),
        });
    }

    let rgb: Vec<u8> = frame
        .data
        .chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect();
    ImageBuffer::from_raw(frame.width, frame.height, rgb).ok_or(LinkError::FrameSize {
        expected,
        actual: frame.data.len(),
    })
}

/// Rotate 180 degrees and darken.
pub fn secondary_view(image: &RgbImage) -> RgbImage {
    let mut rotated = image::imageops::rotate180(image);
    for channel in rotated.iter_mut() {
        *channel = (*channel as f32 * SECONDARY_BRIGHTNESS).round() as u8;
    }
    rotated
}

pub fn encode_rgb_jpeg(image: &RgbImage, quality: u8) -> Result<Bytes, LinkError> {
    let mut jpeg_bytes = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_bytes, quality);
    encoder.encode_image(image)?;
    Ok(Bytes::from(jpeg_bytes))
}
