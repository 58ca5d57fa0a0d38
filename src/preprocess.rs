//! Upload bytes to model input.
//!
//! Any container the `image` crate can sniff is accepted. The picture is
//! stretched to 224x224 with bicubic filtering, without keeping the aspect
//! ratio, then flattened to RGB and handed over as raw 0-255 intensities;
//! rescaling lives inside the model.

use std::io::Cursor;

use image::imageops::FilterType;
use image::io::Reader as ImageReader;
use image::RgbImage;
use ndarray::Array4;
use thiserror::Error;

pub const INPUT_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("upload is empty")]
    Empty,
    #[error("could not read image header: {0}")]
    Header(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Axis order of the input tensor expected by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TensorLayout {
    /// `[batch, height, width, channels]`, as exported from Keras.
    #[default]
    Nhwc,
    /// `[batch, channels, height, width]`, as exported from PyTorch.
    Nchw,
}

impl TensorLayout {
    pub fn input_shape(self) -> [usize; 4] {
        let side = INPUT_SIZE as usize;
        match self {
            TensorLayout::Nhwc => [1, side, side, CHANNELS],
            TensorLayout::Nchw => [1, CHANNELS, side, side],
        }
    }
}

/// Decodes `bytes` and resizes the result to the model's input size.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let image = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    Ok(image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
        .to_rgb8())
}

/// Lays a decoded image out as a batch of one.
pub fn to_batch(image: &RgbImage, layout: TensorLayout) -> Array4<f32> {
    let [n, a, b, c] = layout.input_shape();
    Array4::from_shape_fn((n, a, b, c), |(_, i, j, k)| {
        let (x, y, channel) = match layout {
            TensorLayout::Nhwc => (j, i, k),
            TensorLayout::Nchw => (k, j, i),
        };
        image.get_pixel(x as u32, y as u32)[channel] as f32
    })
}

pub fn preprocess(bytes: &[u8], layout: TensorLayout) -> Result<Array4<f32>, DecodeError> {
    decode(bytes).map(|image| to_batch(&image, layout))
}
