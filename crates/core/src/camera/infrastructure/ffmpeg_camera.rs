use ffmpeg_next::format::context::{Context, Input};
use ffmpeg_next::software::scaling;

use crate::camera::domain::camera_source::CameraSource;
use crate::shared::bounding_box::Dimensions;
use crate::shared::constants::CAPTURE_FRAMERATE;
use crate::shared::frame::Frame;

#[cfg(target_os = "linux")]
const INPUT_FORMAT: &str = "v4l2";
#[cfg(target_os = "macos")]
const INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const INPUT_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const INPUT_FORMAT: &str = "v4l2";

/// Device opened when none is configured. On Windows the `dshow` device
/// must be named, so this is only a common default.
pub fn default_device() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "0"
    }
    #[cfg(target_os = "windows")]
    {
        "video=Integrated Camera"
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        "/dev/video0"
    }
}

struct OpenStream {
    input: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

/// Live camera capture through an ffmpeg input device
/// (`v4l2`, `avfoundation` or `dshow` depending on the platform).
///
/// Converts each decoded frame to RGB24 and wraps it in a [`Frame`].
pub struct FfmpegCamera {
    device: String,
    stream: Option<OpenStream>,
    frame_index: usize,
}

// Safety: FfmpegCamera is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    pub fn new(device: Option<String>) -> Self {
        Self {
            device: device.unwrap_or_else(|| default_device().to_string()),
            stream: None,
            frame_index: 0,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }
}

impl CameraSource for FfmpegCamera {
    fn open(&mut self) -> Result<Dimensions, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name() == INPUT_FORMAT)
            .ok_or_else(|| format!("ffmpeg input device '{INPUT_FORMAT}' is not available"))?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set("framerate", &CAPTURE_FRAMERATE.to_string());

        let input = match ffmpeg_next::format::open_with(&self.device, &format, options)? {
            Context::Input(input) => input,
            Context::Output(_) => return Err(format!("{} is not a capture device", self.device).into()),
        };

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Opened camera {} via {INPUT_FORMAT}: {width}x{height}",
            self.device
        );
        self.frame_index = 0;
        self.stream = Some(OpenStream {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });
        Ok(Dimensions::new(width, height))
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err("FfmpegCamera: not opened".into());
        };

        loop {
            if let Some(frame) = stream.receive(self.frame_index)? {
                self.frame_index += 1;
                return Ok(Some(frame));
            }

            let (index, packet) = match stream.input.packets().next() {
                Some((s, packet)) => (s.index(), packet),
                None => return Ok(None),
            };
            if index != stream.stream_index {
                continue;
            }
            if let Err(e) = stream.decoder.send_packet(&packet) {
                log::debug!("Dropping camera packet: {e}");
            }
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Closed camera {}", self.device);
        }
    }
}

impl OpenStream {
    fn receive(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        Ok(Some(Frame::new(pixels, self.width, self.height, 3, index)))
    }
}

fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
