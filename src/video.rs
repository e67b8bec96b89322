use std::{
    net::UdpSocket,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use image::RgbImage;
use openh264::{decoder::Decoder, formats::YUVSource};

use crate::{error::TelloError, utils, SharedFrame};

/// Size of a full video datagram. A shorter one closes the current access unit.
pub const VIDEO_PACKET_SIZE: usize = 1460;
const MAX_FRAME_BYTES: usize = 2 * 1024 * 1024;

/// Glues H.264 datagrams back into whole access units.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buff: Vec<u8>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, packet: &[u8]) -> Option<Vec<u8>> {
        if self.buff.len() + packet.len() > MAX_FRAME_BYTES {
            tracing::warn!(
                buffered = self.buff.len(),
                "video frame too large, dropping partial data"
            );
            self.buff.clear();
        }
        self.buff.extend_from_slice(packet);
        if packet.len() == VIDEO_PACKET_SIZE {
            return None;
        }
        Some(std::mem::take(&mut self.buff))
    }
}

pub(crate) fn decode_rgb(
    decoder: &mut Decoder,
    unit: &[u8],
) -> Result<Option<RgbImage>, TelloError> {
    let yuv = match decoder.decode(unit) {
        Ok(Some(yuv)) => yuv,
        Ok(None) => return Ok(None),
        Err(e) => return Err(TelloError::Decode(e.to_string())),
    };
    let (w, h) = yuv.dimensions();
    let mut rgb = vec![0u8; w * h * 3];
    yuv.write_rgb8(&mut rgb);
    let img = RgbImage::from_raw(w as u32, h as u32, rgb)
        .ok_or_else(|| TelloError::Decode(format!("bad frame geometry {w}x{h}")))?;
    Ok(Some(img))
}

/// Background reader that keeps only the newest decoded frame.
#[derive(Debug)]
pub struct FrameReader {
    frame: SharedFrame,
    handle: Option<JoinHandle<()>>,
}

impl FrameReader {
    pub(crate) fn start(conn: UdpSocket, stopped: Arc<AtomicBool>) -> Self {
        let frame = SharedFrame::default();
        let published = frame.clone();
        let handle = thread::Builder::new()
            .name("tello-video".to_owned())
            .spawn(move || video_receiver(conn, published, stopped))
            .map_err(|e| tracing::error!("can't spawn video receiver: {}", e))
            .ok();
        Self { frame, handle }
    }

    pub fn frame(&self) -> Result<Arc<RgbImage>, TelloError> {
        let g = self.frame.read().map_err(|_| TelloError::NoFrame)?;
        g.clone().ok_or(TelloError::NoFrame)
    }

    pub(crate) fn join(&mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn video_receiver(conn: UdpSocket, frame: SharedFrame, stopped: Arc<AtomicBool>) {
    let method_name = "video_recv";
    let mut decoder = match Decoder::new() {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(method_name, "can't create h264 decoder: {}", e);
            return;
        }
    };
    let mut assembler = FrameAssembler::new();
    let mut buff: [u8; 2048] = [0; 2048];

    while !stopped.load(Ordering::Relaxed) {
        let nread = match conn.recv(&mut buff) {
            Ok(n) => n,
            Err(e) if utils::is_timeout(&e) => continue,
            Err(e) => {
                tracing::warn!(method_name, "udp read error: {}", e);
                continue;
            }
        };
        tracing::trace!(method_name, nread, "read video stream data");
        let Some(unit) = assembler.push(&buff[..nread]) else {
            continue;
        };
        match decode_rgb(&mut decoder, &unit) {
            Ok(Some(img)) => match frame.write() {
                Ok(mut g) => *g = Some(Arc::new(img)),
                Err(e) => tracing::error!(method_name, "frame lock poisoned: {}", e),
            },
            Ok(None) => tracing::debug!(method_name, "incomplete frame, dropped"),
            Err(e) => tracing::debug!(method_name, "{}", e),
        }
    }
    tracing::debug!(method_name, "video receiver finished");
}
