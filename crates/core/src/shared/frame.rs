use crate::shared::resolution::Resolution;

/// One captured image: contiguous RGB bytes in row-major order, tagged with
/// the sequence number its capture source assigned.
///
/// Frames are transient. The capture loop forwards each one to the writer
/// and drops it.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A frame filled with a single byte value.
    pub fn solid(resolution: Resolution, channels: u8, value: u8, index: usize) -> Self {
        Self::new(
            vec![value; resolution.frame_len(channels)],
            resolution.width,
            resolution.height,
            channels,
            index,
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert_eq!(frame.resolution(), Resolution::new(2, 2));
    }

    #[test]
    fn test_solid_fills_every_byte() {
        let frame = Frame::solid(Resolution::new(4, 3), 3, 77, 9);
        assert_eq!(frame.data().len(), 36);
        assert!(frame.data().iter().all(|&b| b == 77));
        assert_eq!(frame.index(), 9);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }
}
