//! Sensor frame-size classes and their pixel dimensions
//!
//! The class index is the camera sensor's own frame-size enumeration, so the
//! ordering below is an external contract and must track the sensor driver.

use serde::{Deserialize, Serialize};

/// Revision of [`FRAME_SIZE_TABLE`], bump whenever the sensor enumeration changes
pub const FRAME_SIZE_TABLE_VERSION: u32 = 1;

/// Class index -> (width, height), in sensor enumeration order
pub const FRAME_SIZE_TABLE: [(u16, u16); 14] = [
    (96, 96),
    (160, 120),
    (176, 144),
    (240, 176),
    (240, 240),
    (320, 240),
    (400, 296),
    (480, 320),
    (640, 480),
    (800, 600),
    (1024, 768),
    (1280, 720),
    (1280, 1024),
    (1600, 1200),
];

/// Frame size classes reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameSize {
    Square96,
    Qqvga,
    Qcif,
    Hqvga,
    Square240,
    Qvga,
    Cif,
    Hvga,
    Vga,
    Svga,
    Xga,
    Hd,
    Sxga,
    Uxga,
}

impl FrameSize {
    const ALL: [FrameSize; 14] = [
        FrameSize::Square96,
        FrameSize::Qqvga,
        FrameSize::Qcif,
        FrameSize::Hqvga,
        FrameSize::Square240,
        FrameSize::Qvga,
        FrameSize::Cif,
        FrameSize::Hvga,
        FrameSize::Vga,
        FrameSize::Svga,
        FrameSize::Xga,
        FrameSize::Hd,
        FrameSize::Sxga,
        FrameSize::Uxga,
    ];

    /// Look up a class index as encoded in clip names
    pub fn from_class(class: u32) -> Option<Self> {
        Self::ALL.get(class as usize).copied()
    }

    /// Sensor class index
    pub fn class(self) -> u32 {
        self as u32
    }

    /// Pixel dimensions (width, height)
    pub fn dimensions(self) -> (u16, u16) {
        FRAME_SIZE_TABLE[self as usize]
    }

    /// Short label used by the camera UI
    pub fn label(self) -> &'static str {
        match self {
            FrameSize::Square96 => "96X96",
            FrameSize::Qqvga => "QQVGA",
            FrameSize::Qcif => "QCIF",
            FrameSize::Hqvga => "HQVGA",
            FrameSize::Square240 => "240X240",
            FrameSize::Qvga => "QVGA",
            FrameSize::Cif => "CIF",
            FrameSize::Hvga => "HVGA",
            FrameSize::Vga => "VGA",
            FrameSize::Svga => "SVGA",
            FrameSize::Xga => "XGA",
            FrameSize::Hd => "HD",
            FrameSize::Sxga => "SXGA",
            FrameSize::Uxga => "UXGA",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_and_enum_agree() {
        for (class, size) in FrameSize::ALL.iter().enumerate() {
            assert_eq!(size.class() as usize, class);
            assert_eq!(FrameSize::from_class(class as u32), Some(*size));
        }
        assert_eq!(FrameSize::from_class(14), None);
    }

    #[test]
    fn test_known_dimensions() {
        assert_eq!(FrameSize::Vga.dimensions(), (640, 480));
        assert_eq!(FrameSize::from_class(8), Some(FrameSize::Vga));
        assert_eq!(FrameSize::Uxga.dimensions(), (1600, 1200));
        assert_eq!(FrameSize::Hd.label(), "HD");
    }
}
