use iced::theme::Palette;
use iced::{Color, Theme};

use crate::settings::Appearance;

/// Colours for recognized and unrecognized face boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayColors {
    pub known: Color,
    pub unknown: Color,
}

impl OverlayColors {
    /// Known faces use the palette's success colour, unknown ones its danger colour.
    pub fn from_theme(theme: &Theme) -> Self {
        let palette = theme.palette();
        Self {
            known: palette.success,
            unknown: palette.danger,
        }
    }
}

pub fn resolve_theme(appearance: Appearance) -> Theme {
    let palette = if is_dark(appearance) {
        video_dark()
    } else {
        video_light()
    };
    Theme::custom("Facestamp", palette)
}

fn is_dark(appearance: Appearance) -> bool {
    match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => detect_system_dark_mode(),
    }
}

/// Box colours stay saturated so they read over any camera image.
fn video_dark() -> Palette {
    Palette {
        background: Color::from_rgb8(0x12, 0x12, 0x14),
        text: Color::from_rgb8(0xe6, 0xe6, 0xe6),
        primary: Color::from_rgb8(0x5e, 0x9f, 0xf5),
        success: Color::from_rgb8(0x00, 0xe6, 0x76),
        warning: Color::from_rgb8(0xff, 0xc4, 0x00),
        danger: Color::from_rgb8(0xff, 0x17, 0x44),
    }
}

fn video_light() -> Palette {
    Palette {
        background: Color::from_rgb8(0xf5, 0xf5, 0xf7),
        text: Color::from_rgb8(0x1d, 0x1d, 0x1f),
        success: Color::from_rgb8(0x00, 0xc8, 0x53),
        danger: Color::from_rgb8(0xe5, 0x39, 0x35),
        ..video_dark()
    }
}

fn detect_system_dark_mode() -> bool {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("defaults")
            .args(["read", "-g", "AppleInterfaceStyle"])
            .output()
            .map(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .trim()
                    .eq_ignore_ascii_case("dark")
            })
            .unwrap_or(true)
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}
