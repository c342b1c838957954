use eframe::egui::{Color32, Visuals};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub(super) fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
        }
    }

    pub(super) fn visuals(self) -> Visuals {
        match self {
            Self::Light => Visuals::light(),
            Self::Dark => Visuals::dark(),
        }
    }

    pub(super) fn palette(self) -> Palette {
        match self {
            Self::Light => Palette {
                light: Color32::from_rgb(0xfa, 0xf8, 0xf8),
                lightgray: Color32::from_rgb(0xe5, 0xe5, 0xe5),
                gray: Color32::from_rgb(0xb8, 0xb8, 0xb8),
                darkgray: Color32::from_rgb(0x4e, 0x4e, 0x4e),
                dark: Color32::from_rgb(0x2b, 0x2b, 0x2b),
                secondary: Color32::from_rgb(0x28, 0x4b, 0x63),
                tertiary: Color32::from_rgb(0x84, 0xa5, 0x9d),
            },
            Self::Dark => Palette {
                light: Color32::from_rgb(0x16, 0x16, 0x18),
                lightgray: Color32::from_rgb(0x39, 0x36, 0x39),
                gray: Color32::from_rgb(0x64, 0x64, 0x64),
                darkgray: Color32::from_rgb(0xd4, 0xd4, 0xd4),
                dark: Color32::from_rgb(0xeb, 0xeb, 0xec),
                secondary: Color32::from_rgb(0x7b, 0x97, 0xaa),
                tertiary: Color32::from_rgb(0x84, 0xa5, 0x9d),
            },
        }
    }
}

/// Theme colours the graph scene draws with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Palette {
    pub(super) light: Color32,
    pub(super) lightgray: Color32,
    pub(super) gray: Color32,
    pub(super) darkgray: Color32,
    pub(super) dark: Color32,
    pub(super) secondary: Color32,
    pub(super) tertiary: Color32,
}
