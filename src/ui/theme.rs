use ratatui::style::Color;

/// Four-colour palette. Everything the display shows is either page, text,
/// idle or accent; the running state, the lit beat and status messages all
/// share the accent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub background: Color,
    /// Values and labels
    pub text: Color,
    /// Borders, hints, the unlit beat and the stopped state
    pub idle: Color,
    pub accent: Color,
}

const THEMES: [Theme; 5] = [
    // Terminal's own ANSI colours
    Theme {
        name: "default",
        background: Color::Reset,
        text: Color::Reset,
        idle: Color::DarkGray,
        accent: Color::Yellow,
    },
    // Grey on white with an orange accent
    Theme {
        name: "ember",
        background: Color::Rgb(255, 255, 255),
        text: Color::Rgb(88, 88, 88),
        idle: Color::Rgb(119, 119, 119),
        accent: Color::Rgb(238, 119, 15),
    },
    // Ember's accent on a dark page
    Theme {
        name: "night",
        background: Color::Rgb(20, 20, 26),
        text: Color::Rgb(205, 205, 215),
        idle: Color::Rgb(85, 85, 100),
        accent: Color::Rgb(238, 119, 15),
    },
    Theme {
        name: "mint",
        background: Color::Black,
        text: Color::Rgb(195, 235, 215),
        idle: Color::Rgb(55, 105, 85),
        accent: Color::Rgb(80, 225, 155),
    },
    Theme {
        name: "mono",
        background: Color::Black,
        text: Color::White,
        idle: Color::Gray,
        accent: Color::White,
    },
];

impl Theme {
    pub fn from_name(name: &str) -> Option<Self> {
        THEMES.iter().find(|theme| theme.name == name).copied()
    }

    pub fn available_themes() -> impl Iterator<Item = &'static str> {
        THEMES.iter().map(|theme| theme.name)
    }
}

impl Default for Theme {
    fn default() -> Self {
        THEMES[0]
    }
}
