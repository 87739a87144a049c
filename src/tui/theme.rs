use ratatui::style::Color;

/// Explicit color palette handed to the renderer at construction.
/// No process-wide mutable style state.
#[derive(Debug, Clone)]
pub struct Theme {
    pub logo_coral: Color,
    pub logo_gold: Color,
    pub logo_blue: Color,
    pub logo_mint: Color,

    pub text: Color,
    pub text_dim: Color,
    pub guide: Color,

    pub status_running: Color,
    pub status_waiting: Color,
    pub status_idle: Color,
    pub status_error: Color,
    pub status_starting: Color,

    pub badge_open: Color,
    pub badge_merged: Color,
    pub badge_closed: Color,

    pub error: Color,
    pub select_mark: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            logo_coral: Color::Rgb(232, 131, 136),
            logo_gold: Color::Rgb(219, 171, 121),
            logo_blue: Color::Rgb(124, 175, 194),
            logo_mint: Color::Rgb(161, 193, 129),

            text: Color::Rgb(255, 255, 255),
            text_dim: Color::Rgb(136, 136, 136),
            guide: Color::Rgb(100, 100, 100),

            status_running: Color::Rgb(161, 193, 129),
            status_waiting: Color::Rgb(219, 171, 121),
            status_idle: Color::Rgb(136, 136, 136),
            status_error: Color::Rgb(232, 131, 136),
            status_starting: Color::Rgb(124, 175, 194),

            badge_open: Color::Rgb(161, 193, 129),
            badge_merged: Color::Rgb(124, 175, 194),
            badge_closed: Color::Rgb(232, 131, 136),

            error: Color::Rgb(232, 131, 136),
            select_mark: Color::Rgb(219, 171, 121),
        }
    }

    pub fn light() -> Self {
        Self {
            text: Color::Rgb(20, 20, 20),
            text_dim: Color::Rgb(110, 110, 110),
            guide: Color::Rgb(160, 160, 160),
            ..Self::dark()
        }
    }

    /// Resolve a configured theme name; unknown names fall back to dark.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some("light") => Self::light(),
            _ => Self::dark(),
        }
    }
}
