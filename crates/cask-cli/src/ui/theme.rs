//! Colors and column widths shared by all output.

use crossterm::style::Color;

/// Palette.
#[derive(Debug, Clone, Copy)]
pub struct Colors {
    pub token: Color,
    pub version: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub secondary: Color,
    pub header: Color,
}

/// Column widths.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub label_width: usize,
    pub token_width: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub colors: Colors,
    pub layout: Layout,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: Colors {
                token: Color::Cyan,
                version: Color::White,
                success: Color::Green,
                warning: Color::Yellow,
                error: Color::Red,
                secondary: Color::DarkGrey,
                header: Color::Blue,
            },
            layout: Layout {
                label_width: 12,
                token_width: 32,
            },
        }
    }
}
