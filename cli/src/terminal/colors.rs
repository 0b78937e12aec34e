use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 94, g: 200, b: 160 };
pub const ACCENT: Color = Color::TrueColor { r: 240, g: 190, b: 90 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 210, g: 210, b: 210 };
pub const IPV4_ADDR: Color = Color::TrueColor { r: 120, g: 170, b: 255 };

pub const LATENCY_FAST: Color = Color::Green;
pub const LATENCY_OK: Color = Color::Yellow;
pub const LATENCY_SLOW: Color = Color::Red;
