//! Colored key/value output for command results.

use colored::Color;

/// Format a key/value pair with optional color overrides.
///
/// Requires the `colored::Colorize` trait to be in scope.
macro_rules! fmt_kv {
    ($key:expr, $value:expr $(,)?) => {
        $crate::output::fmt_kv!(
            $key,
            $value,
            $crate::output::LogColor::Highlight,
            $crate::output::LogColor::FadedGray
        )
    };
    ($key:expr, $value:expr, $key_color:expr $(,)?) => {
        $crate::output::fmt_kv!($key, $value, $key_color, $crate::output::LogColor::FadedGray)
    };
    ($key:expr, $value:expr, $key_color:expr, $value_color:expr $(,)?) => {{
        let __k = ::std::format!("{:>18}", $key);
        let __v = ::std::string::ToString::to_string(&$value);
        ::std::format!(
            "{}: {}",
            __k.color(::colored::Color::from($key_color)),
            __v.color(::colored::Color::from($value_color))
        )
    }};
}

/// Print a key/value pair with optional color overrides.
macro_rules! print_kv {
    ($key:expr, $value:expr $(,)?) => {
        ::std::println!("{}", $crate::output::fmt_kv!($key, $value))
    };
    ($key:expr, $value:expr, $key_color:expr $(,)?) => {
        ::std::println!("{}", $crate::output::fmt_kv!($key, $value, $key_color))
    };
}

pub(crate) use {fmt_kv, print_kv};

#[derive(Clone, Copy, Debug)]
pub enum LogColor {
    Highlight,
    Error,
    Warning,
    Header,
    Info,
    FadedGray,
}

impl From<LogColor> for Color {
    fn from(value: LogColor) -> Color {
        match value {
            LogColor::Highlight => Color::TrueColor { r: 255, g: 215, b: 87 },
            LogColor::Error => Color::TrueColor { r: 255, g: 0, b: 45 },
            LogColor::Warning => Color::TrueColor { r: 180, g: 105, b: 0 },
            LogColor::Header => Color::TrueColor { r: 0, g: 255, b: 0 },
            LogColor::Info => Color::TrueColor { r: 0, g: 95, b: 255 },
            LogColor::FadedGray => Color::TrueColor { r: 95, g: 95, b: 95 },
        }
    }
}

pub fn header(title: &str) {
    use colored::Colorize;
    println!("{}", title.color(Color::from(LogColor::Header)).bold());
}
