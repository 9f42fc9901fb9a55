use std::borrow::Cow;

use colored::Colorize;

use crate::print::Palette;

/// ANSI colors: blue node names, green property names, yellow values, white brackets.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnsiPalette;

impl Palette for AnsiPalette {
    fn node_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Owned(name.bright_blue().to_string())
    }

    fn prop_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Owned(name.bright_green().to_string())
    }

    fn value<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Owned(value.bright_yellow().to_string())
    }

    fn bracket<'a>(&self, bracket: &'a str) -> Cow<'a, str> {
        Cow::Owned(bracket.bright_white().to_string())
    }
}
