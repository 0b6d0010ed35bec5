use std::fmt;

pub struct Swatch {
  pub color: &'static str,
  pub name:  &'static str
}

pub const PALETTE: [Swatch; 16] = [
  Swatch {
    color: "#6B8E88",
    name:  "Celadon"
  },
  Swatch {
    color: "#9C8CB9",
    name:  "Dusty Purple"
  },
  Swatch {
    color: "#C98C93",
    name:  "Rouge"
  },
  Swatch {
    color: "#7FB0A2",
    name:  "Mint"
  },
  Swatch {
    color: "#6D7C8C",
    name:  "Slate"
  },
  Swatch {
    color: "#B59078",
    name:  "Clay"
  },
  Swatch {
    color: "#95A5A6",
    name:  "Concrete"
  },
  Swatch {
    color: "#D4A5D9",
    name:  "Lilac"
  },
  Swatch {
    color: "#889EAF",
    name:  "Steel"
  },
  Swatch {
    color: "#A49393",
    name:  "Cocoa"
  },
  Swatch {
    color: "#92A8D1",
    name:  "Serenity"
  },
  Swatch {
    color: "#D7B19D",
    name:  "Almond"
  },
  Swatch {
    color: "#95B3A5",
    name:  "Seafoam"
  },
  Swatch {
    color: "#B098A4",
    name:  "Berry"
  },
  Swatch {
    color: "#869D9D",
    name:  "Teal"
  },
  Swatch {
    color: "#CBBBA0",
    name:  "Wheat"
  },
];

/// Selected palette entry. Persisted as its colour string.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq,
)]
pub struct Theme(usize);

impl Theme {
  pub fn from_index(
    index: usize
  ) -> Option<Self> {
    (index < PALETTE.len())
      .then_some(Self(index))
  }

  /// Unknown colours fall back to the first entry.
  pub fn from_color(color: &str) -> Self {
    Self::find_color(color)
      .unwrap_or_default()
  }

  /// Picks an entry by its 1-based position in the palette listing, its
  /// name, or its colour. Matching ignores case.
  pub fn parse(raw: &str) -> Option<Self> {
    let raw = raw.trim();
    if raw.starts_with('#') {
      return Self::find_color(raw);
    }
    if let Ok(position) = raw.parse::<usize>()
    {
      return position
        .checked_sub(1)
        .and_then(Self::from_index);
    }
    PALETTE
      .iter()
      .position(|swatch| {
        swatch.name.eq_ignore_ascii_case(raw)
      })
      .map(Self)
  }

  fn find_color(color: &str) -> Option<Self> {
    PALETTE
      .iter()
      .position(|swatch| {
        swatch
          .color
          .eq_ignore_ascii_case(color.trim())
      })
      .map(Self)
  }

  pub fn index(&self) -> usize {
    self.0
  }

  pub fn color(&self) -> &'static str {
    PALETTE[self.0].color
  }

  pub fn name(&self) -> &'static str {
    PALETTE[self.0].name
  }

  /// Red, green and blue channels of the colour.
  pub fn rgb(&self) -> (u8, u8, u8) {
    let hex = self
      .color()
      .trim_start_matches('#');
    let channel = |at: usize| {
      hex
        .get(at..at + 2)
        .and_then(|pair| {
          u8::from_str_radix(pair, 16).ok()
        })
        .unwrap_or_default()
    };
    (channel(0), channel(2), channel(4))
  }
}

impl fmt::Display for Theme {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{} ({})",
      self.name(),
      self.color()
    )
  }
}

#[cfg(test)]
mod tests {
  use super::{
    PALETTE,
    Theme
  };

  #[test]
  fn colours_round_trip_and_unknown_falls_back()
  {
    for (index, swatch) in
      PALETTE.iter().enumerate()
    {
      assert_eq!(
        Theme::from_color(swatch.color)
          .index(),
        index
      );
    }
    assert_eq!(
      Theme::from_color("#92a8d1").name(),
      "Serenity"
    );
    assert_eq!(
      Theme::from_color("#000000"),
      Theme::default()
    );
    assert_eq!(
      Theme::default().name(),
      "Celadon"
    );
    assert!(Theme::from_index(16).is_none());
  }

  #[test]
  fn parse_accepts_position_name_or_colour() {
    assert_eq!(
      Theme::parse("1"),
      Some(Theme::default())
    );
    assert_eq!(
      Theme::parse("16").map(|t| t.name()),
      Some("Wheat")
    );
    assert_eq!(
      Theme::parse("dusty purple")
        .map(|t| t.index()),
      Some(1)
    );
    assert_eq!(
      Theme::parse(" #a49393 ")
        .map(|t| t.name()),
      Some("Cocoa")
    );
    assert_eq!(Theme::parse("0"), None);
    assert_eq!(Theme::parse("17"), None);
    assert_eq!(Theme::parse("#000000"), None);
    assert_eq!(Theme::parse("plaid"), None);
  }

  #[test]
  fn rgb_channels_come_from_the_hex() {
    assert_eq!(
      Theme::default().rgb(),
      (0x6B, 0x8E, 0x88)
    );
    assert_eq!(
      Theme::parse("Wheat")
        .map(|t| t.rgb()),
      Some((0xCB, 0xBB, 0xA0))
    );
  }
}
