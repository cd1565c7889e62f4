use serde::{Deserialize, Serialize};

/// Color RGB de 8 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

const TAB10: [(&str, Rgb); 10] = [("blue", Rgb(31, 119, 180)),
                                  ("orange", Rgb(255, 127, 14)),
                                  ("green", Rgb(44, 160, 44)),
                                  ("red", Rgb(214, 39, 40)),
                                  ("purple", Rgb(148, 103, 189)),
                                  ("brown", Rgb(140, 86, 75)),
                                  ("pink", Rgb(227, 119, 194)),
                                  ("gray", Rgb(127, 127, 127)),
                                  ("olive", Rgb(188, 189, 34)),
                                  ("cyan", Rgb(23, 190, 207))];

/// Paleta categórica fija (tab10), compartida por todas las figuras.
#[derive(Debug, Clone, Copy, Default)]
pub struct Palette;

impl Palette {
    /// Color `i` (cíclico).
    pub fn color(&self, i: usize) -> Rgb {
        TAB10[i % TAB10.len()].1
    }

    pub fn named(&self, name: &str) -> Option<Rgb> {
        TAB10.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        TAB10.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
