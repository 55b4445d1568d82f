//! Physical units and SI prefixes for value literals.

use std::fmt;

/// Base SI unit a value literal resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Ohm,
    Farad,
    Henry,
    Volt,
    Ampere,
    Hertz,
    Second,
}

impl Unit {
    /// Match an unprefixed unit symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "ohm" => Some(Self::Ohm),
            "F" => Some(Self::Farad),
            "H" => Some(Self::Henry),
            "V" => Some(Self::Volt),
            "A" => Some(Self::Ampere),
            "Hz" => Some(Self::Hertz),
            "s" => Some(Self::Second),
            _ => None,
        }
    }

    /// Canonical symbol, as written in source.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Ohm => "ohm",
            Self::Farad => "F",
            Self::Henry => "H",
            Self::Volt => "V",
            Self::Ampere => "A",
            Self::Hertz => "Hz",
            Self::Second => "s",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Scale factor for an SI prefix letter.
///
/// | prefix | f | p | n | u | m | k | M | G |
/// |--------|---|---|---|---|---|---|---|---|
/// | power  | -15 | -12 | -9 | -6 | -3 | 3 | 6 | 9 |
pub fn prefix_scale(prefix: char) -> Option<f64> {
    match prefix {
        'f' => Some(1e-15),
        'p' => Some(1e-12),
        'n' => Some(1e-9),
        'u' => Some(1e-6),
        'm' => Some(1e-3),
        'k' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        _ => None,
    }
}

/// Parse a (possibly prefixed) unit word such as `kohm`, `uF` or `MHz`.
///
/// An exact base symbol wins over a prefix reading, so `F` is farad rather
/// than a dangling femto prefix.
pub fn parse_unit(word: &str) -> Option<(f64, Unit)> {
    if let Some(unit) = Unit::from_symbol(word) {
        return Some((1.0, unit));
    }
    let mut chars = word.chars();
    let prefix = chars.next()?;
    let scale = prefix_scale(prefix)?;
    let unit = Unit::from_symbol(chars.as_str())?;
    Some((scale, unit))
}

/// A number literal with an optional unit, already scaled to base SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Literal {
    pub value: f64,
    pub unit: Option<Unit>,
}

impl Literal {
    pub fn new(value: f64, unit: Option<Unit>) -> Self {
        Self { value, unit }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{} {}", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A magnitude bound to exactly one base unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    value: f64,
    unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn base_symbols_take_precedence() {
        assert_eq!(parse_unit("F"), Some((1.0, Unit::Farad)));
        assert_eq!(parse_unit("Hz"), Some((1.0, Unit::Hertz)));
        assert_eq!(parse_unit("s"), Some((1.0, Unit::Second)));
    }

    #[test]
    fn prefixed_units() {
        let (scale, unit) = parse_unit("kohm").unwrap();
        assert_eq!(unit, Unit::Ohm);
        assert_relative_eq!(scale, 1e3);

        let (scale, unit) = parse_unit("uF").unwrap();
        assert_eq!(unit, Unit::Farad);
        assert_relative_eq!(scale, 1e-6);

        let (scale, unit) = parse_unit("MHz").unwrap();
        assert_eq!(unit, Unit::Hertz);
        assert_relative_eq!(scale, 1e6);

        let (scale, unit) = parse_unit("fF").unwrap();
        assert_eq!(unit, Unit::Farad);
        assert_relative_eq!(scale, 1e-15);
    }

    #[test]
    fn rejects_unknown_words() {
        assert_eq!(parse_unit("ohms"), None);
        assert_eq!(parse_unit("kx"), None);
        assert_eq!(parse_unit("x"), None);
        assert_eq!(parse_unit(""), None);
    }
}
