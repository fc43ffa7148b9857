//! Physical quantities that carry every supported unit at once.
//!
//! Each type is built from at most one input unit and derives the others
//! with fixed linear conversions. A value built without any input is
//! "empty": every field is `None`, which is distinct from a measured zero.

use std::fmt;

use serde::Serialize;

use crate::error::ValidationError;

/// What an empty value renders as.
pub const NULL_DISPLAY: &str = "<null>";

pub const KM_PER_MILE: f64 = 1.609;
pub const MM_PER_INCH: f64 = 25.4;
pub const KPH_PER_MS: f64 = 3.6;

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Shared behaviour of the unit value types, driven by an explicit field list.
pub trait UnitValue {
    /// Numeric fields in declaration order, keyed by their template name.
    fn fields(&self) -> Vec<(&'static str, Option<f64>)>;

    /// Text fields available to templates (only `Direction` has one).
    fn labels(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    fn default_template(&self) -> &'static str;

    fn has_data(&self) -> bool {
        self.fields().iter().any(|(_, value)| value.is_some())
    }

    /// Substitute `${field}` placeholders with values rounded to `decimal_places`.
    ///
    /// Unset fields render as [`NULL_DISPLAY`]; `$$` is a literal `$`.
    fn format_with(&self, template: &str, decimal_places: usize) -> String {
        if !self.has_data() {
            return NULL_DISPLAY.to_string();
        }

        let mut values: Vec<(&str, String)> = self
            .fields()
            .into_iter()
            .map(|(name, value)| {
                let rendered = match value {
                    Some(v) => format!("{v:.decimal_places$}"),
                    None => NULL_DISPLAY.to_string(),
                };
                (name, rendered)
            })
            .collect();
        values.extend(self.labels().into_iter().map(|(name, label)| (name, label.to_string())));

        substitute(template, &values)
    }

    fn format(&self) -> String {
        self.format_with(self.default_template(), 1)
    }
}

fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if let Some(after) = tail.strip_prefix('$') {
            out.push('$');
            rest = after;
        } else if let Some((name, after)) = tail.strip_prefix('{').and_then(|t| t.split_once('}')) {
            match values.iter().find(|(field, _)| *field == name) {
                Some((_, value)) => out.push_str(value),
                None => {
                    out.push_str("${");
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = after;
        } else {
            out.push('$');
            rest = tail;
        }
    }

    out.push_str(rest);
    out
}

/// Returns the index and value of the single supplied input, if any.
fn single_input<const N: usize>(
    kind: &'static str,
    units: &'static str,
    inputs: [Option<f64>; N],
) -> Result<Option<(usize, f64)>, ValidationError> {
    let mut given = inputs
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)));

    let first = given.next();
    if given.next().is_some() {
        return Err(ValidationError::ConflictingUnits { kind, units });
    }
    Ok(first)
}

macro_rules! impl_display {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.format())
                }
            }
        )+
    };
}

impl_display!(Temperature, Distance, Speed, Precipitation, Direction);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Temperature {
    c: Option<f64>,
    f: Option<f64>,
}

impl Temperature {
    pub fn new(c: Option<f64>, f: Option<f64>) -> Result<Self, ValidationError> {
        Ok(match single_input("temperature", "'c', 'f'", [c, f])? {
            Some((0, c)) => Self::celsius(c),
            Some((_, f)) => Self::fahrenheit(f),
            None => Self::default(),
        })
    }

    /// Like [`Temperature::new`], but `None` when no unit was given.
    pub fn optional(c: Option<f64>, f: Option<f64>) -> Result<Option<Self>, ValidationError> {
        Self::new(c, f).map(|t| t.has_data().then_some(t))
    }

    pub fn celsius(c: f64) -> Self {
        Self {
            c: Some(c),
            f: Some(c * 9.0 / 5.0 + 32.0),
        }
    }

    pub fn fahrenheit(f: f64) -> Self {
        Self {
            c: Some((f - 32.0) * 5.0 / 9.0),
            f: Some(f),
        }
    }

    pub fn c(&self) -> Option<f64> {
        self.c
    }

    pub fn f(&self) -> Option<f64> {
        self.f
    }
}

impl UnitValue for Temperature {
    fn fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("c", self.c), ("f", self.f)]
    }

    fn default_template(&self) -> &'static str {
        "${c}C / ${f}F"
    }
}

/// Distance (visibility and the like).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Distance {
    km: Option<f64>,
    mi: Option<f64>,
}

impl Distance {
    pub fn new(km: Option<f64>, mi: Option<f64>) -> Result<Self, ValidationError> {
        Ok(match single_input("distance", "'km', 'mi'", [km, mi])? {
            Some((0, km)) => Self::kilometers(km),
            Some((_, mi)) => Self::miles(mi),
            None => Self::default(),
        })
    }

    pub fn optional(km: Option<f64>, mi: Option<f64>) -> Result<Option<Self>, ValidationError> {
        Self::new(km, mi).map(|d| d.has_data().then_some(d))
    }

    pub fn kilometers(km: f64) -> Self {
        Self {
            km: Some(km),
            mi: Some(km / KM_PER_MILE),
        }
    }

    pub fn miles(mi: f64) -> Self {
        Self {
            km: Some(mi * KM_PER_MILE),
            mi: Some(mi),
        }
    }

    pub fn km(&self) -> Option<f64> {
        self.km
    }

    pub fn mi(&self) -> Option<f64> {
        self.mi
    }
}

impl UnitValue for Distance {
    fn fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("km", self.km), ("mi", self.mi)]
    }

    fn default_template(&self) -> &'static str {
        "${km}km / ${mi}mi"
    }
}

/// Unit family a provider reports speeds in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    Kph,
    Mph,
    Ms,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Speed {
    kph: Option<f64>,
    mph: Option<f64>,
    ms: Option<f64>,
}

impl Speed {
    pub fn new(
        kph: Option<f64>,
        mph: Option<f64>,
        ms: Option<f64>,
    ) -> Result<Self, ValidationError> {
        let given = single_input("speed", "'kph', 'mph', 'ms'", [kph, mph, ms])?;
        Ok(match given {
            Some((0, v)) => Self::from_unit(v, SpeedUnit::Kph),
            Some((1, v)) => Self::from_unit(v, SpeedUnit::Mph),
            Some((_, v)) => Self::from_unit(v, SpeedUnit::Ms),
            None => Self::default(),
        })
    }

    pub fn optional(
        kph: Option<f64>,
        mph: Option<f64>,
        ms: Option<f64>,
    ) -> Result<Option<Self>, ValidationError> {
        Self::new(kph, mph, ms).map(|s| s.has_data().then_some(s))
    }

    pub fn from_unit(value: f64, unit: SpeedUnit) -> Self {
        let kph = match unit {
            SpeedUnit::Kph => value,
            SpeedUnit::Mph => value * KM_PER_MILE,
            SpeedUnit::Ms => value * KPH_PER_MS,
        };

        // keep the supplied value untouched instead of round-tripping it
        Self {
            kph: Some(kph),
            mph: Some(if unit == SpeedUnit::Mph { value } else { kph / KM_PER_MILE }),
            ms: Some(if unit == SpeedUnit::Ms { value } else { kph / KPH_PER_MS }),
        }
    }

    pub fn kph(&self) -> Option<f64> {
        self.kph
    }

    pub fn mph(&self) -> Option<f64> {
        self.mph
    }

    pub fn ms(&self) -> Option<f64> {
        self.ms
    }
}

impl UnitValue for Speed {
    fn fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("kph", self.kph), ("mph", self.mph), ("ms", self.ms)]
    }

    fn default_template(&self) -> &'static str {
        "${kph}kph / ${mph}mph / ${ms}m/s"
    }
}

/// Precipitation amount plus an independent probability (0-100).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Precipitation {
    percentage: Option<f64>,
    mm: Option<f64>,
    inches: Option<f64>,
}

impl Precipitation {
    pub fn new(
        percentage: Option<f64>,
        mm: Option<f64>,
        inches: Option<f64>,
    ) -> Result<Self, ValidationError> {
        if let Some(p) = percentage {
            if !(0.0..=100.0).contains(&p) {
                return Err(ValidationError::PercentageOutOfRange(p));
            }
        }

        let (mm, inches) = match single_input("precipitation", "'mm', 'inches'", [mm, inches])? {
            Some((0, mm)) => (Some(mm), Some(mm / MM_PER_INCH)),
            Some((_, inches)) => (Some(inches * MM_PER_INCH), Some(inches)),
            None => (None, None),
        };

        Ok(Self {
            percentage,
            mm,
            inches,
        })
    }

    pub fn optional(
        percentage: Option<f64>,
        mm: Option<f64>,
        inches: Option<f64>,
    ) -> Result<Option<Self>, ValidationError> {
        Self::new(percentage, mm, inches).map(|p| p.has_data().then_some(p))
    }

    pub fn millimeters(mm: f64) -> Self {
        Self {
            percentage: None,
            mm: Some(mm),
            inches: Some(mm / MM_PER_INCH),
        }
    }

    pub fn percentage(&self) -> Option<f64> {
        self.percentage
    }

    pub fn mm(&self) -> Option<f64> {
        self.mm
    }

    pub fn inches(&self) -> Option<f64> {
        self.inches
    }
}

impl UnitValue for Precipitation {
    fn fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("mm", self.mm),
            ("inches", self.inches),
            ("percentage", self.percentage),
        ]
    }

    fn default_template(&self) -> &'static str {
        match (self.mm.is_some(), self.percentage.is_some()) {
            (true, true) => "${mm}mm / ${inches}in (${percentage}%)",
            (false, true) => "${percentage}%",
            _ => "${mm}mm / ${inches}in",
        }
    }
}

/// Meteorological direction: angle in degrees plus its 16-point compass label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Direction {
    angle: f64,
    compass_point: &'static str,
}

impl Direction {
    pub fn new(angle: f64) -> Self {
        // `+ 0.0` folds -0.0 into 0.0
        let mut angle = angle.rem_euclid(360.0) + 0.0;
        if angle >= 360.0 {
            angle = 0.0;
        }

        let index = (angle / 22.5).round() as usize % COMPASS_POINTS.len();
        Self {
            angle,
            compass_point: COMPASS_POINTS[index],
        }
    }

    /// `None` when the angle is unknown.
    pub fn optional(angle: Option<f64>) -> Option<Self> {
        angle.map(Self::new)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn compass_point(&self) -> &'static str {
        self.compass_point
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl UnitValue for Direction {
    fn fields(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![("angle", Some(self.angle))]
    }

    fn labels(&self) -> Vec<(&'static str, &'static str)> {
        vec![("direction", self.compass_point)]
    }

    fn default_template(&self) -> &'static str {
        "${direction}"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_conversions_and_format() {
        let t = Temperature::new(Some(20.0), None).unwrap();
        assert_eq!(t.c(), Some(20.0));
        assert_eq!(t.f(), Some(68.0));
        assert!(t.has_data());
        assert_eq!(t.format(), "20.0C / 68.0F");
        assert_eq!(t.format_with("${c}°C", 1), "20.0°C");

        let t = Temperature::fahrenheit(80.0);
        assert_eq!(t.c(), Some(26.666666666666668));
        assert_eq!(t.format_with(t.default_template(), 2), "26.67C / 80.00F");

        assert_eq!(Temperature::celsius(20.0), Temperature::fahrenheit(68.0));
        assert_eq!(Temperature::fahrenheit(80.0), Temperature::fahrenheit(80.0));
    }

    #[test]
    fn temperature_rejects_conflicting_units() {
        let err = Temperature::new(Some(10.0), Some(10.0)).unwrap_err();
        assert!(matches!(err, ValidationError::ConflictingUnits { .. }));
        assert!(err.to_string().contains("conflicting units specified"));
    }

    #[test]
    fn zero_is_data_but_empty_is_not() {
        let zero = Temperature::celsius(0.0);
        assert!(zero.has_data());
        assert_eq!(zero.format(), "0.0C / 32.0F");
        assert!(Temperature::fahrenheit(0.0).has_data());

        let empty = Temperature::default();
        assert!(!empty.has_data());
        assert_eq!(empty.format(), NULL_DISPLAY);
        assert_eq!(empty, Temperature::new(None, None).unwrap());
    }

    #[test]
    fn optional_constructors_return_none_without_input() {
        assert_eq!(Temperature::optional(None, None), Ok(None));
        assert_eq!(Distance::optional(None, None), Ok(None));
        assert_eq!(Speed::optional(None, None, None), Ok(None));
        assert_eq!(Precipitation::optional(None, None, None), Ok(None));
        assert_eq!(Direction::optional(None), None);

        assert_eq!(
            Temperature::optional(Some(0.0), None),
            Ok(Some(Temperature::celsius(0.0)))
        );
        assert!(Speed::optional(Some(1.0), None, Some(2.0)).is_err());
    }

    #[test]
    fn distance_conversions_and_format() {
        let d = Distance::kilometers(100.0);
        assert_eq!(d.mi(), Some(100.0 / 1.609));
        assert_eq!(d.format(), "100.0km / 62.2mi");

        let d = Distance::miles(200.0);
        assert_eq!(d.km(), Some(200.0 * 1.609));
        assert_eq!(d.format(), "321.8km / 200.0mi");

        assert_eq!(Distance::kilometers(0.0), Distance::miles(0.0));
        assert_eq!(Distance::kilometers(0.0).format(), "0.0km / 0.0mi");
        assert_eq!(Distance::default().format(), NULL_DISPLAY);
        assert!(Distance::new(Some(1.0), Some(1.0)).is_err());
    }

    #[test]
    fn speed_conversions_and_format() {
        let s = Speed::from_unit(100.0, SpeedUnit::Kph);
        assert_eq!(s.mph(), Some(100.0 / 1.609));
        assert_eq!(s.ms(), Some(100.0 / 3.6));
        assert_eq!(s.format(), "100.0kph / 62.2mph / 27.8m/s");

        let s = Speed::from_unit(200.0, SpeedUnit::Mph);
        assert_eq!(s.kph(), Some(200.0 * 1.609));
        assert_eq!(s.ms(), Some(200.0 * 1.609 / 3.6));
        assert_eq!(s.format(), "321.8kph / 200.0mph / 89.4m/s");

        let s = Speed::new(None, None, Some(360.0)).unwrap();
        assert_eq!(s.ms(), Some(360.0));
        assert_eq!(s.kph(), Some(1296.0));
        assert_eq!(s.mph(), Some(1296.0 / 1.609));

        assert_eq!(
            Speed::from_unit(0.0, SpeedUnit::Kph).format(),
            "0.0kph / 0.0mph / 0.0m/s"
        );
        assert_ne!(
            Speed::from_unit(100.0, SpeedUnit::Kph),
            Speed::from_unit(100.0, SpeedUnit::Mph)
        );
        assert_eq!(Speed::default().format(), NULL_DISPLAY);
    }

    #[test]
    fn speed_rejects_every_conflicting_pair() {
        assert!(Speed::new(Some(1.0), Some(2.0), None).is_err());
        assert!(Speed::new(Some(1.0), None, Some(2.0)).is_err());
        assert!(Speed::new(None, Some(1.0), Some(2.0)).is_err());
        assert!(Speed::new(Some(1.0), Some(2.0), Some(3.0)).is_err());
    }

    #[test]
    fn precipitation_amounts_and_percentage() {
        let p = Precipitation::new(Some(80.0), Some(50.8), None).unwrap();
        assert_eq!(p.inches(), Some(2.0));
        assert_eq!(p, Precipitation::new(Some(80.0), None, Some(2.0)).unwrap());
        assert_eq!(p.format(), "50.8mm / 2.0in (80.0%)");

        let p = Precipitation::new(Some(55.5), None, Some(1.0)).unwrap();
        assert_eq!(p.mm(), Some(25.4));
        assert_eq!(p.format(), "25.4mm / 1.0in (55.5%)");

        let no_chance = Precipitation::new(None, None, Some(1.0)).unwrap();
        assert_ne!(p, no_chance);
        assert_eq!(no_chance.format(), "25.4mm / 1.0in");

        let chance_only = Precipitation::new(Some(40.0), None, None).unwrap();
        assert!(chance_only.has_data());
        assert_eq!(chance_only.format(), "40.0%");

        assert_eq!(Precipitation::default().format(), NULL_DISPLAY);
    }

    #[test]
    fn precipitation_percentage_bounds() {
        assert!(Precipitation::new(Some(0.0), None, None).is_ok());
        assert!(Precipitation::new(Some(100.0), Some(1.0), None).is_ok());
        assert_eq!(
            Precipitation::new(Some(100.5), None, None),
            Err(ValidationError::PercentageOutOfRange(100.5))
        );
        assert!(Precipitation::new(Some(-1.0), None, None).is_err());
    }

    #[test]
    fn precipitation_rejects_both_amounts() {
        let conflict = ValidationError::ConflictingUnits {
            kind: "precipitation",
            units: "'mm', 'inches'",
        };

        assert_eq!(Precipitation::new(None, Some(1.0), Some(1.0)), Err(conflict.clone()));
        assert_eq!(Precipitation::new(Some(50.0), Some(1.0), Some(1.0)), Err(conflict.clone()));
        assert_eq!(Precipitation::optional(None, Some(1.0), Some(1.0)), Err(conflict));
    }

    #[test]
    fn direction_normalizes_angle() {
        let north = Direction::new(0.0);
        assert_eq!(north.compass_point(), "N");
        assert_eq!(north.format(), "N");
        assert_eq!(north, Direction::new(360.0));
        assert_eq!(north, Direction::new(-360.0));
        assert_eq!(Direction::new(-360.0).angle(), 0.0);

        let five = Direction::new(5.0);
        assert_eq!(five.format(), "N");
        assert_ne!(north, five);
        assert_eq!(five, Direction::new(360.0 * 2.0 + 5.0));
        assert_eq!(Direction::new(-90.0).compass_point(), "W");

        assert_eq!(Direction::default(), north);
        assert_eq!(five.format_with("${angle}° ${direction}", 0), "5° N");
    }

    #[test]
    fn direction_rounds_to_nearest_point() {
        let cases = [
            (22.5, "NNE"),
            (22.5 + 11.2, "NNE"),
            (22.5 + 11.3, "NE"),
            (45.0 + 11.2, "NE"),
            (45.0 + 11.3, "ENE"),
            (67.5 + 11.3, "E"),
            (90.0 + 11.2, "E"),
            (90.0 + 11.3, "ESE"),
            (180.0 + 11.2, "S"),
            (180.0 + 11.3, "SSW"),
            (225.0 + 11.3, "WSW"),
            (270.0 + 11.2, "W"),
            (270.0 + 11.3, "WNW"),
            (337.5, "NNW"),
            (359.0, "N"),
        ];
        for (angle, expected) in cases {
            assert_eq!(Direction::new(angle).compass_point(), expected, "angle {angle}");
        }

        // exact midpoint between N and NNE goes to the higher index
        assert_eq!(Direction::new(11.25).compass_point(), "NNE");
    }

    #[test]
    fn template_substitution_edge_cases() {
        let t = Temperature::celsius(1.0);
        assert_eq!(t.format_with("$$${c} ${unknown} $c", 0), "$1 ${unknown} $c");
        assert_eq!(t.to_string(), "1.0C / 33.8F");
    }
}
