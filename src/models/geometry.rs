use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Dimensions of an element type. `density` is never taken from input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Geometry {
    #[serde(default)]
    pub thickness: Decimal,
    #[serde(default)]
    pub length: Decimal,
    #[serde(default)]
    pub height: Decimal,
    #[serde(default)]
    pub width: Decimal,
    #[serde(default)]
    pub area: Decimal,
    #[serde(default)]
    pub volume: Decimal,
    #[serde(default)]
    pub mass: Decimal,
}

impl Geometry {
    /// `mass / volume`, zero when the volume is not positive.
    pub fn density(&self) -> Decimal {
        density(self.mass, self.volume)
    }

    /// Overlays the non-zero fields of `patch`.
    pub fn merge_non_zero(&mut self, patch: &Geometry) {
        fn take(dst: &mut Decimal, src: Decimal) {
            if !src.is_zero() {
                *dst = src;
            }
        }
        take(&mut self.thickness, patch.thickness);
        take(&mut self.length, patch.length);
        take(&mut self.height, patch.height);
        take(&mut self.width, patch.width);
        take(&mut self.area, patch.area);
        take(&mut self.volume, patch.volume);
        take(&mut self.mass, patch.mass);
    }

    pub fn has_negative(&self) -> bool {
        [
            self.thickness,
            self.length,
            self.height,
            self.width,
            self.area,
            self.volume,
            self.mass,
        ]
        .iter()
        .any(|v| v.is_sign_negative() && !v.is_zero())
    }
}

pub fn density(mass: Decimal, volume: Decimal) -> Decimal {
    if volume > Decimal::ZERO {
        (mass / volume).round_dp(4)
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn density_from_mass_and_volume() {
        let g = Geometry {
            mass: dec!(4800),
            volume: dec!(2),
            ..Default::default()
        };
        assert_eq!(g.density(), dec!(2400));
        assert_eq!(density(dec!(10), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn merge_ignores_zero_fields() {
        let mut g = Geometry {
            length: dec!(3),
            volume: dec!(2),
            ..Default::default()
        };
        g.merge_non_zero(&Geometry {
            volume: dec!(2.5),
            ..Default::default()
        });
        assert_eq!(g.length, dec!(3));
        assert_eq!(g.volume, dec!(2.5));
    }
}
