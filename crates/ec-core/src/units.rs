// ec-core/src/units.rs

use uom::si::f64::Pressure as UomPressure;

// Public canonical unit types (SI, f64)
pub type Pressure = UomPressure;

#[inline]
pub fn kpa(v: f64) -> Pressure {
    use uom::si::pressure::kilopascal;
    Pressure::new::<kilopascal>(v)
}

/// Pressure value in hectopascal, the unit readings are carried in.
#[inline]
pub fn as_hpa(p: Pressure) -> f64 {
    use uom::si::pressure::hectopascal;
    p.get::<hectopascal>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilopascal_to_hectopascal() {
        assert!((as_hpa(kpa(101.325)) - 1013.25).abs() < 1e-9);
    }
}
