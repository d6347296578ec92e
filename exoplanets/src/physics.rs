//! Stellar parameter estimation and sky-projected companion offsets.

/// Nominal solar effective temperature, K.
pub const TSUN_K: f64 = 5772.0;

/// Astronomical units per parsec.
pub const AU_PER_PC: f64 = 206_264.806_247_096_36;

fn usable(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x > 0.0)
}

/// Archive luminosities are log10(L/Lsun).
pub fn lum_from_log10(log_lum: Option<f64>) -> Option<f64> {
    log_lum.map(|v| 10f64.powf(v)).filter(|l| l.is_finite())
}

fn radius_from_teff(teff: f64) -> f64 {
    match teff {
        t if t < 3200.0 => 0.18,
        t if t < 3700.0 => 0.30,
        t if t < 4200.0 => 0.55,
        t if t < 5200.0 => 0.80,
        t if t < 6000.0 => 1.00,
        t if t < 7500.0 => 1.35,
        t if t < 10000.0 => 2.00,
        _ => 3.00,
    }
}

fn radius_from_mass(mass: f64) -> f64 {
    if mass < 0.43 {
        0.85 * mass
    } else if mass < 2.0 {
        mass.powf(0.8)
    } else {
        mass.powf(0.57)
    }
}

/// Fill in missing radius (Rsun) and luminosity (Lsun).
///
/// In order: radius from luminosity and temperature (Stefan-Boltzmann),
/// luminosity from radius and temperature, a main-sequence radius from
/// temperature bins, a radius from mass, and finally luminosity from whatever
/// radius was inferred. Non-finite or non-positive results come back as `None`.
pub fn estimate_radius_lum(
    teff: Option<f64>,
    radius: Option<f64>,
    lum: Option<f64>,
    mass: Option<f64>,
) -> (Option<f64>, Option<f64>) {
    let teff = usable(teff);
    let mut r = usable(radius);
    let mut l = usable(lum);

    if let (None, Some(l0), Some(t)) = (r, l, teff) {
        let rel = t / TSUN_K;
        r = Some(l0.sqrt() / (rel * rel));
    }
    if let (None, Some(r0), Some(t)) = (l, usable(r), teff) {
        l = Some(r0 * r0 * (t / TSUN_K).powi(4));
    }
    if usable(r).is_none() {
        if let Some(t) = teff {
            r = Some(radius_from_teff(t));
        } else if let Some(m) = usable(mass) {
            r = Some(radius_from_mass(m));
        }
    }
    if let (None, Some(r0), Some(t)) = (usable(l), usable(r), teff) {
        l = Some(r0 * r0 * (t / TSUN_K).powi(4));
    }

    (usable(r), usable(l))
}

/// Smallest RA difference in degrees, in `[-180, 180)`.
pub fn delta_ra_deg(ra: f64, ra0: f64) -> f64 {
    (ra - ra0 + 540.0).rem_euclid(360.0) - 180.0
}

/// Offset of a companion from the primary on the sky plane, in AU.
///
/// RA offsets map to x and Dec offsets to z; y (along the line of sight) is 0.
pub fn projected_pos_au(
    primary: (f64, f64),
    companion: (f64, f64),
    dist_pc: f64,
) -> [f64; 3] {
    let (ra0, dec0) = primary;
    let (ra, dec) = companion;
    let dra = delta_ra_deg(ra, ra0);
    let ddec = dec - dec0;
    let k = dist_pc * AU_PER_PC * std::f64::consts::PI / 180.0;
    [dra * dec0.to_radians().cos() * k, 0.0, ddec * k]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sun_like_star_round_trips() {
        let (r, l) = estimate_radius_lum(Some(TSUN_K), None, Some(1.0), None);
        assert_relative_eq!(r.unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(l.unwrap(), 1.0, epsilon = 1e-12);

        let (r, l) = estimate_radius_lum(Some(TSUN_K), Some(2.0), None, None);
        assert_relative_eq!(r.unwrap(), 2.0);
        assert_relative_eq!(l.unwrap(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_stefan_boltzmann_both_directions_agree() {
        let teff = 4500.0;
        let (r, l) = estimate_radius_lum(Some(teff), Some(0.7), None, None);
        let (r_back, _) = estimate_radius_lum(Some(teff), None, l, None);
        assert_relative_eq!(r_back.unwrap(), r.unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_temperature_bins() {
        let radius = |t| estimate_radius_lum(Some(t), None, None, None).0.unwrap();
        assert_eq!(radius(3000.0), 0.18);
        assert_eq!(radius(3500.0), 0.30);
        assert_eq!(radius(5800.0), 1.00);
        assert_eq!(radius(12000.0), 3.00);
        let (_, l) = estimate_radius_lum(Some(TSUN_K), None, None, None);
        assert_relative_eq!(l.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mass_fallback() {
        let radius = |m| estimate_radius_lum(None, None, None, Some(m)).0.unwrap();
        assert_relative_eq!(radius(0.2), 0.17, epsilon = 1e-12);
        assert_relative_eq!(radius(1.0), 1.0);
        assert_relative_eq!(radius(4.0), 4f64.powf(0.57));
        assert_eq!(estimate_radius_lum(None, None, None, Some(1.0)).1, None);
    }

    #[test]
    fn test_never_returns_non_positive() {
        assert_eq!(estimate_radius_lum(None, Some(-1.0), Some(0.0), None), (None, None));
        assert_eq!(estimate_radius_lum(Some(f64::NAN), None, None, Some(-2.0)), (None, None));
        assert_eq!(lum_from_log10(Some(400.0)), None);
        assert_relative_eq!(lum_from_log10(Some(-1.0)).unwrap(), 0.1, epsilon = 1e-15);
    }

    #[test]
    fn test_delta_ra_wraps() {
        assert_relative_eq!(delta_ra_deg(359.0, 1.0), -2.0);
        assert_relative_eq!(delta_ra_deg(1.0, 359.0), 2.0);
        assert_relative_eq!(delta_ra_deg(10.0, 5.0), 5.0);
    }

    #[test]
    fn test_projected_offset() {
        let arcsec = 1.0 / 3600.0;
        let pos = projected_pos_au((0.0, 0.0), (0.0, arcsec), 1.0);
        assert_relative_eq!(pos[2], 1.0, epsilon = 1e-6);
        assert_eq!(pos[1], 0.0);

        let east = projected_pos_au((0.0, 60.0), (2.0 * arcsec, 60.0), 10.0);
        assert_relative_eq!(east[0], 10.0, epsilon = 1e-6);
    }
}
