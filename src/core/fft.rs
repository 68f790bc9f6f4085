use rustfft::{FftPlanner, num_complex::Complex64};

/// Symmetric Hann window (offline analysis)
/// w[i] = 0.5 * (1 - cos(2πi/(N-1)))
#[inline]
pub fn hann_window_symmetric(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let two_pi = std::f64::consts::PI * 2.0;
            let denom = (n - 1) as f64;
            let mut w = Vec::with_capacity(n);
            for i in 0..n {
                let phi = two_pi * i as f64 / denom;
                w.push(0.5 * (1.0 - phi.cos()));
            }
            w
        }
    }
}

/// Apply the symmetric Hann window in place.
pub fn apply_hann_window(buf: &mut [f64]) {
    if buf.len() <= 1 {
        return;
    }
    let win = hann_window_symmetric(buf.len());
    for (x, &w) in buf.iter_mut().zip(&win) {
        *x *= w;
    }
}

/// Subtract the mean in place; returns the removed mean.
pub fn remove_mean(buf: &mut [f64]) -> f64 {
    if buf.is_empty() {
        return 0.0;
    }
    let mean = buf.iter().sum::<f64>() / buf.len() as f64;
    buf.iter_mut().for_each(|x| *x -= mean);
    mean
}

// ======================================================================
// Real-input spectrum
// ======================================================================

/// One-sided DFT of a real signal: bins 0..=N/2.
pub fn rfft(x: &[f64]) -> Vec<Complex64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let mut buf: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buf);

    buf.truncate(n / 2 + 1);
    buf
}

/// |X[k]| for k = 0..=N/2 (unnormalized).
pub fn magnitude_spectrum(x: &[f64]) -> Vec<f64> {
    rfft(x).iter().map(|z| z.norm()).collect()
}

// ======================================================================
// Utility
// ======================================================================

/// Bin frequencies k / (N·dt) for the one-sided spectrum of N samples.
pub fn rfft_freqs(n: usize, dt: f64) -> Vec<f64> {
    (0..=n / 2).map(|k| k as f64 / (n as f64 * dt)).collect()
}

// ======================================================================
// Tests
// ======================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn hann_window_symmetric_props() {
        let n = 1024;
        let w = hann_window_symmetric(n);
        assert!(w.iter().all(|&v| v >= 0.0));

        // Endpoints ~0, symmetric about the centre
        assert!(w.first().unwrap().abs() < 1e-12);
        assert!(w.last().unwrap().abs() < 1e-12);
        for i in 0..n / 2 {
            assert!((w[i] - w[n - 1 - i]).abs() < 1e-12);
        }

        // Energy check: mean(w^2) ≈ 3/8
        let u: f64 = w.iter().map(|&x| x * x).sum::<f64>() / n as f64;
        assert!((u - 0.375).abs() < 1e-3, "mean-square mismatch: {u}");
    }

    #[test]
    fn hann_window_small_n_edges() {
        assert!(hann_window_symmetric(0).is_empty());
        assert_eq!(hann_window_symmetric(1), vec![1.0]);
        let w2 = hann_window_symmetric(2);
        assert!(w2[0].abs() < 1e-12 && w2[1].abs() < 1e-12);
    }

    #[test]
    fn apply_hann_window_scales_by_window() {
        let mut buf = vec![2.0f64; 512];
        apply_hann_window(&mut buf);
        let w = hann_window_symmetric(512);
        for (x, w) in buf.iter().zip(&w) {
            assert_relative_eq!(*x, 2.0 * w, epsilon = 1e-12);
        }

        let mut single = vec![5.0];
        apply_hann_window(&mut single);
        assert_eq!(single, vec![5.0]);
    }

    #[test]
    fn remove_mean_centres_signal() {
        let mut x = vec![1.0, 2.0, 3.0, 6.0];
        let m = remove_mean(&mut x);
        assert_relative_eq!(m, 3.0);
        assert_relative_eq!(x.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rfft_of_cosine_peaks_at_its_bin() {
        let n = 256;
        let k0 = 12;
        let x: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * k0 as f64 * i as f64 / n as f64).cos())
            .collect();
        let mag = magnitude_spectrum(&x);
        assert_eq!(mag.len(), n / 2 + 1);
        let (imax, vmax) = mag
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(imax, k0);
        assert_relative_eq!(*vmax, n as f64 / 2.0, epsilon = 1e-9);
    }

    #[test]
    fn rfft_of_constant_is_dc_only() {
        let x = vec![2.0f64; 64];
        let mag = magnitude_spectrum(&x);
        assert_relative_eq!(mag[0], 128.0, epsilon = 1e-9);
        assert!(mag[1..].iter().all(|&m| m < 1e-9));
    }

    #[test]
    fn rfft_freqs_props() {
        let f = rfft_freqs(10, 0.5);
        assert_eq!(f.len(), 6);
        assert_relative_eq!(f[0], 0.0);
        assert_relative_eq!(f[1], 0.2);
        // Nyquist = 1 / (2 dt)
        assert_relative_eq!(*f.last().unwrap(), 1.0);
        assert!(rfft(&[]).is_empty());
    }
}
