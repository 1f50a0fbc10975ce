//! Log-pmf cache for the beta-binomial distribution.
//!
//! Downstream likelihood evaluation calls for the same `(p, rho)` parameter
//! pair over many depth configurations, so the three log-gamma-ratio series
//! are grown incrementally and reused. See
//! <https://en.wikipedia.org/wiki/Beta-binomial_distribution#As_a_compound_distribution>
//! for the compound-distribution form the terms come from.

/// Growable cache of `f(n, x) = log(Gamma(n + x) / Gamma(x) / n!)` series
/// for `x` in `{alpha, beta, alpha + beta}` where `alpha = p (1 - rho) / rho`
/// and `beta = (1 - p)(1 - rho) / rho`.
///
/// `p` is the success probability and `rho` the intra-class correlation;
/// `rho = 0` reduces analytically to the binomial distribution. A parameter
/// change resets the fill marks but keeps the allocations. Not thread-safe;
/// a single owner serialises access.
#[derive(Debug)]
pub struct BetaBinom {
    p: f64,
    rho: f64,
    n1: usize,
    n2: usize,
    log_gamma_alpha: Vec<f64>,
    log_gamma_beta: Vec<f64>,
    log_gamma_alpha_beta: Vec<f64>,
}

impl Default for BetaBinom {
    fn default() -> Self {
        Self::new()
    }
}

impl BetaBinom {
    pub fn new() -> Self {
        BetaBinom {
            p: f64::NAN,
            rho: f64::NAN,
            n1: 0,
            n2: 0,
            log_gamma_alpha: vec![0.0],
            log_gamma_beta: vec![0.0],
            log_gamma_alpha_beta: vec![0.0],
        }
    }

    /// Ensures the success/failure series cover `0..=n1` and the combined
    /// series covers `0..=n2` under parameters `(p, rho)`.
    ///
    /// Only the missing tail of each series is computed; calling with
    /// non-decreasing bounds at fixed parameters never recomputes a filled
    /// index.
    pub fn update(&mut self, p: f64, rho: f64, n1: usize, n2: usize) {
        if self.p != p || self.rho != rho {
            self.p = p;
            self.rho = rho;
            self.n1 = 0;
            self.n2 = 0;
        }

        if self.log_gamma_alpha.len() < n1 + 1 {
            self.log_gamma_alpha.resize(n1 + 1, 0.0);
            self.log_gamma_beta.resize(n1 + 1, 0.0);
        }
        if self.log_gamma_alpha_beta.len() < n2 + 1 {
            self.log_gamma_alpha_beta.resize(n2 + 1, 0.0);
        }

        if rho == 0.0 {
            // No overdispersion: f(n, alpha) degenerates to n log p - log n!
            let log_p = p.ln();
            let log_q = (1.0 - p).ln();
            while self.n1 < n1 {
                self.n1 += 1;
                let log_n = (self.n1 as f64).ln();
                self.log_gamma_alpha[self.n1] =
                    self.log_gamma_alpha[self.n1 - 1] + log_p - log_n;
                self.log_gamma_beta[self.n1] =
                    self.log_gamma_beta[self.n1 - 1] + log_q - log_n;
            }
            while self.n2 < n2 {
                self.n2 += 1;
                self.log_gamma_alpha_beta[self.n2] =
                    self.log_gamma_alpha_beta[self.n2 - 1] - (self.n2 as f64).ln();
            }
        } else {
            let s = (1.0 - rho) / rho;
            let alpha = p * s;
            let beta = (1.0 - p) * s;
            while self.n1 < n1 {
                self.n1 += 1;
                let n = self.n1 as f64;
                self.log_gamma_alpha[self.n1] =
                    self.log_gamma_alpha[self.n1 - 1] + ((alpha + n - 1.0) / n).ln();
                self.log_gamma_beta[self.n1] =
                    self.log_gamma_beta[self.n1 - 1] + ((beta + n - 1.0) / n).ln();
            }
            while self.n2 < n2 {
                self.n2 += 1;
                let n = self.n2 as f64;
                self.log_gamma_alpha_beta[self.n2] =
                    self.log_gamma_alpha_beta[self.n2 - 1] + ((alpha + beta + n - 1.0) / n).ln();
            }
        }
    }

    /// Log-pmf of `k` successes in `n` trials.
    ///
    /// Requires a prior `update` covering `k` and `n - k` in the first bound
    /// and `n` in the second.
    pub fn log_pmf(&self, k: usize, n: usize) -> f64 {
        debug_assert!(k <= n);
        debug_assert!(k <= self.n1 && n - k <= self.n1 && n <= self.n2);
        self.log_gamma_alpha[k] + self.log_gamma_beta[n - k] - self.log_gamma_alpha_beta[n]
    }
}
