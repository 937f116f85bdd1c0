//! Ordinary least squares with an intercept.
//!
//! The weights are the minimum-norm least-squares solution, so the fit stays
//! well-defined when there are fewer samples than features (down to a single
//! sample). The pseudo-inverse is taken through a Jacobi eigen-decomposition
//! of the Gram matrix of the centred design, whose size is the smaller of the
//! sample and feature counts.

const MAX_SWEEPS: usize = 64;
// Gram eigenvalues are squared singular values; relative values below this
// are rounding noise from the decomposition.
const RELATIVE_CUTOFF: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    weights: Vec<f64>,
    intercept: f64,
}

impl LinearModel {
    /// Fits `targets ~ features * w + b`. All rows must have the same length.
    /// Returns `None` when there are no samples.
    pub fn fit(features: &[Vec<f64>], targets: &[f64]) -> Option<Self> {
        let n = features.len().min(targets.len());
        if n == 0 {
            return None;
        }
        let p = features[0].len();

        let mut x_mean = vec![0.0; p];
        for row in &features[..n] {
            for (m, v) in x_mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        x_mean.iter_mut().for_each(|m| *m /= n as f64);
        let y_mean = targets[..n].iter().sum::<f64>() / n as f64;

        let xc: Vec<Vec<f64>> = features[..n]
            .iter()
            .map(|row| row.iter().zip(&x_mean).map(|(v, m)| v - m).collect())
            .collect();
        let yc: Vec<f64> = targets[..n].iter().map(|y| y - y_mean).collect();

        let weights = if n <= p {
            // w = Xcᵀ (Xc Xcᵀ)⁺ yc
            let gram: Vec<Vec<f64>> = xc
                .iter()
                .map(|a| xc.iter().map(|b| dot(a, b)).collect())
                .collect();
            let alpha = pseudo_inverse_apply(gram, &yc);
            (0..p)
                .map(|j| xc.iter().zip(&alpha).map(|(row, a)| row[j] * a).sum())
                .collect()
        } else {
            // w = (Xcᵀ Xc)⁺ Xcᵀ yc
            let mut gram = vec![vec![0.0; p]; p];
            for row in &xc {
                for i in 0..p {
                    for j in i..p {
                        gram[i][j] += row[i] * row[j];
                    }
                }
            }
            for i in 0..p {
                for j in 0..i {
                    gram[i][j] = gram[j][i];
                }
            }
            let rhs: Vec<f64> = (0..p)
                .map(|j| xc.iter().zip(&yc).map(|(row, y)| row[j] * y).sum())
                .collect();
            pseudo_inverse_apply(gram, &rhs)
        };

        let intercept = y_mean - dot(&x_mean, &weights);
        Some(Self { weights, intercept })
    }

    pub fn predict<'a>(&self, input: impl IntoIterator<Item = &'a f64>) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(input)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Computes `G⁺ v` for a symmetric positive semi-definite `G`.
fn pseudo_inverse_apply(gram: Vec<Vec<f64>>, v: &[f64]) -> Vec<f64> {
    let m = v.len();
    let (eigenvalues, eigenvectors) = symmetric_eigen(gram);
    let largest = eigenvalues.iter().fold(0.0_f64, |acc, l| acc.max(l.abs()));
    let cutoff = largest * RELATIVE_CUTOFF;

    let mut out = vec![0.0; m];
    for (k, lambda) in eigenvalues.iter().enumerate() {
        if *lambda <= cutoff {
            continue;
        }
        let projection: f64 = (0..m).map(|i| eigenvectors[i][k] * v[i]).sum::<f64>() / lambda;
        for (i, o) in out.iter_mut().enumerate() {
            *o += eigenvectors[i][k] * projection;
        }
    }
    out
}

/// Cyclic Jacobi eigen-decomposition. Returns the eigenvalues and a matrix
/// whose columns are the matching eigenvectors.
fn symmetric_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let total: f64 = a.iter().flatten().map(|x| x * x).sum();
    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off <= total * 1e-30 {
            break;
        }

        for p in 0..n {
            for q in p + 1..n {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for row in a.iter_mut() {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[i][i]).collect();
    (eigenvalues, v)
}
