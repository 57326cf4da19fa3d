//! Least-squares solvers on the faer LLT factorization.
//!
//! Both the OLS baselines and the quantile-regression IRLS loop reduce to
//! (weighted) normal equations. A rank-deficient design surfaces as
//! `StatsError::SingularDesign` when the Cholesky factorization fails -
//! the solver never falls through to garbage coefficients.

use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};

use super::error::{StatsError, StatsResult};

/// A fitted linear model with classical (homoskedastic) standard errors.
#[derive(Debug, Clone)]
pub struct LinearFit {
    pub coef: Vec<f64>,
    pub std_err: Vec<f64>,
    /// Residual variance estimate, RSS / (n - p)
    pub sigma2: f64,
    pub n: usize,
    pub p: usize,
}

impl LinearFit {
    /// Predicted response for one design row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        debug_assert_eq!(row.len(), self.coef.len());
        row.iter().zip(&self.coef).map(|(x, b)| x * b).sum()
    }

    /// Predicted responses for every row of a design matrix.
    pub fn predict(&self, x: &Mat<f64>) -> Vec<f64> {
        (0..x.nrows())
            .map(|i| (0..x.ncols()).map(|j| x[(i, j)] * self.coef[j]).sum())
            .collect()
    }
}

fn factorize(xtwx: &Mat<f64>, context: &str) -> StatsResult<Llt<f64>> {
    xtwx.as_ref().llt(Side::Lower).map_err(|_| {
        StatsError::SingularDesign(format!(
            "normal equations for {context} have no Cholesky factorization \
             (a predictor column is constant or collinear)"
        ))
    })
}

fn check_dims(x: &Mat<f64>, y: &[f64], w: Option<&[f64]>) -> StatsResult<()> {
    let (n, p) = (x.nrows(), x.ncols());
    if n == 0 || p == 0 {
        return Err(StatsError::InvalidParameter("empty design matrix".to_string()));
    }
    if y.len() != n {
        return Err(StatsError::InvalidParameter(format!(
            "response length {} does not match {} design rows",
            y.len(),
            n
        )));
    }
    if let Some(w) = w {
        if w.len() != n {
            return Err(StatsError::InvalidParameter(format!(
                "weight length {} does not match {} design rows",
                w.len(),
                n
            )));
        }
        if w.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(StatsError::NonFinite { context: "regression weights" });
        }
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite { context: "regression response" });
    }
    Ok(())
}

/// Solve weighted least squares via the normal equations `X'WX b = X'Wy`.
///
/// Returns only the coefficient vector; the IRLS quantile loop calls this
/// once per iteration and has no use for standard errors.
pub fn solve_wls(x: &Mat<f64>, y: &[f64], w: &[f64]) -> StatsResult<Vec<f64>> {
    check_dims(x, y, Some(w))?;
    let (n, p) = (x.nrows(), x.ncols());

    // Scale rows by weights, then let faer do the cross products
    let mut xw = Mat::<f64>::zeros(n, p);
    let mut yw = Mat::<f64>::zeros(n, 1);
    for i in 0..n {
        for j in 0..p {
            xw[(i, j)] = x[(i, j)] * w[i];
        }
        yw[(i, 0)] = y[i] * w[i];
    }
    let xtwx = x.transpose() * &xw;
    let xtwy = x.transpose() * &yw;

    let llt = factorize(&xtwx, "weighted least squares")?;
    let sol = llt.solve(xtwy.as_ref());
    Ok((0..p).map(|j| sol[(j, 0)]).collect())
}

/// Ordinary least squares with classical standard errors.
pub fn fit_ols(x: &Mat<f64>, y: &[f64]) -> StatsResult<LinearFit> {
    check_dims(x, y, None)?;
    let (n, p) = (x.nrows(), x.ncols());
    if n <= p {
        return Err(StatsError::InsufficientSample {
            test: "ordinary least squares",
            required: p + 1,
            actual: n,
        });
    }

    let mut ym = Mat::<f64>::zeros(n, 1);
    for i in 0..n {
        ym[(i, 0)] = y[i];
    }
    let xtx = x.transpose() * x;
    let xty = x.transpose() * &ym;

    let llt = factorize(&xtx, "ordinary least squares")?;
    let sol = llt.solve(xty.as_ref());
    let coef: Vec<f64> = (0..p).map(|j| sol[(j, 0)]).collect();

    // Residual variance and (X'X)^-1 diagonal for standard errors
    let mut rss = 0.0;
    for i in 0..n {
        let fitted: f64 = (0..p).map(|j| x[(i, j)] * coef[j]).sum();
        let r = y[i] - fitted;
        rss += r * r;
    }
    let sigma2 = rss / (n - p) as f64;

    let inv = llt.solve(Mat::<f64>::identity(p, p).as_ref());
    let std_err: Vec<f64> = (0..p).map(|j| (sigma2 * inv[(j, j)]).sqrt()).collect();

    Ok(LinearFit { coef, std_err, sigma2, n, p })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn design() -> (Mat<f64>, Vec<f64>) {
        let rows = [
            [1.0, 0.5, 1.2],
            [1.0, 1.5, 0.3],
            [1.0, 2.5, 2.2],
            [1.0, 3.1, 0.9],
            [1.0, 4.2, 1.7],
            [1.0, 5.0, 3.0],
        ];
        let x = Mat::from_fn(6, 3, |i, j| rows[i][j]);
        let y = vec![1.8, 5.85, 6.25, 10.1, 11.95, 12.5];
        (x, y)
    }

    #[test]
    fn ols_matches_reference_solution() {
        let (x, y) = design();
        let fit = fit_ols(&x, &y).unwrap();
        let expected = [1.985966, 2.968726, -1.434451];
        for (b, e) in fit.coef.iter().zip(expected) {
            assert!((b - e).abs() < 1e-5, "coef {b} vs {e}");
        }
        let expected_se = [0.141131, 0.056825, 0.098406];
        for (s, e) in fit.std_err.iter().zip(expected_se) {
            assert!((s - e).abs() < 1e-5, "se {s} vs {e}");
        }
        assert!((fit.sigma2 - 0.0245496).abs() < 1e-6);
    }

    #[test]
    fn wls_with_unit_weights_equals_ols() {
        let (x, y) = design();
        let ols = fit_ols(&x, &y).unwrap();
        let wls = solve_wls(&x, &y, &vec![1.0; 6]).unwrap();
        for (a, b) in ols.coef.iter().zip(&wls) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn singular_design_is_rejected() {
        // Third column duplicates the second: rank-deficient
        let x = Mat::from_fn(5, 3, |i, j| match j {
            0 => 1.0,
            _ => i as f64 + 1.0,
        });
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let err = fit_ols(&x, &y).unwrap_err();
        assert!(matches!(err, StatsError::SingularDesign(_)));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let (x, _) = design();
        let err = fit_ols(&x, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StatsError::InvalidParameter(_)));
    }

    #[test]
    fn predict_row_reproduces_fitted_values() {
        let (x, y) = design();
        let fit = fit_ols(&x, &y).unwrap();
        let preds = fit.predict(&x);
        let first = fit.predict_row(&[1.0, 0.5, 1.2]);
        assert!((preds[0] - first).abs() < 1e-12);
        // Residuals sum to ~0 when an intercept is present
        let resid_sum: f64 = y.iter().zip(&preds).map(|(a, p)| a - p).sum();
        assert!(resid_sum.abs() < 1e-8);
    }
}
