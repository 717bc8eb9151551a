use std::collections::BTreeMap;

use super::error::{PipelineError, Result};
use super::filter::{require_columns, FilteredView};

/// Pivots of the standardised system (unit diagonal) at or below this are zero.
const SINGULAR_EPS: f64 = 1e-10;

/// An ordinary-least-squares fit `target ≈ intercept + Σ coef_i · feature_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    features: Vec<String>,
    target: String,
    intercept: f64,
    coefficients: Vec<f64>,
    samples: usize,
}

impl LinearModel {
    /// Fit on every row of `view` where all features and the target are present.
    pub fn fit(view: &FilteredView<'_>, features: &[String], target: &str) -> Result<Self> {
        let dataset = view.dataset();
        let mut referenced: Vec<&str> = features.iter().map(String::as_str).collect();
        referenced.push(target);
        require_columns(dataset, &referenced)?;
        if let Some(column) = referenced.iter().find(|c| !dataset.is_numeric(c)) {
            return Err(PipelineError::NotNumeric {
                column: column.to_string(),
            });
        }

        let samples: Vec<(Vec<f64>, f64)> = view
            .rows()
            .filter_map(|row| {
                let x = features
                    .iter()
                    .map(|f| row.get(f).as_f64())
                    .collect::<Option<Vec<f64>>>()?;
                Some((x, row.get(target).as_f64()?))
            })
            .collect();

        if samples.len() < 2 {
            return Err(PipelineError::InsufficientData {
                operation: "regression",
                needed: 2,
                found: samples.len(),
            });
        }

        // Centre every column and scale features to unit norm, so XᵀX becomes a
        // correlation matrix with a unit diagonal regardless of the data's units.
        let n = samples.len() as f64;
        let k = features.len();
        let y_mean = samples.iter().map(|(_, y)| y).sum::<f64>() / n;
        let means: Vec<f64> = (0..k)
            .map(|j| samples.iter().map(|(x, _)| x[j]).sum::<f64>() / n)
            .collect();
        let norms: Vec<f64> = (0..k)
            .map(|j| {
                samples
                    .iter()
                    .map(|(x, _)| (x[j] - means[j]).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();
        // A constant feature is collinear with the intercept.
        if norms
            .iter()
            .zip(&means)
            .any(|(&norm, mean)| norm <= SINGULAR_EPS * mean.abs() * n.sqrt())
        {
            return Err(PipelineError::SingularFit);
        }

        let mut ztz = vec![vec![0.0; k]; k];
        let mut zty = vec![0.0; k];
        for (x, y) in &samples {
            let z: Vec<f64> = (0..k).map(|j| (x[j] - means[j]) / norms[j]).collect();
            for i in 0..k {
                zty[i] += z[i] * (y - y_mean);
                for j in 0..k {
                    ztz[i][j] += z[i] * z[j];
                }
            }
        }

        let gamma = solve(ztz, zty).ok_or(PipelineError::SingularFit)?;
        let coefficients: Vec<f64> = gamma.iter().zip(&norms).map(|(g, norm)| g / norm).collect();
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&means)
                .map(|(c, m)| c * m)
                .sum::<f64>();
        log::debug!(
            "Fitted {target} on {:?} over {} rows: intercept {intercept}, coefficients {coefficients:?}",
            features,
            samples.len()
        );

        Ok(LinearModel {
            features: features.to_vec(),
            target: target.to_string(),
            intercept,
            coefficients,
            samples: samples.len(),
        })
    }

    /// Point prediction for one input vector keyed by feature name.
    pub fn predict(&self, inputs: &BTreeMap<String, f64>) -> Result<f64> {
        let mut y = self.intercept;
        for (feature, coef) in self.features.iter().zip(&self.coefficients) {
            let x = inputs.get(feature).ok_or_else(|| PipelineError::SchemaMismatch {
                column: feature.clone(),
                available: inputs.keys().cloned().collect(),
            })?;
            y += coef * x;
        }
        Ok(y)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Rows used for the fit.
    pub fn samples(&self) -> usize {
        self.samples
    }
}

/// Gaussian elimination with partial pivoting on a system whose diagonal is
/// all ones. `None` if the system is singular.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= SINGULAR_EPS {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Dataset, Record, Value};

    fn dataset(rows: &[(f64, f64, Option<f64>)]) -> Dataset {
        let records = rows
            .iter()
            .map(|&(rain, msp, y)| {
                Record::from_iter([
                    ("Annual_rainfall", Value::Float(rain)),
                    ("MSP", Value::Float(msp)),
                    ("Yield", y.map(Value::Float).unwrap_or(Value::Null)),
                ])
            })
            .collect();
        Dataset::from_records(
            vec!["Annual_rainfall".into(), "MSP".into(), "Yield".into()],
            records,
        )
    }

    fn features() -> Vec<String> {
        vec!["Annual_rainfall".to_string(), "MSP".to_string()]
    }

    #[test]
    fn recovers_exact_linear_relation() {
        // Yield = 3 + 2·rain − 0.5·msp
        let ds = dataset(&[
            (1.0, 2.0, Some(4.0)),
            (2.0, 1.0, Some(6.5)),
            (3.0, 5.0, Some(6.5)),
            (4.0, 3.0, Some(9.5)),
            (5.0, 0.0, None),
        ]);
        let model = LinearModel::fit(&FilteredView::all(&ds), &features(), "Yield").unwrap();
        assert_eq!(model.samples(), 4);
        assert!((model.intercept() - 3.0).abs() < 1e-9);
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-9);
        assert!((model.coefficients()[1] + 0.5).abs() < 1e-9);

        let inputs: BTreeMap<String, f64> =
            [("Annual_rainfall".to_string(), 10.0), ("MSP".to_string(), 4.0)]
                .into_iter()
                .collect();
        assert!((model.predict(&inputs).unwrap() - 21.0).abs() < 1e-9);
    }

    #[test]
    fn fits_features_on_tonnes_scale() {
        // Yield = 5 + 0.002·production + 0.3·rainfall
        let records: Vec<Record> = (0..200u32)
            .map(|i| {
                let production = 5.0e5 + f64::from(i * 7919 % 1000) * 1000.0;
                let rainfall = 800.0 + f64::from(i * 37 % 700);
                Record::from_iter([
                    ("Production_(in_Tonnes)", Value::Float(production)),
                    ("Annual_rainfall", Value::Float(rainfall)),
                    ("Yield", Value::Float(5.0 + 0.002 * production + 0.3 * rainfall)),
                ])
            })
            .collect();
        let ds = Dataset::from_records(
            vec![
                "Production_(in_Tonnes)".into(),
                "Annual_rainfall".into(),
                "Yield".into(),
            ],
            records,
        );
        let features = vec!["Production_(in_Tonnes)".to_string(), "Annual_rainfall".to_string()];

        let model = LinearModel::fit(&FilteredView::all(&ds), &features, "Yield").unwrap();
        assert_eq!(model.samples(), 200);
        assert!((model.intercept() - 5.0).abs() < 1e-6);
        assert!((model.coefficients()[0] - 0.002).abs() < 1e-10);
        assert!((model.coefficients()[1] - 0.3).abs() < 1e-9);
    }

    #[test]
    fn constant_feature_is_singular() {
        let ds = dataset(&[
            (1.0, 2.0, Some(1.0)),
            (2.0, 2.0, Some(2.0)),
            (3.0, 2.0, Some(3.5)),
        ]);
        let err = LinearModel::fit(&FilteredView::all(&ds), &features(), "Yield").unwrap_err();
        assert_eq!(err, PipelineError::SingularFit);
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let ds = dataset(&[(1.0, 2.0, Some(4.0)), (2.0, 1.0, None)]);
        let err = LinearModel::fit(&FilteredView::all(&ds), &features(), "Yield").unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn collinear_features_are_singular() {
        let ds = dataset(&[
            (1.0, 2.0, Some(1.0)),
            (2.0, 4.0, Some(2.0)),
            (3.0, 6.0, Some(3.5)),
        ]);
        let err = LinearModel::fit(&FilteredView::all(&ds), &features(), "Yield").unwrap_err();
        assert_eq!(err, PipelineError::SingularFit);
    }

    #[test]
    fn missing_feature_column_is_schema_mismatch() {
        let ds = dataset(&[(1.0, 2.0, Some(4.0))]);
        let err = LinearModel::fit(
            &FilteredView::all(&ds),
            &["Area".to_string()],
            "Yield",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { ref column, .. } if column == "Area"));
    }

    #[test]
    fn predict_requires_every_feature() {
        let ds = dataset(&[
            (1.0, 2.0, Some(4.0)),
            (2.0, 1.0, Some(6.5)),
            (3.0, 5.0, Some(6.5)),
        ]);
        let model = LinearModel::fit(&FilteredView::all(&ds), &features(), "Yield").unwrap();
        let inputs: BTreeMap<String, f64> = [("MSP".to_string(), 1.0)].into_iter().collect();
        assert!(matches!(
            model.predict(&inputs),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }
}
