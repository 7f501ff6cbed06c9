use serde::{Deserialize, Serialize};
use std::fmt;

/// Node activation functions. Inputs are clamped the same way for every
/// caller so exp-based functions never overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Sigmoid,
    Tanh,
    Sin,
    Gauss,
    Relu,
    Elu,
    Identity,
    Clamped,
    Inv,
    Log,
    Exp,
    Abs,
    Hat,
    Square,
    Cube,
    Softplus,
}

impl Activation {
    pub fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Sigmoid => {
                let z = (5.0 * z).clamp(-60.0, 60.0);
                1.0 / (1.0 + (-z).exp())
            }
            Activation::Tanh => (2.5 * z).clamp(-60.0, 60.0).tanh(),
            Activation::Sin => (5.0 * z).clamp(-60.0, 60.0).sin(),
            Activation::Gauss => {
                let z = z.clamp(-3.4, 3.4);
                (-5.0 * z * z).exp()
            }
            Activation::Relu => z.max(0.0),
            Activation::Elu => {
                if z > 0.0 {
                    z
                } else {
                    z.exp() - 1.0
                }
            }
            Activation::Identity => z,
            Activation::Clamped => z.clamp(-1.0, 1.0),
            Activation::Inv => {
                if z == 0.0 {
                    0.0
                } else {
                    1.0 / z
                }
            }
            Activation::Log => z.max(1e-7).ln(),
            Activation::Exp => z.clamp(-60.0, 60.0).exp(),
            Activation::Abs => z.abs(),
            Activation::Hat => (1.0 - z.abs()).max(0.0),
            Activation::Square => z * z,
            Activation::Cube => z * z * z,
            Activation::Softplus => {
                let z = (5.0 * z).clamp(-60.0, 60.0);
                0.2 * (1.0 + z.exp()).ln()
            }
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Sin => "sin",
            Activation::Gauss => "gauss",
            Activation::Relu => "relu",
            Activation::Elu => "elu",
            Activation::Identity => "identity",
            Activation::Clamped => "clamped",
            Activation::Inv => "inv",
            Activation::Log => "log",
            Activation::Exp => "exp",
            Activation::Abs => "abs",
            Activation::Hat => "hat",
            Activation::Square => "square",
            Activation::Cube => "cube",
            Activation::Softplus => "softplus",
        };
        f.write_str(name)
    }
}

/// How a node combines its weighted inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Product,
    Max,
    Min,
    Maxabs,
    Median,
    Mean,
}

impl Aggregation {
    /// Empty input yields 0 for every aggregation except product (1).
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return match self {
                Aggregation::Product => 1.0,
                _ => 0.0,
            };
        }
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Product => values.iter().product(),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Maxabs => values
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best }),
            Aggregation::Median => median(values),
            Aggregation::Mean => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Sum => "sum",
            Aggregation::Product => "product",
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Maxabs => "maxabs",
            Aggregation::Median => "median",
            Aggregation::Mean => "mean",
        };
        f.write_str(name)
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Population standard deviation.
pub(crate) fn stdev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_is_steepened_and_centered() {
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-12);
        assert!(Activation::Sigmoid.apply(1.0) > 0.99);
        assert!(Activation::Sigmoid.apply(-1000.0) >= 0.0);
    }

    #[test]
    fn test_clamping_functions() {
        assert_eq!(Activation::Clamped.apply(3.0), 1.0);
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Inv.apply(0.0), 0.0);
        assert_eq!(Activation::Hat.apply(2.0), 0.0);
        assert!(Activation::Exp.apply(1e6).is_finite());
    }

    #[test]
    fn test_aggregations() {
        let values = [1.0, -4.0, 3.0];
        assert_eq!(Aggregation::Sum.apply(&values), 0.0);
        assert_eq!(Aggregation::Product.apply(&values), -12.0);
        assert_eq!(Aggregation::Max.apply(&values), 3.0);
        assert_eq!(Aggregation::Min.apply(&values), -4.0);
        assert_eq!(Aggregation::Maxabs.apply(&values), -4.0);
        assert_eq!(Aggregation::Median.apply(&values), 1.0);
        assert_eq!(Aggregation::Mean.apply(&values), 0.0);
        assert_eq!(Aggregation::Sum.apply(&[]), 0.0);
    }

    #[test]
    fn test_stdev_is_population_stdev() {
        assert_eq!(stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_names_round_trip_through_serde() {
        let parsed: Activation = serde_json::from_str("\"softplus\"").unwrap();
        assert_eq!(parsed, Activation::Softplus);
        assert_eq!(parsed.to_string(), "softplus");
    }
}
