use super::artifact::{Activation, InputScaling, ModelArtifact, ModelError, RiskSpec};
use super::{ModelInferenceError, SurvivalModel};
use crate::codec::FeatureLayout;
use ndarray::{Array1, Array2, ArrayView1};

// exp() overflows f64 just past 709.
const MAX_ABS_LOG_HAZARD_RATIO: f64 = 700.0;

const SELU_LAMBDA: f64 = 1.050_700_987_355_480_5;
const SELU_ALPHA: f64 = 1.673_263_242_354_377_2;

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut output = self.weights.dot(&input) + &self.bias;
        let activation = self.activation;
        output.mapv_inplace(|z| activate(activation, z));
        output
    }
}

#[inline]
fn activate(activation: Activation, z: f64) -> f64 {
    match activation {
        Activation::Relu => z.max(0.0),
        Activation::Selu => {
            if z > 0.0 {
                SELU_LAMBDA * z
            } else {
                SELU_LAMBDA * SELU_ALPHA * (z.exp() - 1.0)
            }
        }
        Activation::Tanh => z.tanh(),
        Activation::Sigmoid => 1.0 / (1.0 + (-z).exp()),
        Activation::Identity => z,
    }
}

#[derive(Debug, Clone)]
enum RiskFunction {
    Linear(Array1<f64>),
    Network(Vec<DenseLayer>),
}

impl RiskFunction {
    fn log_hazard_ratio(&self, features: ArrayView1<'_, f64>) -> f64 {
        match self {
            RiskFunction::Linear(coefficients) => coefficients.dot(&features),
            RiskFunction::Network(layers) => {
                let mut activations = features.to_owned();
                for layer in layers {
                    activations = layer.forward(activations.view());
                }
                // Validation guarantees a single output unit.
                activations[0]
            }
        }
    }
}

/// A validated model ready for inference.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    name: String,
    family: &'static str,
    num_features: usize,
    feature_names: Vec<String>,
    scaling: Option<(Array1<f64>, Array1<f64>)>,
    risk: RiskFunction,
    baseline_survival: Array1<f64>,
}

impl LoadedModel {
    /// Checks every structural invariant of the artifact and builds the
    /// matrices used at prediction time.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        let ModelArtifact {
            name,
            num_features,
            feature_names,
            baseline_survival,
            input_scaling,
            risk,
        } = artifact;

        validate_baseline(&baseline_survival)?;

        if !feature_names.is_empty() && feature_names.len() != num_features {
            return Err(ModelError::FeatureOrderMismatch {
                expected: feature_names,
                found: vec![format!("{num_features} unnamed features")],
            });
        }

        let scaling = input_scaling
            .map(|scaling| compile_scaling(scaling, num_features))
            .transpose()?;

        let family = risk.family();
        let risk = match risk {
            RiskSpec::CoxPH { coefficients } => {
                if coefficients.len() != num_features {
                    return Err(ModelError::CoefficientCount {
                        expected: num_features,
                        found: coefficients.len(),
                    });
                }
                if coefficients.iter().any(|value| !value.is_finite()) {
                    return Err(ModelError::NonFiniteParameter("coefficients".to_string()));
                }
                RiskFunction::Linear(Array1::from(coefficients))
            }
            RiskSpec::DeepSurv { layers } => {
                RiskFunction::Network(compile_layers(layers, num_features)?)
            }
        };

        log::debug!(
            "Validated {family} model '{name}': {num_features} features, {} time steps",
            baseline_survival.len()
        );

        Ok(Self {
            name,
            family,
            num_features,
            feature_names,
            scaling,
            risk,
            baseline_survival: Array1::from(baseline_survival),
        })
    }

    #[inline]
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Refuses a layout whose input order differs from the one the model was
    /// fitted on. Models saved without feature names only get a count check.
    pub fn check_layout(&self, layout: &FeatureLayout) -> Result<(), ModelError> {
        let order = layout.required_order();
        let names_differ = !self.feature_names.is_empty() && self.feature_names != order;
        if names_differ || order.len() != self.num_features {
            return Err(ModelError::FeatureOrderMismatch {
                expected: if self.feature_names.is_empty() {
                    vec![format!("{} unnamed features", self.num_features)]
                } else {
                    self.feature_names.clone()
                },
                found: order.to_vec(),
            });
        }
        Ok(())
    }

    fn hazard_ratio(&self, features: ArrayView1<'_, f64>) -> f64 {
        let log_hr = match &self.scaling {
            Some((mean, scale)) => {
                let standardized = (&features - mean) / scale;
                self.risk.log_hazard_ratio(standardized.view())
            }
            None => self.risk.log_hazard_ratio(features),
        };
        log_hr
            .clamp(-MAX_ABS_LOG_HAZARD_RATIO, MAX_ABS_LOG_HAZARD_RATIO)
            .exp()
    }
}

impl SurvivalModel for LoadedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn num_time_steps(&self) -> usize {
        self.baseline_survival.len()
    }

    fn predict_survival(
        &self,
        features: ArrayView1<'_, f64>,
        requested_times: Option<&[usize]>,
    ) -> Result<Array1<f64>, ModelInferenceError> {
        if features.len() != self.num_features {
            return Err(ModelInferenceError::FeatureCount {
                expected: self.num_features,
                found: features.len(),
            });
        }
        if let Some((index, &value)) = features.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ModelInferenceError::NonFiniteFeature { index, value });
        }

        let hazard_ratio = self.hazard_ratio(features);
        let horizon = self.baseline_survival.len();
        let times: Vec<usize> = match requested_times {
            Some(times) => {
                if let Some(&time_index) = times.iter().find(|&&t| t >= horizon) {
                    return Err(ModelInferenceError::TimeOutOfRange {
                        time_index,
                        horizon,
                    });
                }
                times.to_vec()
            }
            None => (0..horizon).collect(),
        };

        // S(t | x) = S0(t) ^ exp(risk(x))
        let mut survival = Array1::<f64>::zeros(times.len());
        for (slot, &time_index) in survival.iter_mut().zip(times.iter()) {
            let value = self.baseline_survival[time_index].powf(hazard_ratio);
            if !value.is_finite() {
                return Err(ModelInferenceError::NonFiniteSurvival { time_index });
            }
            *slot = value.clamp(0.0, 1.0);
        }
        Ok(survival)
    }
}

fn validate_baseline(baseline: &[f64]) -> Result<(), ModelError> {
    if baseline.is_empty() {
        return Err(ModelError::InvalidBaseline(
            "the curve has no time steps".to_string(),
        ));
    }
    for (time_index, &value) in baseline.iter().enumerate() {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ModelError::InvalidBaseline(format!(
                "value {value} at month {time_index} is outside [0, 1]"
            )));
        }
        if time_index > 0 && value > baseline[time_index - 1] {
            return Err(ModelError::InvalidBaseline(format!(
                "survival increases at month {time_index}"
            )));
        }
    }
    Ok(())
}

fn compile_scaling(
    scaling: InputScaling,
    num_features: usize,
) -> Result<(Array1<f64>, Array1<f64>), ModelError> {
    if scaling.mean.len() != num_features || scaling.scale.len() != num_features {
        return Err(ModelError::InvalidScaling(format!(
            "expected {num_features} means and scales, found {} and {}",
            scaling.mean.len(),
            scaling.scale.len()
        )));
    }
    if scaling.mean.iter().any(|value| !value.is_finite()) {
        return Err(ModelError::NonFiniteParameter("input_scaling.mean".to_string()));
    }
    if scaling
        .scale
        .iter()
        .any(|value| !value.is_finite() || *value == 0.0)
    {
        return Err(ModelError::InvalidScaling(
            "every scale must be finite and non-zero".to_string(),
        ));
    }
    Ok((Array1::from(scaling.mean), Array1::from(scaling.scale)))
}

fn compile_layers(
    layers: Vec<super::artifact::DenseLayerSpec>,
    num_features: usize,
) -> Result<Vec<DenseLayer>, ModelError> {
    if layers.is_empty() {
        return Err(ModelError::LayerShape {
            layer: 0,
            reason: "the network has no layers".to_string(),
        });
    }
    let layer_count = layers.len();
    let mut inputs = num_features;
    let mut compiled = Vec::with_capacity(layer_count);
    for (layer, spec) in layers.into_iter().enumerate() {
        let outputs = spec.weights.len();
        if outputs == 0 {
            return Err(ModelError::LayerShape {
                layer,
                reason: "the weight matrix has no rows".to_string(),
            });
        }
        if let Some(row) = spec.weights.iter().position(|row| row.len() != inputs) {
            return Err(ModelError::LayerShape {
                layer,
                reason: format!(
                    "row {row} has {} weights, expected {inputs}",
                    spec.weights[row].len()
                ),
            });
        }
        if spec.bias.len() != outputs {
            return Err(ModelError::LayerShape {
                layer,
                reason: format!("{} biases for {outputs} output units", spec.bias.len()),
            });
        }
        let flat: Vec<f64> = spec.weights.into_iter().flatten().collect();
        if flat.iter().chain(spec.bias.iter()).any(|value| !value.is_finite()) {
            return Err(ModelError::NonFiniteParameter(format!("layers[{layer}]")));
        }
        let weights = Array2::from_shape_vec((outputs, inputs), flat).map_err(|err| {
            ModelError::LayerShape {
                layer,
                reason: err.to_string(),
            }
        })?;
        compiled.push(DenseLayer {
            weights,
            bias: Array1::from(spec.bias),
            activation: spec.activation,
        });
        inputs = outputs;
    }
    if inputs != 1 {
        return Err(ModelError::LayerShape {
            layer: layer_count - 1,
            reason: format!("the final layer must have one output unit, found {inputs}"),
        });
    }
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::artifact::DenseLayerSpec;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn cox(coefficients: Vec<f64>, baseline: Vec<f64>) -> ModelArtifact {
        ModelArtifact {
            name: "CoxPH".to_string(),
            num_features: coefficients.len(),
            feature_names: Vec::new(),
            baseline_survival: baseline,
            input_scaling: None,
            risk: RiskSpec::CoxPH { coefficients },
        }
    }

    #[test]
    fn zero_risk_returns_baseline() {
        let model =
            LoadedModel::from_artifact(cox(vec![0.4, -0.3], vec![1.0, 0.9, 0.7])).expect("valid");
        let survival = model
            .predict_survival(array![0.0, 0.0].view(), None)
            .expect("prediction");
        assert_eq!(survival, array![1.0, 0.9, 0.7]);
    }

    #[test]
    fn cox_risk_raises_baseline_to_hazard_ratio() {
        let model =
            LoadedModel::from_artifact(cox(vec![0.5, 0.25], vec![1.0, 0.8, 0.6])).expect("valid");
        let survival = model
            .predict_survival(array![1.0, 2.0].view(), None)
            .expect("prediction");
        // log HR = 0.5 + 0.5 = 1.0
        let hr = 1.0_f64.exp();
        assert_abs_diff_eq!(survival[1], 0.8_f64.powf(hr), epsilon = 1e-12);
        assert_abs_diff_eq!(survival[2], 0.6_f64.powf(hr), epsilon = 1e-12);
        assert_eq!(survival[0], 1.0);
    }

    #[test]
    fn requested_times_select_and_bound() {
        let model =
            LoadedModel::from_artifact(cox(vec![0.0], vec![1.0, 0.9, 0.8, 0.7])).expect("valid");
        let picked = model
            .predict_survival(array![3.0].view(), Some(&[3, 1][..]))
            .expect("prediction");
        assert_eq!(picked, array![0.7, 0.9]);

        let err = model
            .predict_survival(array![3.0].view(), Some(&[4][..]))
            .unwrap_err();
        assert_eq!(
            err,
            ModelInferenceError::TimeOutOfRange {
                time_index: 4,
                horizon: 4
            }
        );
    }

    #[test]
    fn network_forward_pass_matches_hand_computation() {
        let artifact = ModelArtifact {
            name: "DeepSurv".to_string(),
            num_features: 2,
            feature_names: Vec::new(),
            baseline_survival: vec![1.0, 0.5],
            input_scaling: Some(InputScaling {
                mean: vec![1.0, 0.0],
                scale: vec![2.0, 1.0],
            }),
            risk: RiskSpec::DeepSurv {
                layers: vec![
                    DenseLayerSpec {
                        activation: Activation::Relu,
                        bias: vec![0.0, 1.0],
                        weights: vec![vec![1.0, 1.0], vec![-1.0, -1.0]],
                    },
                    DenseLayerSpec {
                        activation: Activation::Identity,
                        bias: vec![0.1],
                        weights: vec![vec![2.0, 0.5]],
                    },
                ],
            },
        };
        let model = LoadedModel::from_artifact(artifact).expect("valid");
        assert_eq!(model.family(), "DeepSurv");

        // standardized x = [(3 - 1) / 2, 1] = [1, 1]
        // hidden = relu([2, -1]) = [2, 0]; risk = 4 + 0 + 0.1
        let survival = model
            .predict_survival(array![3.0, 1.0].view(), None)
            .expect("prediction");
        assert_abs_diff_eq!(survival[1], 0.5_f64.powf(4.1_f64.exp()), epsilon = 1e-15);
    }

    #[test]
    fn activations_behave_at_reference_points() {
        assert_eq!(activate(Activation::Relu, -2.0), 0.0);
        assert_eq!(activate(Activation::Identity, -2.0), -2.0);
        assert_abs_diff_eq!(activate(Activation::Sigmoid, 0.0), 0.5);
        assert_abs_diff_eq!(activate(Activation::Tanh, 0.0), 0.0);
        assert_abs_diff_eq!(activate(Activation::Selu, 1.0), SELU_LAMBDA);
        assert!(activate(Activation::Selu, -50.0) > -SELU_LAMBDA * SELU_ALPHA - 1e-12);
    }

    #[test]
    fn extreme_risk_stays_within_unit_interval() {
        let model =
            LoadedModel::from_artifact(cox(vec![1.0], vec![1.0, 0.99, 0.5])).expect("valid");
        for x in [-1e6, 1e6] {
            let survival = model
                .predict_survival(array![x].view(), None)
                .expect("prediction");
            assert!(survival.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn rejects_wrong_feature_count_and_non_finite_input() {
        let model = LoadedModel::from_artifact(cox(vec![1.0, 1.0], vec![1.0])).expect("valid");
        assert_eq!(
            model.predict_survival(array![1.0].view(), None),
            Err(ModelInferenceError::FeatureCount {
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            model.predict_survival(array![1.0, f64::INFINITY].view(), None),
            Err(ModelInferenceError::NonFiniteFeature { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_bad_baselines() {
        for baseline in [vec![], vec![1.0, 1.1], vec![1.0, 0.5, 0.6], vec![f64::NAN]] {
            let result = LoadedModel::from_artifact(cox(vec![1.0], baseline));
            assert!(matches!(result, Err(ModelError::InvalidBaseline(_))));
        }
    }

    #[test]
    fn rejects_mismatched_layer_shapes() {
        let mut artifact = cox(vec![1.0, 1.0], vec![1.0, 0.9]);
        artifact.risk = RiskSpec::DeepSurv {
            layers: vec![DenseLayerSpec {
                activation: Activation::Tanh,
                bias: vec![0.0],
                weights: vec![vec![1.0, 1.0, 1.0]],
            }],
        };
        assert!(matches!(
            LoadedModel::from_artifact(artifact.clone()),
            Err(ModelError::LayerShape { layer: 0, .. })
        ));

        artifact.risk = RiskSpec::DeepSurv {
            layers: vec![DenseLayerSpec {
                activation: Activation::Tanh,
                bias: vec![0.0, 0.0],
                weights: vec![vec![1.0, 1.0], vec![1.0, 1.0]],
            }],
        };
        assert!(matches!(
            LoadedModel::from_artifact(artifact),
            Err(ModelError::LayerShape { .. })
        ));
    }

    #[test]
    fn rejects_coefficient_count_and_zero_scale() {
        let mut artifact = cox(vec![1.0, 2.0], vec![1.0]);
        artifact.num_features = 3;
        assert!(matches!(
            LoadedModel::from_artifact(artifact),
            Err(ModelError::CoefficientCount {
                expected: 3,
                found: 2
            })
        ));

        let mut scaled = cox(vec![1.0], vec![1.0]);
        scaled.input_scaling = Some(InputScaling {
            mean: vec![0.0],
            scale: vec![0.0],
        });
        assert!(matches!(
            LoadedModel::from_artifact(scaled),
            Err(ModelError::InvalidScaling(_))
        ));
    }

    #[test]
    fn layout_order_must_match_fitted_order() {
        let layout = FeatureLayout::ovarian_clear_cell().expect("builtin layout");
        let mut artifact = cox(vec![0.1; 11], vec![1.0, 0.9]);
        artifact.feature_names = layout.required_order().to_vec();
        let model = LoadedModel::from_artifact(artifact.clone()).expect("valid");
        model.check_layout(&layout).expect("matching order");

        artifact.feature_names.swap(0, 1);
        let reordered = LoadedModel::from_artifact(artifact).expect("valid");
        assert!(matches!(
            reordered.check_layout(&layout),
            Err(ModelError::FeatureOrderMismatch { .. })
        ));

        let narrow = LoadedModel::from_artifact(cox(vec![0.1; 3], vec![1.0])).expect("valid");
        assert!(narrow.check_layout(&layout).is_err());
    }
}
