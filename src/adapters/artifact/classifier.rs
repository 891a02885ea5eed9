//! Classifier artifacts: linear (logistic / softmax) and additive tree ensembles.

use serde::Deserialize;

use super::ArtifactError;
use crate::ports::{ClassProbabilities, Classifier, ModelError};

/// Serialized classifier, discriminated by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    Logistic(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

impl ClassifierArtifact {
    pub(crate) fn validate(&self, name: &str) -> Result<(), ArtifactError> {
        let shape = |reason: String| ArtifactError::Shape {
            name: name.to_string(),
            reason,
        };
        match self {
            Self::Logistic(m) => m.validate().map_err(shape),
            Self::TreeEnsemble(m) => m.validate().map_err(shape),
        }
    }
}

impl Classifier for ClassifierArtifact {
    fn n_features(&self) -> usize {
        match self {
            Self::Logistic(m) => m.n_features(),
            Self::TreeEnsemble(m) => m.n_features(),
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ModelError> {
        match self {
            Self::Logistic(m) => m.predict_proba(features),
            Self::TreeEnsemble(m) => m.predict_proba(features),
        }
    }
}

/// Linear model. Two classes use one coefficient row and a sigmoid;
/// more classes use one row per class and a softmax.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub classes: Vec<i64>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearModel {
    fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        let rows = if self.classes.len() == 2 {
            1
        } else {
            self.classes.len()
        };
        if self.coefficients.len() != rows || self.intercepts.len() != rows {
            return Err(format!(
                "expected {rows} coefficient rows and intercepts for {} classes",
                self.classes.len()
            ));
        }
        let n = self.n_features();
        if n == 0 || self.coefficients.iter().any(|row| row.len() != n) {
            return Err("coefficient rows must be non-empty and equal length".into());
        }
        if !self.feature_names.is_empty() && self.feature_names.len() != n {
            return Err(format!(
                "{} feature names for {n} coefficients",
                self.feature_names.len()
            ));
        }
        let all_finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(&self.intercepts)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err("non-finite parameter".into());
        }
        Ok(())
    }
}

impl Classifier for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients.first().map_or(0, Vec::len)
    }

    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ModelError> {
        self.check_features(features)?;
        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| dot(row, features) + b)
            .collect();
        ClassProbabilities::new(self.classes.clone(), link(&logits))
    }
}

/// Additive ensemble of regression trees producing margins.
///
/// With more than two classes, tree `i` contributes to class `i % classes`.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEnsemble {
    pub feature_names: Vec<String>,
    pub classes: Vec<i64>,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<TreeNode>,
}

/// One tree node. Values below `threshold` go left; NaN follows
/// `missing_left`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        #[serde(default)]
        missing_left: bool,
    },
    Leaf {
        leaf: f64,
    },
}

impl TreeNode {
    fn eval(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Self::Leaf { leaf } => return *leaf,
                Self::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing_left,
                } => {
                    let v = features.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if v.is_nan() {
                        if *missing_left {
                            left
                        } else {
                            right
                        }
                    } else if v < *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            Self::Leaf { leaf } if leaf.is_finite() => Ok(()),
            Self::Leaf { .. } => Err("non-finite leaf value".into()),
            Self::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                if *feature >= n_features {
                    return Err(format!(
                        "split on feature {feature}, model has {n_features}"
                    ));
                }
                if threshold.is_nan() {
                    return Err("NaN split threshold".into());
                }
                left.validate(n_features)?;
                right.validate(n_features)
            }
        }
    }
}

impl TreeEnsemble {
    fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        if self.feature_names.is_empty() {
            return Err("feature_names must not be empty".into());
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".into());
        }
        let k = self.classes.len();
        if k > 2 && self.trees.len() % k != 0 {
            return Err(format!("{} trees do not divide into {k} classes", self.trees.len()));
        }
        if !self.base_score.is_finite() {
            return Err("non-finite base_score".into());
        }
        self.trees
            .iter()
            .try_for_each(|t| t.validate(self.feature_names.len()))
    }
}

impl Classifier for TreeEnsemble {
    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ModelError> {
        self.check_features(features)?;
        let outputs = if self.classes.len() == 2 {
            1
        } else {
            self.classes.len()
        };
        let mut margins = vec![self.base_score; outputs];
        for (i, tree) in self.trees.iter().enumerate() {
            margins[i % outputs] += tree.eval(features);
        }
        ClassProbabilities::new(self.classes.clone(), link(&margins))
    }
}

fn validate_classes(classes: &[i64]) -> Result<(), String> {
    if classes.len() < 2 {
        return Err("at least two classes required".into());
    }
    let mut sorted = classes.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != classes.len() {
        return Err("duplicate class labels".into());
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// One margin: sigmoid into two probabilities. Several: softmax.
fn link(margins: &[f64]) -> Vec<f64> {
    if let [z] = margins {
        let p = sigmoid(*z);
        return vec![1.0 - p, p];
    }
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|z| (z - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
