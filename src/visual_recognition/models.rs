//! Visual Recognition V3 data model.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassResult {
    pub class: String,
    pub score: f64,
    #[serde(default)]
    pub type_hierarchy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub name: String,
    pub classifier_id: String,
    #[serde(default)]
    pub classes: Vec<ClassResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: i64,
    pub description: String,
    pub error_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningInfo {
    pub warning_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedImage {
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub resolved_url: Option<String>,
    /// File name inside the uploaded archive.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    #[serde(default)]
    pub classifiers: Vec<ClassifierResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifiedImages {
    #[serde(default)]
    pub custom_classes: Option<i64>,
    #[serde(default)]
    pub images_processed: Option<i64>,
    #[serde(default)]
    pub images: Vec<ClassifiedImage>,
    #[serde(default)]
    pub warnings: Vec<WarningInfo>,
}

impl ClassifiedImages {
    /// Highest scoring class across all images and classifiers.
    pub fn top_class(&self) -> Option<&ClassResult> {
        self.images
            .iter()
            .flat_map(|image| &image.classifiers)
            .flat_map(|classifier| &classifier.classes)
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStatus {
    Ready,
    Training,
    Retraining,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifier {
    pub classifier_id: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub status: Option<ClassifierStatus>,
    #[serde(default)]
    pub core_ml_enabled: Option<bool>,
    /// Why training failed, when it did.
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub retrained: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Classifiers {
    #[serde(default)]
    pub classifiers: Vec<Classifier>,
}
