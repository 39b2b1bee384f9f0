//! Class labels and treatment recommendations for the plant disease model.
//!
//! The order of [`DISEASE_CLASSES`] is the contract between the classifier
//! output vector and label meaning: output index `i` corresponds to entry
//! `i`. It must match the ordering used when the model was trained.

/// Class labels, in training order.
pub const DISEASE_CLASSES: [&str; 38] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Blueberry___healthy",
    "Cherry___Powdery_mildew",
    "Cherry___healthy",
    "Corn___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn___Common_rust",
    "Corn___Northern_Leaf_Blight",
    "Corn___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

/// Treatment recommendations keyed by raw class label.
const TREATMENTS: &[(&str, &str)] = &[
    (
        "Apple___Apple_scab",
        "Apply fungicides early in the growing season. Remove and destroy infected leaves. Ensure good air circulation by pruning.",
    ),
    (
        "Apple___Black_rot",
        "Remove mummified fruits and cankers from trees. Apply fungicides at appropriate intervals. Prune to improve air circulation.",
    ),
    (
        "Apple___Cedar_apple_rust",
        "Remove nearby cedar trees if possible. Apply preventative fungicides. Plant resistant apple varieties.",
    ),
    (
        "Corn___Common_rust",
        "Apply foliar fungicides. Plant resistant corn varieties. Avoid irrigation practices that leave foliage wet for extended periods.",
    ),
    (
        "Grape___Black_rot",
        "Remove mummies and infected plant parts. Apply fungicide treatments. Improve air circulation through proper canopy management.",
    ),
    (
        "Potato___Early_blight",
        "Rotate crops. Remove and destroy infected plant debris. Apply appropriate fungicides. Avoid overhead irrigation.",
    ),
    (
        "Potato___Late_blight",
        "Apply copper-based fungicides. Practice crop rotation. Plant certified disease-free seed potatoes. Harvest during dry weather.",
    ),
    (
        "Tomato___Early_blight",
        "Remove lower infected leaves. Apply fungicides. Use mulch to prevent soil splash. Provide adequate plant spacing.",
    ),
    (
        "Tomato___Late_blight",
        "Apply copper-based fungicides. Remove and destroy infected plants. Ensure proper spacing and staking for good air circulation.",
    ),
    (
        "Tomato___Leaf_Mold",
        "Reduce humidity. Improve air circulation. Remove infected leaves. Apply appropriate fungicides.",
    ),
    (
        "Tomato___Septoria_leaf_spot",
        "Remove infected leaves. Apply fungicides. Practice crop rotation. Avoid overhead watering.",
    ),
];

/// Fallback for labels without a dedicated treatment entry.
pub const DEFAULT_TREATMENT: &str = "Remove and destroy infected plant parts. Ensure good air circulation. Consider appropriate fungicides or pesticides based on the specific disease. Consult with a local agricultural extension for specific recommendations.";

/// Treatment for the healthy special case.
pub const HEALTHY_TREATMENT: &str = "No treatment needed. Continue regular plant care practices.";

const LABEL_SEPARATOR: &str = "___";

/// Looks up the treatment for a raw class label, falling back to
/// [`DEFAULT_TREATMENT`]. Never returns an empty string.
pub fn treatment_for(raw_label: &str) -> &'static str {
    TREATMENTS
        .iter()
        .find(|(label, _)| *label == raw_label)
        .map(|(_, treatment)| *treatment)
        .unwrap_or(DEFAULT_TREATMENT)
}

/// A class label split once into its plant and condition parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabel {
    raw: String,
    plant: String,
    condition: String,
}

impl ClassLabel {
    /// Parses a `"Plant___Condition"` label. Returns `None` when either
    /// part is missing.
    pub fn parse(raw: &str) -> Option<Self> {
        let (plant, condition) = raw.split_once(LABEL_SEPARATOR)?;
        if plant.is_empty() || condition.is_empty() {
            return None;
        }
        Some(ClassLabel {
            raw: raw.to_string(),
            plant: plant.to_string(),
            condition: condition.to_string(),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn plant(&self) -> &str {
        &self.plant
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn is_healthy(&self) -> bool {
        self.condition.to_lowercase().contains("healthy")
    }
}

/// The ordered label catalog the classifier output indexes into.
#[derive(Debug, Clone)]
pub struct LabelCatalog {
    labels: Vec<ClassLabel>,
}

impl LabelCatalog {
    /// The catalog matching the shipped plant disease model.
    pub fn builtin() -> Self {
        let labels = DISEASE_CLASSES
            .iter()
            .map(|raw| ClassLabel::parse(raw).expect("built-in class label is well-formed"))
            .collect();
        LabelCatalog { labels }
    }

    pub fn new(labels: Vec<ClassLabel>) -> Self {
        LabelCatalog { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClassLabel> {
        self.labels.get(index)
    }

    pub fn index_of(&self, raw_label: &str) -> Option<usize> {
        self.labels.iter().position(|label| label.raw == raw_label)
    }
}
