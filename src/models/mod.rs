use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical marker for a certificate field no pattern matched.
pub const NOT_DETECTED: &str = "not detected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    NativeText,
    RasterImage,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "native-text" => Some(MediaKind::NativeText),
            "raster-image" => Some(MediaKind::RasterImage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub product: String,
    pub internal_reference: String,
    pub serial_number: String,
    pub standards: String,
    pub manufacturer: String,
    pub issue_date: String,
    pub signatory: String,
    pub confidence: u8,
    pub raw_text: String,
}

impl ExtractedFields {
    pub fn empty() -> Self {
        ExtractedFields {
            product: NOT_DETECTED.to_string(),
            internal_reference: NOT_DETECTED.to_string(),
            serial_number: NOT_DETECTED.to_string(),
            standards: NOT_DETECTED.to_string(),
            manufacturer: NOT_DETECTED.to_string(),
            issue_date: NOT_DETECTED.to_string(),
            signatory: NOT_DETECTED.to_string(),
            confidence: 0,
            raw_text: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentRecord {
    pub id: String,
    pub code: String,
    #[serde(flatten)]
    pub fields: ExtractedFields,
    pub document_url: String,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentSummary {
    pub code: String,
    pub product: String,
    pub manufacturer: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CheckStatus {
    #[default]
    V,
    NA,
    X,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsectionEntry {
    #[serde(default)]
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crossed_words: Vec<String>,
}

impl SubsectionEntry {
    /// An entry counts as operator input when anything deviates from the
    /// template default: a non-V status, a non-empty comment, or at least
    /// one crossed word.
    pub fn is_touched(&self) -> bool {
        self.status != CheckStatus::V
            || self
                .comment
                .as_deref()
                .map(|c| !c.trim().is_empty())
                .unwrap_or(false)
            || !self.crossed_words.is_empty()
    }
}

/// Section id -> subsection id -> entry. BTreeMap keeps serialized output
/// stable across reads.
pub type SectionMap = BTreeMap<String, BTreeMap<String, SubsectionEntry>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyFindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chinstrap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general_comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum InspectionSchema {
    Legacy {
        #[serde(default)]
        findings: LegacyFindings,
    },
    Templated {
        template_id: String,
        #[serde(default)]
        sections: SectionMap,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionRecord {
    pub id: String,
    pub equipment_code: Option<String>,
    pub reference: Option<String>,
    pub serial_number: Option<String>,
    pub manufacture_date: Option<String>,
    pub purchase_date: Option<String>,
    pub first_use_date: Option<String>,
    pub size: Option<String>,
    pub overall_result: String,
    pub last_inspection_date: Option<String>,
    #[serde(flatten)]
    pub schema: InspectionSchema,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceState {
    Valid,
    Quarantined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectionSummary {
    pub id: String,
    pub equipment_code: Option<String>,
    pub reference: Option<String>,
    pub overall_result: String,
    pub last_inspection_date: Option<String>,
    pub compliance: ComplianceState,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub sections: Vec<TemplateSection>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSection {
    pub id: String,
    pub title: String,
    pub subsections: Vec<TemplateSubsection>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSubsection {
    pub id: String,
    pub label: String,
    #[serde(default = "default_true")]
    pub has_status: bool,
    #[serde(default)]
    pub is_subtitle: bool,
}
