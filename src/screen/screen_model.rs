use std::fmt;

use serde::{Deserialize, Serialize};

use crate::browser::document::NodeId;

// ============================================================================
// Semantic field types
// ============================================================================

/// Role a control plays in the user's profile.
///
/// Known roles serialize as their camelCase storage key; anything else is a
/// user-defined custom parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SemanticFieldType {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    City,
    Country,
    WorkCountries,
    Linkedin,
    Website,
    Github,
    Twitter,
    CurrentCompany,
    CurrentTitle,
    YearsExperience,
    University,
    Degree,
    GradYear,
    HeardAbout,
    Salary,
    StartDate,
    CoverLetter,
    Custom(String),
}

impl SemanticFieldType {
    pub fn key(&self) -> &str {
        match self {
            SemanticFieldType::FirstName => "firstName",
            SemanticFieldType::LastName => "lastName",
            SemanticFieldType::FullName => "fullName",
            SemanticFieldType::Email => "email",
            SemanticFieldType::Phone => "phone",
            SemanticFieldType::City => "city",
            SemanticFieldType::Country => "country",
            SemanticFieldType::WorkCountries => "workCountries",
            SemanticFieldType::Linkedin => "linkedin",
            SemanticFieldType::Website => "website",
            SemanticFieldType::Github => "github",
            SemanticFieldType::Twitter => "twitter",
            SemanticFieldType::CurrentCompany => "currentCompany",
            SemanticFieldType::CurrentTitle => "currentTitle",
            SemanticFieldType::YearsExperience => "yearsExperience",
            SemanticFieldType::University => "university",
            SemanticFieldType::Degree => "degree",
            SemanticFieldType::GradYear => "gradYear",
            SemanticFieldType::HeardAbout => "heardAbout",
            SemanticFieldType::Salary => "salary",
            SemanticFieldType::StartDate => "startDate",
            SemanticFieldType::CoverLetter => "coverLetter",
            SemanticFieldType::Custom(key) => key,
        }
    }

    pub fn from_key(key: &str) -> SemanticFieldType {
        match key {
            "firstName" => SemanticFieldType::FirstName,
            "lastName" => SemanticFieldType::LastName,
            "fullName" => SemanticFieldType::FullName,
            "email" => SemanticFieldType::Email,
            "phone" => SemanticFieldType::Phone,
            "city" => SemanticFieldType::City,
            "country" => SemanticFieldType::Country,
            "workCountries" => SemanticFieldType::WorkCountries,
            "linkedin" => SemanticFieldType::Linkedin,
            "website" => SemanticFieldType::Website,
            "github" => SemanticFieldType::Github,
            "twitter" => SemanticFieldType::Twitter,
            "currentCompany" => SemanticFieldType::CurrentCompany,
            "currentTitle" => SemanticFieldType::CurrentTitle,
            "yearsExperience" => SemanticFieldType::YearsExperience,
            "university" => SemanticFieldType::University,
            "degree" => SemanticFieldType::Degree,
            "gradYear" => SemanticFieldType::GradYear,
            "heardAbout" => SemanticFieldType::HeardAbout,
            "salary" => SemanticFieldType::Salary,
            "startDate" => SemanticFieldType::StartDate,
            "coverLetter" => SemanticFieldType::CoverLetter,
            other => SemanticFieldType::Custom(other.to_string()),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, SemanticFieldType::Custom(_))
    }
}

impl From<String> for SemanticFieldType {
    fn from(key: String) -> Self {
        SemanticFieldType::from_key(&key)
    }
}

impl From<SemanticFieldType> for String {
    fn from(field: SemanticFieldType) -> Self {
        field.key().to_string()
    }
}

impl fmt::Display for SemanticFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Controls
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    NativeText,
    NativeTextarea,
    NativeSelect,
    /// Text input plus floating option list; `root` encloses the input and
    /// its displayed selection.
    CompositeCombobox { root: NodeId },
}

impl WidgetKind {
    pub fn is_dropdown(&self) -> bool {
        matches!(
            self,
            WidgetKind::NativeSelect | WidgetKind::CompositeCombobox { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            WidgetKind::NativeText => "native-text",
            WidgetKind::NativeTextarea => "native-textarea",
            WidgetKind::NativeSelect => "native-select",
            WidgetKind::CompositeCombobox { .. } => "composite-combobox",
        }
    }
}

/// Identifying attributes of a control, as authored in the markup.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdentifierTokens {
    pub name: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    pub data_field: Option<String>,
    pub aria_label: Option<String>,
    pub autocomplete: Option<String>,
}

impl IdentifierTokens {
    /// Lowercased, space-joined non-empty attributes in classifier order.
    pub fn attribute_string(&self) -> String {
        [
            &self.name,
            &self.id,
            &self.placeholder,
            &self.data_field,
            &self.aria_label,
            &self.autocomplete,
        ]
        .iter()
        .filter_map(|v| v.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_string().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormControl {
    pub node: NodeId,
    pub kind: WidgetKind,
    pub tokens: IdentifierTokens,
    pub input_type: Option<String>,
    pub max_length: Option<i64>,
    /// Raw value for text controls; rendered selection text for dropdowns.
    pub current_value: String,
    pub editable: bool,
    /// Stable identity across re-scans of the same markup.
    pub fingerprint: String,
}

impl FormControl {
    pub fn is_dropdown(&self) -> bool {
        self.kind.is_dropdown()
    }

    pub fn has_value(&self) -> bool {
        let v = self.current_value.trim();
        !v.is_empty() && v != "null" && v != "undefined"
    }

    /// Free-text input long enough to hold a written answer.
    pub fn is_long_form_input(&self) -> bool {
        self.kind == WidgetKind::NativeText
            && self.max_length.map_or(true, |max| max <= 0 || max > 100)
    }
}

// ============================================================================
// Resolution vocabulary
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionPath {
    Profile,
    Memory,
    AiDropdown,
    AiText,
}

impl fmt::Display for ResolutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionPath::Profile => "profile",
            ResolutionPath::Memory => "memory",
            ResolutionPath::AiDropdown => "ai-dropdown",
            ResolutionPath::AiText => "ai-text",
        };
        f.write_str(name)
    }
}

/// What an open-ended question is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionIntent {
    CompanyInterest,
    SelfIntroduction,
    Fit,
    Strengths,
    Weaknesses,
    CareerGoals,
    ChallengeStory,
    AchievementStory,
    Miscellaneous,
    CoverLetter,
}

impl QuestionIntent {
    pub fn name(&self) -> &'static str {
        match self {
            QuestionIntent::CompanyInterest => "company-interest",
            QuestionIntent::SelfIntroduction => "self-introduction",
            QuestionIntent::Fit => "fit",
            QuestionIntent::Strengths => "strengths",
            QuestionIntent::Weaknesses => "weaknesses",
            QuestionIntent::CareerGoals => "career-goals",
            QuestionIntent::ChallengeStory => "challenge-story",
            QuestionIntent::AchievementStory => "achievement-story",
            QuestionIntent::Miscellaneous => "miscellaneous",
            QuestionIntent::CoverLetter => "cover-letter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedQuestion {
    pub intent: QuestionIntent,
    pub question: String,
}
