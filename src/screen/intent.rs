use once_cell::sync::Lazy;
use regex::Regex;

use crate::screen::screen_model::{DetectedQuestion, QuestionIntent};

fn rx(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).expect("static intent pattern")
}

/// Ordered question patterns; the first match decides the intent.
static QUESTION_PATTERNS: Lazy<Vec<(Regex, QuestionIntent)>> = Lazy::new(|| {
    use QuestionIntent::*;
    vec![
        (rx(r"why\s*(do\s*)?you\s*want\s*(to\s*)?(work|join)"), CompanyInterest),
        (rx(r"why\s*(are\s*)?you\s*(interested|applying)"), CompanyInterest),
        (rx(r"what\s*attracts\s*you"), CompanyInterest),
        (rx(r"why\s*this\s*(company|role|position|job)"), CompanyInterest),
        (rx(r"what\s*excites\s*you\s*about"), CompanyInterest),
        (rx(r"tell\s*us\s*(about\s*)?(yourself|why)"), SelfIntroduction),
        (rx(r"describe\s*(yourself|your\s*background)"), SelfIntroduction),
        (rx(r"introduce\s*yourself"), SelfIntroduction),
        (rx(r"walk\s*(us|me)\s*through\s*your"), SelfIntroduction),
        (rx(r"what\s*makes\s*you\s*(a\s*good|the\s*right|qualified)"), Fit),
        (rx(r"why\s*should\s*we\s*(hire|choose)"), Fit),
        (rx(r"what\s*(can|will)\s*you\s*bring"), Fit),
        (rx(r"how\s*will\s*you\s*contribute"), Fit),
        (rx(r"what\s*are\s*your\s*strengths"), Strengths),
        (rx(r"greatest\s*strength"), Strengths),
        (rx(r"what\s*are\s*your\s*weaknesses"), Weaknesses),
        (rx(r"area.*(improvement|develop)"), Weaknesses),
        (rx(r"career\s*goals?"), CareerGoals),
        (rx(r"where\s*do\s*you\s*see\s*yourself"), CareerGoals),
        (rx(r"professional\s*goals?"), CareerGoals),
        (rx(r"(challenge|difficult|obstacle).*(overcome|faced|handled)"), ChallengeStory),
        (rx(r"tell\s*(us|me)\s*about\s*a\s*time"), ChallengeStory),
        (rx(r"describe\s*a\s*(situation|project|achievement)"), AchievementStory),
        (rx(r"proud(est)?\s*(accomplishment|achievement)"), AchievementStory),
        (rx(r"additional\s*(information|comments)"), Miscellaneous),
        (rx(r"anything\s*else"), Miscellaneous),
        (rx(r"is\s*there\s*anything"), Miscellaneous),
        (rx(r"cover\s*letter"), CoverLetter),
        (rx(r"letter\s*of\s*(motivation|interest)"), CoverLetter),
        (rx(r"motivation"), CoverLetter),
    ]
});

static COVER_LETTER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        rx(r"cover\s*letter"),
        rx(r"letter\s*of\s*(motivation|interest)"),
    ]
});

/// Text signals around a free-text control.
#[derive(Debug, Clone, Default)]
pub struct QuestionSignals<'a> {
    /// name, id, placeholder and aria-label, space-joined.
    pub attributes: &'a str,
    pub label: &'a str,
    pub container_text: &'a str,
}

impl QuestionSignals<'_> {
    fn combined(&self) -> String {
        format!("{} {} {}", self.attributes, self.label, self.container_text)
    }

    /// The question as the user sees it.
    fn question_text(&self) -> String {
        if self.label.trim().is_empty() {
            self.attributes.trim().to_string()
        } else {
            self.label.trim().to_string()
        }
    }
}

/// First matching intent across attributes, label, and container text.
pub fn detect_question(signals: &QuestionSignals<'_>) -> Option<DetectedQuestion> {
    let text = signals.combined();
    QUESTION_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&text))
        .map(|(_, intent)| DetectedQuestion {
            intent: *intent,
            question: signals.question_text(),
        })
}

/// Cover-letter check over attributes and label only.
pub fn is_cover_letter(signals: &QuestionSignals<'_>) -> bool {
    let text = format!("{} {}", signals.attributes, signals.label);
    COVER_LETTER_PATTERNS.iter().any(|p| p.is_match(&text))
}

/// Intent for a textarea: cover letter, then detected question, then
/// miscellaneous.
pub fn textarea_question(signals: &QuestionSignals<'_>) -> DetectedQuestion {
    if is_cover_letter(signals) {
        return DetectedQuestion {
            intent: QuestionIntent::CoverLetter,
            question: signals.question_text(),
        };
    }
    detect_question(signals).unwrap_or_else(|| DetectedQuestion {
        intent: QuestionIntent::Miscellaneous,
        question: signals.question_text(),
    })
}
