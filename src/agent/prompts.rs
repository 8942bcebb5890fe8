use crate::agent::page_context::PageContext;
use crate::screen::screen_model::{QuestionIntent, SemanticFieldType};
use crate::state::normalize::truncate_chars;
use crate::state::profile::{NEEDS_VISA_KEY, ProfileRecord, WORK_AUTHORIZATION_KEY};

pub const MAX_JOB_DESCRIPTION_CHARS: usize = 2500;
pub const MAX_RESUME_CHARS: usize = 3000;

const NOT_SPECIFIED: &str = "Not specified";

fn or_unspecified<'a>(profile: &'a ProfileRecord, field: SemanticFieldType) -> &'a str {
    profile.get(&field).unwrap_or(NOT_SPECIFIED)
}

/// Full name, or first and last joined.
pub fn display_name(profile: &ProfileRecord) -> String {
    if let Some(full) = profile.get(&SemanticFieldType::FullName) {
        return full.trim().to_string();
    }
    let joined = [
        profile.get(&SemanticFieldType::FirstName).unwrap_or(""),
        profile.get(&SemanticFieldType::LastName).unwrap_or(""),
    ]
    .join(" ")
    .trim()
    .to_string();

    if joined.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        joined
    }
}

// ============================================================================
// Constrained choice
// ============================================================================

/// Candidate summary for dropdown questions, including work authorization.
pub fn choice_profile_summary(profile: &ProfileRecord) -> String {
    use SemanticFieldType::*;
    format!(
        "- Name: {}\n- Current Role: {}\n- Current Company: {}\n- Experience: {} years\n- Education: {} from {}\n- Location: {}, {}\n- Work Authorization: {}\n- Visa Sponsorship Needed: {}",
        display_name(profile),
        or_unspecified(profile, CurrentTitle),
        or_unspecified(profile, CurrentCompany),
        or_unspecified(profile, YearsExperience),
        or_unspecified(profile, Degree),
        or_unspecified(profile, University),
        or_unspecified(profile, City),
        profile.get(&Country).unwrap_or(""),
        profile.get_key(WORK_AUTHORIZATION_KEY).unwrap_or(NOT_SPECIFIED),
        profile.get_key(NEEDS_VISA_KEY).unwrap_or(NOT_SPECIFIED),
    )
}

/// Prompt asking for exactly one of `options`, reproduced verbatim.
pub fn build_choice_prompt(question: &str, options: &[String], profile: &ProfileRecord) -> String {
    let listed = options
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. \"{}\"", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are filling in a job application form for a candidate.

Question: "{question}"

OPTIONS (pick exactly ONE, written exactly as listed):
{listed}

Candidate:
{profile}

Pick the option that best answers the question for this candidate.
Reply with the option text only, nothing else."#,
        question = question,
        listed = listed,
        profile = choice_profile_summary(profile),
    )
}

/// Model reply with whitespace and one layer of surrounding quotes removed.
pub fn clean_choice_reply(reply: &str) -> String {
    let trimmed = reply.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(['"', '\'']).unwrap_or(trimmed);
    trimmed.trim().to_string()
}

// ============================================================================
// Open text
// ============================================================================

/// Everything an open-text answer may draw on.
#[derive(Debug, Clone, Copy)]
pub struct AnswerContext<'a> {
    pub page: &'a PageContext,
    pub profile: &'a ProfileRecord,
    pub user_notes: Option<&'a str>,
    pub resume_text: Option<&'a str>,
}

fn base_context(ctx: &AnswerContext<'_>) -> String {
    use SemanticFieldType::*;

    let company = ctx.page.company.as_deref();
    let title = ctx.page.job_title.as_deref();
    let description = ctx
        .page
        .job_description
        .as_deref()
        .map(|d| truncate_chars(d, MAX_JOB_DESCRIPTION_CHARS))
        .unwrap_or("Not available");

    let mut out = format!(
        r#"
GROUND RULES:
- Write in the FIRST PERSON as the candidate (I, my, me)
- Make it specific to "{company_ref}" and the role "{title_ref}"
- Never name a job board or hiring platform (LinkedIn, Indeed, Greenhouse, Lever, etc.) as the employer
- Never leave placeholders such as [Company] or [Your Name]; use real details or leave them out
- Back every claim with something concrete
- If the company is unclear, focus on the role and its requirements

THE JOB:
- Position: {title}
- Company: {company}
- Description: {description}

PAGE CONTEXT:
{page}

THE CANDIDATE:
- Name: {name}
- Current Role: {role} at {employer}
- Experience: {years} years
- Education: {degree} from {university}
- Location: {city}
"#,
        company_ref = company.unwrap_or("the company"),
        title_ref = title.unwrap_or("this position"),
        title = title.unwrap_or(NOT_SPECIFIED),
        company = company.unwrap_or(NOT_SPECIFIED),
        description = description,
        page = ctx.page.summary,
        name = display_name(ctx.profile),
        role = or_unspecified(ctx.profile, CurrentTitle),
        employer = or_unspecified(ctx.profile, CurrentCompany),
        years = or_unspecified(ctx.profile, YearsExperience),
        degree = or_unspecified(ctx.profile, Degree),
        university = or_unspecified(ctx.profile, University),
        city = or_unspecified(ctx.profile, City),
    );

    if let Some(notes) = ctx.user_notes.filter(|n| !n.trim().is_empty()) {
        out.push_str(&format!("\nCANDIDATE NOTES:\n{}\n", notes.trim()));
    }
    if let Some(resume) = ctx.resume_text.filter(|r| !r.trim().is_empty()) {
        out.push_str(&format!(
            "\nCANDIDATE RESUME:\n{}\n",
            truncate_chars(resume.trim(), MAX_RESUME_CHARS)
        ));
    }
    out
}

fn default_question(intent: QuestionIntent) -> &'static str {
    match intent {
        QuestionIntent::CompanyInterest => "Why do you want to work at this company?",
        QuestionIntent::SelfIntroduction => "Tell us about yourself",
        QuestionIntent::Fit => "What makes you a good fit?",
        QuestionIntent::Strengths => "What are your strengths?",
        QuestionIntent::Weaknesses => "What are your weaknesses?",
        QuestionIntent::CareerGoals => "What are your career goals?",
        QuestionIntent::ChallengeStory => "Describe a challenge you overcame",
        QuestionIntent::AchievementStory => "Describe your greatest achievement",
        QuestionIntent::Miscellaneous => "Is there anything else you would like to share?",
        QuestionIntent::CoverLetter => "Cover letter",
    }
}

/// Category-specific instruction for an open-ended question.
pub fn build_answer_prompt(intent: QuestionIntent, question: &str, ctx: &AnswerContext<'_>) -> String {
    let base = base_context(ctx);
    let role = ctx.page.job_title.as_deref().unwrap_or("this role");
    let company = ctx.page.company.as_deref().unwrap_or("this company");
    let question = if question.trim().is_empty() {
        default_question(intent)
    } else {
        question.trim()
    };

    match intent {
        QuestionIntent::CoverLetter => format!(
            r#"Write the body of a cover letter for this application.
{base}
STRUCTURE:
1. Open with genuine interest in "{role}" at "{company}"
2. Two or three relevant experiences with concrete results
3. Why this company in particular, drawn from the job description
4. Close with availability and enthusiasm

RULES:
- 3 to 4 paragraphs, professional and warm
- No date, address or header block
- Do not mention where the posting was found"#
        ),
        QuestionIntent::CompanyInterest => format!(
            r#"Answer the question: "{question}"
{base}
In 2 to 3 paragraphs:
1. Point to specific things about "{company}" from the posting
2. Tie my background to what they do
3. Stay specific and avoid clichés"#
        ),
        QuestionIntent::SelfIntroduction => format!(
            r#"Answer the question: "{question}"
{base}
In 2 to 3 paragraphs cover:
1. My current role and expertise
2. Two or three achievements with numbers
3. Why this role is the right next step"#
        ),
        QuestionIntent::Fit => format!(
            r#"Answer the question: "{question}"
{base}
In 2 to 3 paragraphs:
1. Take two or three requirements from the job description
2. Show with examples that I meet each one
3. Quantify results where possible"#
        ),
        QuestionIntent::Strengths => format!(
            r#"Answer the question: "{question}"
{base}
In 1 to 2 paragraphs:
1. Two or three strengths that matter for "{role}"
2. A short example for each
3. How I would use them in this job"#
        ),
        QuestionIntent::Weaknesses => format!(
            r#"Answer the question: "{question}"
{base}
In 1 to 2 paragraphs:
1. One honest area for improvement, not a disguised strength
2. What I am doing about it
3. Keep the framing constructive"#
        ),
        QuestionIntent::CareerGoals => format!(
            r#"Answer the question: "{question}"
{base}
In 1 to 2 paragraphs:
1. Realistic professional goals
2. How "{role}" moves me toward them
3. Commitment to growing in the position"#
        ),
        QuestionIntent::ChallengeStory => format!(
            r#"Answer the question: "{question}"
{base}
Tell one specific story in 2 to 3 paragraphs using Situation, Task, Action and Result,
with measurable outcomes where possible."#
        ),
        QuestionIntent::AchievementStory => format!(
            r#"Answer the question: "{question}"
{base}
In 2 to 3 paragraphs:
1. An achievement relevant to "{role}"
2. The context and what made it hard
3. My own contribution
4. The measurable impact"#
        ),
        QuestionIntent::Miscellaneous => format!(
            r#"Answer the question: "{question}"
{base}
In 1 to 2 short paragraphs add something not covered elsewhere in the application:
a relevant interest, a unique perspective, or why this opportunity matters to me.
Do not repeat other answers."#
        ),
    }
}
