use once_cell::sync::Lazy;
use regex::Regex;

use crate::screen::screen_model::SemanticFieldType;

// ============================================================================
// Pattern dictionary
// ============================================================================
//
// Order is priority: the classifier walks these lists top to bottom and the
// first hit wins. Overlaps are resolved here and nowhere else, e.g. "location"
// is claimed by City before Country and WorkCountries are consulted, and the
// bare "name" fragment of FullName only applies after FirstName/LastName.

pub struct FieldPattern {
    pub field: SemanticFieldType,
    pub fragments: &'static [&'static str],
}

pub struct LabelPattern {
    pub field: SemanticFieldType,
    pub regex: Regex,
}

pub static FIELD_PATTERNS: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    use SemanticFieldType::*;
    vec![
        FieldPattern {
            field: FirstName,
            fragments: &[
                "first_name",
                "firstname",
                "first-name",
                "fname",
                "given_name",
                "givenname",
                "name_first",
                "applicant_first_name",
                "candidate_first_name",
                "legal_first_name",
            ],
        },
        FieldPattern {
            field: LastName,
            fragments: &[
                "last_name",
                "lastname",
                "last-name",
                "lname",
                "surname",
                "family_name",
                "familyname",
                "name_last",
                "applicant_last_name",
                "candidate_last_name",
                "legal_last_name",
            ],
        },
        FieldPattern {
            field: FullName,
            fragments: &[
                "full_name",
                "fullname",
                "full-name",
                "name",
                "your_name",
                "applicant_name",
                "candidate_name",
                "legal_name",
                "display_name",
            ],
        },
        FieldPattern {
            field: Email,
            fragments: &[
                "email",
                "e-mail",
                "email_address",
                "emailaddress",
                "user_email",
                "applicant_email",
                "candidate_email",
                "contact_email",
                "primary_email",
            ],
        },
        FieldPattern {
            field: Phone,
            fragments: &[
                "phone",
                "telephone",
                "tel",
                "phone_number",
                "phonenumber",
                "mobile",
                "cell",
                "cellphone",
                "mobile_phone",
                "contact_phone",
                "primary_phone",
            ],
        },
        FieldPattern {
            field: City,
            fragments: &[
                "city",
                "location",
                "current_location",
                "address_city",
                "hometown",
                "residence",
                "current_city",
            ],
        },
        FieldPattern {
            field: Country,
            fragments: &[
                "country",
                "nation",
                "address_country",
                "country_code",
                "residence_country",
                "countries",
                "work_country",
                "anticipated_country",
                "location_country",
            ],
        },
        FieldPattern {
            field: WorkCountries,
            fragments: &[
                "work_countries",
                "countries_work",
                "anticipated_work",
                "work_location",
                "preferred_location",
                "preferred_country",
                "desired_location",
                "where_work",
                "location_preference",
            ],
        },
        FieldPattern {
            field: Linkedin,
            fragments: &[
                "linkedin",
                "linkedin_url",
                "linkedin_profile",
                "linkedinurl",
                "social_linkedin",
                "linkedin_link",
            ],
        },
        FieldPattern {
            field: Website,
            fragments: &[
                "website",
                "portfolio",
                "personal_website",
                "portfolio_url",
                "website_url",
                "personal_site",
                "blog",
                "homepage",
            ],
        },
        FieldPattern {
            field: Github,
            fragments: &[
                "github",
                "github_url",
                "github_profile",
                "githuburl",
                "social_github",
            ],
        },
        FieldPattern {
            field: Twitter,
            fragments: &["twitter", "twitter_url", "x_url", "social_twitter"],
        },
        FieldPattern {
            field: CurrentCompany,
            fragments: &[
                "current_company",
                "company",
                "employer",
                "current_employer",
                "most_recent_employer",
                "organization",
            ],
        },
        FieldPattern {
            field: CurrentTitle,
            fragments: &[
                "current_title",
                "title",
                "job_title",
                "position",
                "current_position",
                "role",
                "current_role",
                "headline",
            ],
        },
        FieldPattern {
            field: YearsExperience,
            fragments: &[
                "years_experience",
                "experience",
                "years_of_experience",
                "total_experience",
                "work_experience",
            ],
        },
        FieldPattern {
            field: University,
            fragments: &[
                "university",
                "school",
                "college",
                "institution",
                "alma_mater",
                "education_school",
                "school_name",
            ],
        },
        FieldPattern {
            field: Degree,
            fragments: &[
                "degree",
                "qualification",
                "education_degree",
                "degree_type",
                "diploma",
            ],
        },
        FieldPattern {
            field: GradYear,
            fragments: &[
                "graduation_year",
                "grad_year",
                "year_graduated",
                "graduation_date",
                "education_end_year",
            ],
        },
        FieldPattern {
            field: HeardAbout,
            fragments: &[
                "hear_about",
                "heard_about",
                "how_did_you_hear",
                "source",
                "referral_source",
                "how_heard",
                "found_us",
            ],
        },
        FieldPattern {
            field: Salary,
            fragments: &[
                "salary",
                "salary_expectation",
                "expected_salary",
                "compensation",
                "desired_salary",
                "salary_requirements",
            ],
        },
        FieldPattern {
            field: StartDate,
            fragments: &[
                "start_date",
                "availability",
                "available_date",
                "earliest_start",
                "when_can_you_start",
                "notice_period",
            ],
        },
    ]
});

fn label(field: SemanticFieldType, pattern: &str) -> LabelPattern {
    LabelPattern {
        field,
        regex: Regex::new(&format!("(?i){}", pattern)).expect("static label pattern"),
    }
}

pub static LABEL_PATTERNS: Lazy<Vec<LabelPattern>> = Lazy::new(|| {
    use SemanticFieldType::*;
    vec![
        label(FirstName, r"first\s*name|given\s*name|prénom"),
        label(LastName, r"last\s*name|family\s*name|surname|nom\s*de\s*famille"),
        label(FullName, r"full\s*name|^name$|your\s*name|legal\s*name"),
        label(Email, r"e-?mail|correo"),
        label(Phone, r"phone|mobile|cell|tel[eé]fono|número"),
        label(City, r"city|location|cidade|ciudad"),
        label(Country, r"country|país|nation"),
        label(
            WorkCountries,
            r"countries?.*(anticipate|work|prefer)|where.*(work|like.*work)|location.*prefer|preferred.*location",
        ),
        label(Linkedin, r"linkedin"),
        label(Website, r"website|portfolio|personal\s*site"),
        label(Github, r"github"),
        label(Twitter, r"twitter|x\.com"),
        label(CurrentCompany, r"current\s*(company|employer)|empresa"),
        label(CurrentTitle, r"current\s*(title|position|role)|job\s*title|cargo"),
        label(YearsExperience, r"years?\s*(of)?\s*experience|experiência"),
        label(University, r"university|school|college|institution|universidade"),
        label(Degree, r"degree|qualification|diploma"),
        label(GradYear, r"graduat(ion|ed)\s*(year|date)|año"),
        label(HeardAbout, r"how\s*did\s*you\s*(hear|find|learn)|source|como\s*nos"),
        label(Salary, r"salary|compensation|expectat"),
        label(StartDate, r"start\s*date|availab|when\s*can\s*you|notice"),
        label(
            CoverLetter,
            r"cover\s*letter|letter\s*of\s*motivation|motivation\s*letter|why\s*(do\s*)?you\s*want",
        ),
    ]
});
