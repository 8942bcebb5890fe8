use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::browser::document::Document;
use crate::browser::selector::Selector;
use crate::state::normalize::truncate_chars;

const JOB_TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".job-title",
    ".posting-headline h2",
    "[data-qa=\"job-title\"]",
    ".job-header h1",
    ".position-title",
    ".job-name",
];

const COMPANY_SELECTORS: &[&str] = &[
    ".company-name",
    "[data-qa=\"company-name\"]",
    ".employer-name",
    ".posting-categories .company",
    ".job-company",
    "[data-company]",
    ".company",
    ".employer",
    "[itemprop=\"hiringOrganization\"]",
    ".job-header .company",
    ".posting-headline .company",
];

const JOB_DESCRIPTION_SELECTORS: &[&str] = &[
    ".job-description",
    "[data-qa=\"job-description\"]",
    ".posting-body",
    ".description",
    "#job-description",
    ".job-details",
    ".content-wrapper",
];

/// Names that identify a job board or hiring platform, never the employer.
pub const JOB_BOARDS: &[&str] = &[
    "linkedin",
    "indeed",
    "glassdoor",
    "ziprecruiter",
    "monster",
    "jobboard",
    "jobs",
    "careers",
    "greenhouse",
    "lever",
    "workday",
];

const JOB_BOARD_HOSTS: &[&str] = &[
    "greenhouse",
    "lever",
    "workday",
    "taleo",
    "icims",
    "smartrecruiters",
    "jobvite",
    "ashbyhq",
    "recruitee",
    "jobs",
    "careers",
    "linkedin",
    "indeed",
    "glassdoor",
    "www",
];

static TITLE_COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\bat|@|\|)\s*([A-Z][A-Za-z0-9\s&.]+?)(?:\s*[-|]|$)").expect("static regex")
});
static BODY_COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i:about|join|work at|careers at)\s+([A-Z][A-Za-z0-9&.]*(?:\s[A-Z][A-Za-z0-9&.]*){0,3})")
        .expect("static regex")
});
static ABOUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:about\s+(?:us|the\s+company)|who\s+we\s+are|our\s+mission)[:\s]*([^.]*\.)")
        .expect("static regex")
});
static REQUIREMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(?:requirements?|qualifications?)[:\s]*(.*?)(?:\bresponsibilities\b|\bbenefits\b|$)")
        .expect("static regex")
});

/// Facts about the posting the page belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageContext {
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub job_description: Option<String>,
    /// Headings plus about/requirements snippets, one per line.
    pub summary: String,
}

impl PageContext {
    pub fn extract(doc: &dyn Document, url: Option<&str>) -> Self {
        PageContext {
            job_title: extract_job_title(doc),
            company: extract_company(doc, url),
            job_description: extract_job_description(doc),
            summary: extract_summary(doc),
        }
    }
}

fn first_text(doc: &dyn Document, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.query_first(&selector).map(|node| doc.text(node))
}

fn body_text(doc: &dyn Document) -> String {
    first_text(doc, "body").unwrap_or_default()
}

pub fn is_job_board(name: &str) -> bool {
    let lower = name.to_lowercase();
    JOB_BOARDS.iter().any(|board| lower.contains(board))
}

pub fn extract_job_title(doc: &dyn Document) -> Option<String> {
    for selector in JOB_TITLE_SELECTORS {
        if let Some(text) = first_text(doc, selector) {
            if !text.is_empty() && text.chars().count() < 100 {
                return Some(text);
            }
        }
    }

    let title = doc.title();
    let head = title.split('|').next().unwrap_or("").trim();
    (!head.is_empty()).then(|| head.to_string())
}

pub fn extract_company(doc: &dyn Document, url: Option<&str>) -> Option<String> {
    for selector in COMPANY_SELECTORS {
        if let Some(text) = first_text(doc, selector) {
            if !text.is_empty() && text.chars().count() < 60 {
                return Some(text);
            }
        }
    }

    let title = doc.title();
    if let Some(name) = TITLE_COMPANY
        .captures(&title)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
    {
        if !name.is_empty() && name.chars().count() < 40 && !is_job_board(&name) {
            return Some(name);
        }
    }

    let body = body_text(doc);
    if let Some(name) = BODY_COMPANY
        .captures(&body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
    {
        if name.chars().count() > 2 && name.chars().count() < 40 && !is_job_board(&name) {
            return Some(name);
        }
    }

    if let Some(site) = Selector::parse("meta[property=\"og:site_name\"]")
        .ok()
        .and_then(|sel| doc.query_first(&sel))
        .and_then(|meta| doc.attr(meta, "content"))
    {
        let site = site.trim().to_string();
        if !site.is_empty() && site.chars().count() < 40 && !is_job_board(&site) {
            return Some(site);
        }
    }

    url.and_then(company_from_host)
}

/// `https://jobs.acme.io/...` → `Acme`, unless the host is a hiring platform.
fn company_from_host(url: &str) -> Option<String> {
    let rest = url.split_once("://").map_or(url, |(_, r)| r);
    let host = rest.split(['/', ':', '?', '#']).next()?.to_lowercase();
    let mut labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    if matches!(labels.first(), Some(&"jobs") | Some(&"careers") | Some(&"www")) {
        labels.remove(0);
    }
    let name = labels.first()?;
    if name.is_empty() || JOB_BOARD_HOSTS.contains(name) || labels.len() < 2 {
        return None;
    }
    let mut chars = name.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

pub fn extract_job_description(doc: &dyn Document) -> Option<String> {
    JOB_DESCRIPTION_SELECTORS
        .iter()
        .filter_map(|selector| first_text(doc, selector))
        .find(|text| !text.is_empty())
}

pub fn extract_summary(doc: &dyn Document) -> String {
    let mut lines = Vec::new();

    if let Ok(selector) = Selector::parse("h1, h2, h3") {
        let headings: Vec<String> = doc
            .query_all(&selector)
            .into_iter()
            .map(|h| doc.text(h))
            .filter(|t| {
                let len = t.chars().count();
                len > 5 && len < 100
            })
            .take(5)
            .collect();
        if !headings.is_empty() {
            lines.push(format!("Page headings: {}", headings.join(" | ")));
        }
    }

    let body = body_text(doc);
    if let Some(about) = ABOUT.captures(&body).and_then(|c| c.get(1)) {
        lines.push(format!("About: {}", truncate_chars(about.as_str().trim(), 200)));
    }
    if let Some(reqs) = REQUIREMENTS.captures(&body).and_then(|c| c.get(1)) {
        let reqs = reqs.as_str().trim();
        if !reqs.is_empty() {
            lines.push(format!("Key Requirements: {}", truncate_chars(reqs, 300)));
        }
    }

    if lines.is_empty() {
        "No additional page context extracted.".to_string()
    } else {
        lines.join("\n")
    }
}
