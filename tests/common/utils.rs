#![allow(dead_code)]

use autofill_engine::{
    browser::{document::NodeId, page::HtmlPage},
    screen::screen_model::SemanticFieldType,
    state::profile::ProfileRecord,
};

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {}: {}", path.display(), e))
}

pub fn page(name: &str) -> HtmlPage {
    HtmlPage::parse(&fixture(name))
}

/// Wrap form markup in a minimal document.
pub fn form_page(body: &str) -> HtmlPage {
    HtmlPage::parse(&format!(
        "<html><head><title>Test</title></head><body><form>{}</form></body></html>",
        body
    ))
}

pub fn node(page: &HtmlPage, selector: &str) -> NodeId {
    page.find(selector)
        .unwrap_or_else(|| panic!("no node matches {}", selector))
}

pub fn ada() -> ProfileRecord {
    ProfileRecord::new()
        .with(SemanticFieldType::FirstName, "Ada")
        .with(SemanticFieldType::LastName, "Lovelace")
        .with(SemanticFieldType::Email, "ada@example.com")
        .with(SemanticFieldType::Phone, "+44 20 7946 0000")
        .with(SemanticFieldType::Country, "United Kingdom")
        .with(SemanticFieldType::CurrentTitle, "Staff Engineer")
}
