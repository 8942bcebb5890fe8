use scraper::error::SelectorErrorKind;
use scraper::selector::{Parser, Simple};
use selectors::matching::{
    self, MatchingContext, MatchingForInvalidation, MatchingMode, NeedsSelectorFlags, QuirksMode,
    SelectorCaches,
};
use selectors::parser::{ParseRelative, SelectorList};

use crate::agent::error::FillError;

/// Node handles that CSS selectors can be matched against. Any
/// `selectors::Element` over scraper's selector flavour qualifies, so a
/// `Document` implementation only has to expose its nodes this way.
pub trait Selectable: selectors::Element<Impl = Simple> {}

impl<E: selectors::Element<Impl = Simple>> Selectable for E {}

/// A parsed comma-separated selector group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    list: SelectorList<Simple>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Selector, FillError> {
        let mut input = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut input);

        SelectorList::parse(&Parser, &mut parser, ParseRelative::No)
            .map(|list| Selector {
                source: source.to_string(),
                list,
            })
            .map_err(|err| FillError::InvalidSelector {
                selector: source.to_string(),
                reason: SelectorErrorKind::from(err).to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches<E: Selectable>(&self, element: &E) -> bool {
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut caches,
            QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        self.list
            .slice()
            .iter()
            .any(|s| matching::matches_selector(s, 0, None, element, &mut context))
    }
}
