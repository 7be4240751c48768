//! Assembling per-page text into one labeled document.

use std::collections::BTreeMap;

use super::types::PageOutcome;

/// Pages that produced text, keyed by their original 1-based index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedDocument {
    sections: BTreeMap<u32, String>,
}

impl AggregatedDocument {
    /// Keep only `Done` pages whose trimmed text is non-empty.
    ///
    /// Blank and skipped pages leave no trace, so gaps show up as jumps in
    /// the page markers.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a PageOutcome>,
    {
        let sections = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                PageOutcome::Done { page, text } => {
                    let trimmed = text.trim();
                    (!trimmed.is_empty()).then(|| (*page, trimmed.to_string()))
                }
                PageOutcome::Skipped { .. } => None,
            })
            .collect();
        Self { sections }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Page indices in ascending order.
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.sections.keys().copied()
    }

    /// Render `=== PAGE <n> ===` sections separated by a blank line.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|(page, text)| format!("=== PAGE {} ===\n{}\n", page, text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(page: u32, text: &str) -> PageOutcome {
        PageOutcome::Done {
            page,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_empty_page_has_no_marker() {
        let outcomes = vec![done(1, "First section"), done(2, ""), done(3, "Second section")];
        let doc = AggregatedDocument::from_outcomes(&outcomes);

        assert_eq!(
            doc.render(),
            "=== PAGE 1 ===\nFirst section\n\n=== PAGE 3 ===\nSecond section\n"
        );
        assert!(!doc.render().contains("PAGE 2"));
    }

    #[test]
    fn test_text_is_trimmed() {
        let doc = AggregatedDocument::from_outcomes(&[done(4, "\n\n  A) Vero  \n\n")]);
        assert_eq!(doc.render(), "=== PAGE 4 ===\nA) Vero\n");
    }

    #[test]
    fn test_skipped_and_whitespace_pages_dropped() {
        let outcomes = vec![
            PageOutcome::Skipped {
                page: 1,
                reason: "pdftoppm failed".into(),
            },
            done(2, " \t\n"),
        ];
        let doc = AggregatedDocument::from_outcomes(&outcomes);
        assert!(doc.is_empty());
        assert_eq!(doc.render(), "");
    }

    #[test]
    fn test_pages_strictly_increasing_regardless_of_input_order() {
        let outcomes = vec![done(5, "e"), done(2, "b"), done(9, "i")];
        let doc = AggregatedDocument::from_outcomes(&outcomes);
        let pages: Vec<u32> = doc.pages().collect();
        assert_eq!(pages, vec![2, 5, 9]);
        assert!(pages.windows(2).all(|w| w[0] < w[1]));
    }
}
