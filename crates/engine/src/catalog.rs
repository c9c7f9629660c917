//! Test catalog
//!
//! An ordered collection of validated test definitions. Build one with
//! [`Catalog::from_list`], [`Catalog::new`] or through
//! [`crate::loader::CatalogLoader`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::error::{CatalogError, CatalogResult, InputError};
use crate::input::{self, RawInput, SharedInput};
use crate::plugin::TestVariant;

/// A test variant paired with inputs validated against its schema
#[derive(Clone)]
pub struct TestDefinition {
    test: Arc<dyn TestVariant>,
    inputs: SharedInput,
}

impl TestDefinition {
    /// Bind `inputs` to `test`'s schema
    pub fn new(test: Arc<dyn TestVariant>, inputs: impl Into<RawInput>) -> Result<Self, InputError> {
        let inputs = input::bind(test.as_ref(), inputs.into())?;
        Ok(Self { test, inputs })
    }

    pub fn test(&self) -> &Arc<dyn TestVariant> {
        &self.test
    }

    pub fn inputs(&self) -> &SharedInput {
        &self.inputs
    }

    pub fn name(&self) -> &'static str {
        self.test.name()
    }

    /// Tags declared in the definition's filters
    pub fn tags(&self) -> Option<&BTreeSet<String>> {
        self.inputs.tags()
    }

    /// Whether the definition matches a tag filter. Definitions without
    /// declared tags never match.
    pub fn matches_tags(&self, tags: &[String], strict: bool) -> bool {
        let declared = match self.tags() {
            Some(declared) if !declared.is_empty() => declared,
            _ => return false,
        };
        if strict {
            tags.iter().all(|tag| declared.contains(tag))
        } else {
            tags.iter().any(|tag| declared.contains(tag))
        }
    }
}

impl PartialEq for TestDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.test.name() == other.test.name()
            && self.test.input_type() == other.test.input_type()
            && self.inputs.dyn_eq(other.inputs.as_ref())
    }
}

impl std::fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestDefinition")
            .field("test", &self.test.name())
            .field("inputs", &self.inputs)
            .finish()
    }
}

/// An ordered catalog of test definitions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    tests: Vec<TestDefinition>,
    filename: Option<PathBuf>,
}

impl Catalog {
    pub fn new(tests: Vec<TestDefinition>, filename: Option<PathBuf>) -> Self {
        Self { tests, filename }
    }

    /// Build a catalog from (variant, input) pairs. The first invalid pair
    /// aborts construction.
    pub fn from_list<I>(data: I) -> CatalogResult<Self>
    where
        I: IntoIterator<Item = (Arc<dyn TestVariant>, RawInput)>,
    {
        let mut tests = Vec::new();
        for (index, (test, raw)) in data.into_iter().enumerate() {
            let name = test.name();
            let definition = TestDefinition::new(test, raw).map_err(|source| {
                let err = CatalogError::InvalidListEntry {
                    index,
                    test: name.to_string(),
                    source,
                };
                error!("Test catalog is invalid! {}", err);
                err
            })?;
            tests.push(definition);
        }
        info!("Loaded {} test definition(s) from list", tests.len());
        Ok(Self::new(tests, None))
    }

    /// Source file the catalog was loaded from
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    /// Replace all definitions at once
    pub fn set_tests(&mut self, tests: Vec<TestDefinition>) {
        self.tests = tests;
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestDefinition> {
        self.tests.iter()
    }

    /// Definitions whose declared tags match `tags`.
    ///
    /// With `strict`, every requested tag must be declared; otherwise one
    /// shared tag is enough.
    pub fn filter_by_tags(&self, tags: &[String], strict: bool) -> Vec<TestDefinition> {
        self.tests
            .iter()
            .filter(|t| t.matches_tags(tags, strict))
            .cloned()
            .collect()
    }

    /// Names of the distinct tests in the catalog, in first-seen order
    pub fn test_names(&self) -> Vec<&'static str> {
        let mut seen = BTreeSet::new();
        self.tests
            .iter()
            .map(TestDefinition::name)
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a TestDefinition;
    type IntoIter = std::slice::Iter<'a, TestDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.tests.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnitError;
    use crate::input::{InputFilters, TestInput, ValidatedInput};
    use crate::plugin::{CollectedCommand, CommandSpec, Test, Verdict};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use test_case::test_case;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct CountInput {
        #[serde(default)]
        number: u32,
    }

    impl TestInput for CountInput {}

    struct Count;

    #[async_trait::async_trait]
    impl Test for Count {
        type Input = CountInput;
        const NAME: &'static str = "Count";
        const DESCRIPTION: &'static str = "count things";
        const CATEGORIES: &'static [&'static str] = &["system"];

        fn commands(&self) -> Vec<CommandSpec> {
            Vec::new()
        }

        async fn evaluate(&self, _: &CountInput, _: &[CollectedCommand]) -> Result<Verdict, UnitError> {
            Ok(Verdict::success())
        }
    }

    fn tagged(tags: &[&str]) -> TestDefinition {
        let input = ValidatedInput::new(CountInput::default()).with_tags(tags.iter().copied());
        TestDefinition::new(Arc::new(Count), input).unwrap()
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test_case(&["dc1"], false, true; "single shared tag")]
    #[test_case(&["dc1", "dc3"], false, true; "one of two shared")]
    #[test_case(&["dc1", "dc3"], true, false; "strict requires all requested")]
    #[test_case(&["dc1", "dc2"], true, true; "strict all declared")]
    #[test_case(&["dc3"], false, false; "no shared tag")]
    fn test_definition_tag_match(requested: &[&str], strict: bool, expected: bool) {
        let definition = tagged(&["dc1", "dc2"]);
        assert_eq!(definition.matches_tags(&tags(requested), strict), expected);
    }

    #[test]
    fn test_untagged_definitions_never_match() {
        let untagged = TestDefinition::new(Arc::new(Count), RawInput::defaults()).unwrap();
        let empty = TestDefinition::new(
            Arc::new(Count),
            ValidatedInput {
                filters: Some(InputFilters { tags: Some(BTreeSet::new()) }),
                result_overwrite: None,
                params: CountInput::default(),
            },
        )
        .unwrap();

        assert!(!untagged.matches_tags(&tags(&["dc1"]), false));
        assert!(!empty.matches_tags(&tags(&["dc1"]), false));
        assert!(!untagged.matches_tags(&[], true));
    }

    #[test]
    fn test_filter_by_tags_preserves_order() {
        let catalog = Catalog::new(
            vec![tagged(&["dc1"]), tagged(&["dc2"]), tagged(&["dc1", "leaf"])],
            None,
        );

        let matched = catalog.filter_by_tags(&tags(&["dc1"]), false);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0], catalog.tests()[0]);
        assert_eq!(matched[1], catalog.tests()[2]);

        let strict = catalog.filter_by_tags(&tags(&["dc1", "leaf"]), true);
        assert_eq!(strict, vec![catalog.tests()[2].clone()]);
    }

    #[test]
    fn test_from_list_is_atomic() {
        let count: Arc<dyn TestVariant> = Arc::new(Count);
        let data = vec![
            (count.clone(), RawInput::defaults()),
            (count.clone(), json!({"number": 3}).into()),
            (count.clone(), json!({"number": "three"}).into()),
        ];

        let err = Catalog::from_list(data).unwrap_err();
        match err {
            CatalogError::InvalidListEntry { index, ref test, .. } => {
                assert_eq!(index, 2);
                assert_eq!(test, "Count");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_list_keeps_duplicates_in_order() {
        let count: Arc<dyn TestVariant> = Arc::new(Count);
        let catalog = Catalog::from_list(vec![
            (count.clone(), json!({"number": 1}).into()),
            (count.clone(), json!({"number": 1}).into()),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tests()[0], catalog.tests()[1]);
        assert_eq!(catalog.test_names(), vec!["Count"]);
        assert!(catalog.filename().is_none());
    }

    #[test]
    fn test_set_tests_replaces_everything() {
        let mut catalog = Catalog::new(vec![tagged(&["dc1"])], Some(PathBuf::from("catalog.yml")));
        catalog.set_tests(vec![tagged(&["dc2"]), tagged(&["dc3"])]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.filename(), Some(Path::new("catalog.yml")));
        assert!(catalog.filter_by_tags(&tags(&["dc1"]), false).is_empty());
    }
}
