//! Shaping checks run against a directory of JSON test files.
//!
//! Every check goes through [`run_shaping_tests`], which walks the test
//! directory, filters tests and turns failures into report messages. The
//! check-specific parts live behind the [`ShapingCheck`] trait.

pub mod collides;
pub mod forbidden;
pub mod regression;
pub mod report;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::brew::{self, Ingredients};
use crate::collide::CollisionSettings;
use crate::error::{Error, Result};
use crate::font::Font;
use crate::shaping::ShapingParameters;

pub use collides::CollidesCheck;
pub use forbidden::ForbiddenCheck;
pub use regression::RegressionCheck;
pub use report::{generate_html, CheckResults, Message, Status};

/// Configuration of `check-shaping`, read from YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Directory holding the `*.json` test files.
    #[serde(default)]
    pub test_directory: Option<PathBuf>,
}

impl CheckConfig {
    /// Load the YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not valid YAML.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let config: CheckConfig = Figment::from(Yaml::file(path)).extract()?;
        debug!(config = ?config, "Loaded check configuration");
        Ok(config)
    }
}

/// How a test's `input` is turned into strings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// The input is the text itself.
    #[default]
    String,
    /// The input is a recipe over the file's ingredients.
    Pattern,
}

/// Defaults applied to every test of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestDefaults {
    /// Default shaping parameters.
    #[serde(flatten)]
    pub parameters: ShapingParameters,
    /// Default input type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
    /// Collisions that are not reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowedcollisions: Option<Vec<String>>,
}

/// The `configuration` block of a test file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// Defaults for every test.
    #[serde(default)]
    pub defaults: TestDefaults,
    /// Glyph name patterns that must never appear in shaping output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_glyphs: Option<Vec<String>>,
    /// Named character sets for pattern inputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingredients: Ingredients,
    /// Collision checking for every test of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collidoscope: Option<CollisionSettings>,
}

/// Expected shaping output, shared or per font file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expectation {
    /// The same expectation for every font.
    Text(String),
    /// Font file name (or `default`) to expectation.
    PerFont(BTreeMap<String, String>),
}

impl Expectation {
    /// The expectation for a font file name.
    #[must_use]
    pub fn for_font(&self, font_name: &str) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::PerFont(map) => map.get(font_name).or_else(|| map.get("default")).map(String::as_str),
        }
    }
}

/// One font file name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single file name.
    One(String),
    /// Several file names.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Whether `name` is listed.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::One(one) => one == name,
            Self::Many(many) => many.iter().any(|m| m == name),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::One(one) => one.is_empty(),
            Self::Many(many) => many.is_empty(),
        }
    }
}

/// One entry of a test file's `tests` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Run only with these fonts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<OneOrMany>,
    /// Text or recipe to shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Expected output for regression tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectation: Option<Expectation>,
    /// Never run with these fonts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    /// Free-form note shown in the report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// How `input` is read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
    /// Collision checking for this test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collidoscope: Option<CollisionSettings>,
    /// Collisions that are not reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowedcollisions: Option<Vec<String>>,
    /// The test's own shaping parameters.
    #[serde(flatten)]
    pub parameters: ShapingParameters,
}

impl TestCase {
    /// Shaping parameters with the file defaults filled in.
    #[must_use]
    pub fn shaping_parameters(&self, configuration: &TestConfiguration) -> ShapingParameters {
        self.parameters
            .or(&configuration.defaults.parameters)
            .without_empty()
    }

    /// Input type, falling back to the file default.
    #[must_use]
    pub fn input_type(&self, configuration: &TestConfiguration) -> InputType {
        self.input_type
            .or(configuration.defaults.input_type)
            .unwrap_or_default()
    }

    /// Allowed `glyph1/glyph2` collisions, falling back to the file default.
    #[must_use]
    pub fn allowed_collisions<'a>(&'a self, configuration: &'a TestConfiguration) -> &'a [String] {
        self.allowedcollisions
            .as_deref()
            .or(configuration.defaults.allowedcollisions.as_deref())
            .unwrap_or_default()
    }

    /// Strings to shape: the input itself, or every string its recipe makes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pattern`] for a bad recipe.
    pub fn input_strings(&self, configuration: &TestConfiguration) -> Result<Vec<String>> {
        let input = self.input.clone().unwrap_or_default();
        match self.input_type(configuration) {
            InputType::String => Ok(vec![input]),
            InputType::Pattern => brew::generate_all(&input, &configuration.ingredients),
        }
    }

    /// Whether the test runs for the font file `font_name`.
    #[must_use]
    pub fn runs_on(&self, font_name: &str) -> bool {
        if self.exclude.iter().any(|e| e == font_name) {
            return false;
        }
        match &self.only {
            Some(only) if !only.is_empty() => only.matches(font_name),
            _ => true,
        }
    }
}

/// A JSON test file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestFile {
    /// Settings shared by all tests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<TestConfiguration>,
    /// The tests. Required; kept optional so its absence can be reported.
    #[serde(default)]
    pub tests: Option<Vec<TestCase>>,
}

/// A check that can be run over test files.
pub trait ShapingCheck {
    /// State prepared once per test file.
    type State;
    /// Data recorded for each failure.
    type Failure;

    /// Whether `test` is one this check looks at.
    fn applies(&self, test: &TestCase, configuration: &TestConfiguration) -> bool;

    /// Prepare per-file state. An `Err` message is reported as a failure and
    /// the file is skipped.
    fn prepare(
        &self,
        file: &Path,
        configuration: &TestConfiguration,
    ) -> std::result::Result<Self::State, Message>;

    /// Run one test, appending its failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the test cannot be run, e.g. for an invalid
    /// shaping parameter or recipe.
    fn run_test(
        &self,
        font: &Font,
        state: &Self::State,
        test: &TestCase,
        configuration: &TestConfiguration,
        failures: &mut Vec<Self::Failure>,
    ) -> Result<()>;

    /// Turn the failures of one file into a message.
    ///
    /// # Errors
    ///
    /// Returns an error if a report item cannot be drawn.
    fn report(
        &self,
        font: &Font,
        file: &Path,
        configuration: &TestConfiguration,
        failures: Vec<Self::Failure>,
    ) -> Result<Message>;
}

fn test_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run `check` over every test file of the configured directory.
///
/// Problems with the test files themselves are reported as failure
/// messages; only I/O errors on the directory and report drawing errors are
/// returned as errors.
///
/// # Errors
///
/// Returns an error if the test directory cannot be listed or a test file
/// cannot be read.
pub fn run_shaping_tests<C: ShapingCheck>(
    config: &CheckConfig,
    font: &Font,
    check: &C,
) -> Result<CheckResults> {
    let mut results = Vec::new();

    let Some(dir) = config.test_directory.as_deref() else {
        results.push((
            Status::Fail,
            Message::new(
                "no-dir",
                "Shaping test directory not defined in configuration file",
            ),
        ));
        return Ok(results);
    };
    if !dir.is_dir() {
        results.push((
            Status::Fail,
            Message::new(
                "not-dir",
                format!(
                    "Shaping test directory {} not found or not a directory.",
                    dir.display()
                ),
            ),
        ));
        return Ok(results);
    }

    let files = test_files(dir)?;
    let mut ran_any_test = false;
    for file in &files {
        let shown = file.display();
        let bytes = std::fs::read(file)?;
        let parsed = String::from_utf8(bytes)
            .map_err(|err| err.to_string())
            .and_then(|text| {
                serde_json::from_str::<TestFile>(&text).map_err(|err| err.to_string())
            });
        let test_file = match parsed {
            Ok(test_file) => test_file,
            Err(err) => {
                results.push((
                    Status::Fail,
                    Message::new("shaping-invalid-json", format!("{shown}: Invalid JSON: {err}.")),
                ));
                return Ok(results);
            }
        };
        let configuration = test_file.configuration.unwrap_or_default();
        let Some(tests) = test_file.tests else {
            results.push((
                Status::Fail,
                Message::new(
                    "shaping-missing-tests",
                    format!("{shown}: JSON file must have a 'tests' key."),
                ),
            ));
            return Ok(results);
        };

        let state = match check.prepare(file, &configuration) {
            Ok(state) => state,
            Err(message) => {
                results.push((Status::Fail, message));
                continue;
            }
        };

        let mut failures = Vec::new();
        // Decides the pass message of this file; `ran_any_test` decides the
        // final skip across all files.
        let mut ran_a_test = false;
        for test in &tests {
            if !check.applies(test, &configuration) {
                continue;
            }
            if test.input.is_none() {
                results.push((
                    Status::Fail,
                    Message::new(
                        "shaping-missing-input",
                        format!("{shown}: test is missing an input key."),
                    ),
                ));
                return Ok(results);
            }
            if !test.runs_on(font.file_name()) {
                continue;
            }

            if let Err(err) = check.run_test(font, &state, test, &configuration, &mut failures) {
                warn!(file = %shown, error = %err, "Test could not be run");
                results.push((
                    Status::Fail,
                    Message::new(
                        "shaping-invalid-test",
                        format!(
                            "{shown}: {}: {err}",
                            test.input.as_deref().unwrap_or_default()
                        ),
                    ),
                ));
                continue;
            }
            ran_a_test = true;
        }

        if ran_a_test {
            ran_any_test = true;
            if failures.is_empty() {
                results.push((
                    Status::Pass,
                    Message::new("pass", format!("{shown}: No regression detected")),
                ));
            } else {
                debug!(file = %shown, failures = failures.len(), "Check failed");
                results.push((Status::Fail, check.report(font, file, &configuration, failures)?));
            }
        }
    }

    if files.is_empty() {
        results.push((Status::Skip, Message::new("skip", "No test files found.")));
    }
    if !ran_any_test {
        results.push((Status::Skip, Message::new("skip", "No applicable tests ran.")));
    }
    Ok(results)
}

/// Titles of the checks, in report order.
pub const CHECK_TITLES: [&str; 3] = [
    "Check that texts shape as per expectation",
    "Check that no forbidden glyphs are found while shaping",
    "Check that no collisions are found while shaping",
];

/// Run the regression, forbidden glyph and collision checks.
///
/// # Errors
///
/// Returns an error if a check cannot read the test directory or draw its
/// report.
pub fn run_checks(config: &CheckConfig, font: &Font) -> Result<Vec<(&'static str, CheckResults)>> {
    let [regression, forbidden, collides] = CHECK_TITLES;
    info!(font = %font.path().display(), "Running shaping checks");
    Ok(vec![
        (regression, run_shaping_tests(config, font, &RegressionCheck)?),
        (forbidden, run_shaping_tests(config, font, &ForbiddenCheck)?),
        (collides, run_shaping_tests(config, font, &CollidesCheck)?),
    ])
}


#[cfg(test)]
mod tests {
    use super::test_support::test_dir;
    use super::*;
    use crate::testing::{scratch_dir, test_font};

    fn config_for(dir: &Path) -> CheckConfig {
        CheckConfig {
            test_directory: Some(dir.to_path_buf()),
        }
    }

    fn codes(results: &CheckResults) -> Vec<(Status, &str)> {
        results
            .iter()
            .map(|(status, message)| (*status, message.code.as_str()))
            .collect()
    }

    #[test]
    fn test_load_check_config() {
        let dir = scratch_dir("check-config");
        let path = dir.join("shaping.yaml");
        std::fs::write(&path, "test_directory: qa/shaping_tests\nother: 1\n").unwrap();

        let config = CheckConfig::load(&path).unwrap();
        assert_eq!(config.test_directory, Some(PathBuf::from("qa/shaping_tests")));

        let err = CheckConfig::load(&dir.join("missing.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_expectation_for_font() {
        let text = Expectation::Text("A|B".to_string());
        assert_eq!(text.for_font("Any.ttf"), Some("A|B"));

        let mut map = BTreeMap::new();
        map.insert("default".to_string(), "A".to_string());
        map.insert("Bold.ttf".to_string(), "B".to_string());
        let per_font = Expectation::PerFont(map);
        assert_eq!(per_font.for_font("Bold.ttf"), Some("B"));
        assert_eq!(per_font.for_font("Regular.ttf"), Some("A"));
    }

    #[test]
    fn test_only_and_exclude() {
        let mut test = TestCase {
            only: Some(OneOrMany::One("Test-Regular.ttf".to_string())),
            ..TestCase::default()
        };
        assert!(test.runs_on("Test-Regular.ttf"));
        assert!(!test.runs_on("Test-Regular.ttf.bak"));
        assert!(!test.runs_on("Test-Bold.ttf"));

        test.only = Some(OneOrMany::Many(vec!["A.ttf".to_string(), "B.ttf".to_string()]));
        assert!(test.runs_on("B.ttf"));
        assert!(!test.runs_on("C.ttf"));

        test.only = None;
        test.exclude = vec!["C.ttf".to_string()];
        assert!(!test.runs_on("C.ttf"));
        assert!(test.runs_on("D.ttf"));
    }

    #[test]
    fn test_defaults_lookup() {
        let json = r#"{
            "configuration": {
                "defaults": {"script": "latn", "input_type": "pattern", "allowedcollisions": ["A/B"]},
                "ingredients": {"X": "A B"}
            },
            "tests": [
                {"input": "X X", "direction": "rtl"},
                {"input": "AB", "script": "arab", "input_type": "string", "allowedcollisions": []}
            ]
        }"#;
        let file: TestFile = serde_json::from_str(json).unwrap();
        let configuration = file.configuration.unwrap();
        let tests = file.tests.unwrap();

        let params = tests[0].shaping_parameters(&configuration);
        assert_eq!(params.script.as_deref(), Some("latn"));
        assert_eq!(tests[0].input_type(&configuration), InputType::Pattern);
        assert_eq!(tests[0].allowed_collisions(&configuration), ["A/B".to_string()]);
        assert_eq!(
            tests[0].input_strings(&configuration).unwrap(),
            vec!["AA", "AB", "BA", "BB"]
        );

        let params = tests[1].shaping_parameters(&configuration);
        assert_eq!(params.script.as_deref(), Some("arab"));
        assert_eq!(tests[1].input_type(&configuration), InputType::String);
        assert!(tests[1].allowed_collisions(&configuration).is_empty());
        assert_eq!(tests[1].input_strings(&configuration).unwrap(), vec!["AB"]);
    }

    #[test]
    fn test_no_directory() {
        let font = test_font();
        let results = run_shaping_tests(&CheckConfig::default(), &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Fail, "no-dir")]);
        assert_eq!(
            results[0].1.header,
            "Shaping test directory not defined in configuration file"
        );

        let config = config_for(Path::new("/nonexistent/shaping"));
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Fail, "not-dir")]);
    }

    #[test]
    fn test_empty_directory_skips() {
        let font = test_font();
        let dir = test_dir("runner-empty", &[("notes.txt", "hello")]);
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Skip, "skip"), (Status::Skip, "skip")]);
        assert_eq!(results[0].1.header, "No test files found.");
        assert_eq!(results[1].1.header, "No applicable tests ran.");
    }

    #[test]
    fn test_invalid_json_stops() {
        let font = test_font();
        let dir = test_dir(
            "runner-invalid",
            &[("a.json", "{not json"), ("b.json", r#"{"tests": []}"#)],
        );
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Fail, "shaping-invalid-json")]);
        assert!(results[0].1.header.contains("a.json: Invalid JSON:"));
    }

    #[test]
    fn test_invalid_utf8_is_invalid_json() {
        let font = test_font();
        let dir = test_dir("runner-utf8", &[("b.json", r#"{"tests": []}"#)]);
        std::fs::write(dir.join("a.json"), b"\xff\xfe{}").unwrap();
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Fail, "shaping-invalid-json")]);
        assert!(results[0].1.header.contains("a.json: Invalid JSON:"));
    }

    #[test]
    fn test_missing_tests_and_input() {
        let font = test_font();
        let dir = test_dir("runner-missing-tests", &[("a.json", "{}")]);
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Fail, "shaping-missing-tests")]);

        let dir = test_dir(
            "runner-missing-input",
            &[("a.json", r#"{"tests": [{"expectation": "A"}]}"#)],
        );
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Fail, "shaping-missing-input")]);
    }

    #[test]
    fn test_files_run_in_name_order() {
        let font = test_font();
        let dir = test_dir(
            "runner-order",
            &[
                ("b.json", r#"{"tests": [{"input": "B", "expectation": "B"}]}"#),
                ("a.json", r#"{"tests": [{"input": "A", "expectation": "A"}]}"#),
                ("c.json", r#"{"tests": [{"input": "A"}]}"#),
            ],
        );
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Pass, "pass"), (Status::Pass, "pass")]);
        assert!(results[0].1.header.ends_with("a.json: No regression detected"));
        assert!(results[1].1.header.ends_with("b.json: No regression detected"));
    }

    #[test]
    fn test_font_filters_skip_tests() {
        let font = test_font();
        let dir = test_dir(
            "runner-only",
            &[(
                "a.json",
                r#"{"tests": [
                    {"input": "A", "expectation": "B", "only": "Other.ttf"},
                    {"input": "A", "expectation": "B", "exclude": ["Test-Regular.ttf"]}
                ]}"#,
            )],
        );
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(codes(&results), vec![(Status::Skip, "skip")]);
        assert_eq!(results[0].1.header, "No applicable tests ran.");
    }

    #[test]
    fn test_invalid_test_is_reported() {
        let font = test_font();
        let dir = test_dir(
            "runner-bad-test",
            &[(
                "a.json",
                r#"{"tests": [
                    {"input": "A", "expectation": "A", "script": "toolong"},
                    {"input": "A", "expectation": "A"}
                ]}"#,
            )],
        );
        let config = config_for(&dir);
        let results = run_shaping_tests(&config, &font, &RegressionCheck).unwrap();
        assert_eq!(
            codes(&results),
            vec![(Status::Fail, "shaping-invalid-test"), (Status::Pass, "pass")]
        );
    }

    #[test]
    fn test_run_checks_titles() {
        let font = test_font();
        let dir = test_dir(
            "run-checks",
            &[("a.json", r#"{"tests": [{"input": "AB", "expectation": "A|B"}]}"#)],
        );
        let config = config_for(&dir);
        let results = run_checks(&config, &font).unwrap();
        let titles: Vec<&str> = results.iter().map(|(title, _)| *title).collect();
        assert_eq!(titles, CHECK_TITLES);
        assert_eq!(codes(&results[0].1), vec![(Status::Pass, "pass")]);
        assert_eq!(codes(&results[1].1), vec![(Status::Skip, "skip")]);
        assert_eq!(codes(&results[2].1), vec![(Status::Skip, "skip")]);
    }
}
