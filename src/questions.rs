use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::prompt::Prompt;

/// Declared input type of a question. Every raw input is parsed into the
/// matching [`AnswerValue`] variant exactly once, at the reconciliation
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Str,
    Bool,
    Path,
    Choice,
}

/// A single question in a questionnaire.
#[derive(Debug, Clone)]
pub struct QuestionSpec {
    pub name: String,
    pub help: String,
    pub kind: QuestionKind,
    /// Allowed values for `QuestionKind::Choice`.
    pub choices: Vec<String>,
    pub default: Option<AnswerValue>,
    /// Secret answers are routed to the credential vault, never remembered
    /// in the registry.
    pub secret: bool,
    /// Visibility predicate evaluated against previously resolved answers,
    /// e.g. `vcs_auth_type == 'token'`.
    pub when: Option<String>,
}

impl QuestionSpec {
    pub fn new(name: impl Into<String>, kind: QuestionKind) -> Self {
        Self {
            name: name.into(),
            help: String::new(),
            kind,
            choices: Vec::new(),
            default: None,
            secret: false,
            when: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, value: AnswerValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn when(mut self, predicate: impl Into<String>) -> Self {
        self.when = Some(predicate.into());
        self
    }
}

/// A resolved answer, tagged with the declared question type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Str(String),
    Bool(bool),
    Path(PathBuf),
    /// A validated selection from a choice question.
    Choice(String),
}

impl AnswerValue {
    /// Parse a raw input against the declared type and choices.
    ///
    /// Returns an explicit parse result instead of discarding bad input.
    pub fn parse(raw: &str, kind: QuestionKind, choices: &[String]) -> ParsedAnswer {
        match kind {
            QuestionKind::Str => ParsedAnswer::Valid(AnswerValue::Str(raw.to_string())),
            QuestionKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => ParsedAnswer::Valid(AnswerValue::Bool(true)),
                "false" | "no" | "n" | "0" => ParsedAnswer::Valid(AnswerValue::Bool(false)),
                other => ParsedAnswer::Invalid(format!("'{other}' is not a boolean")),
            },
            QuestionKind::Path => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    ParsedAnswer::Invalid("path must not be empty".to_string())
                } else {
                    let expanded = shellexpand::tilde(trimmed);
                    ParsedAnswer::Valid(AnswerValue::Path(PathBuf::from(expanded.as_ref())))
                }
            }
            QuestionKind::Choice => {
                if choices.iter().any(|c| c == raw) {
                    ParsedAnswer::Valid(AnswerValue::Choice(raw.to_string()))
                } else {
                    ParsedAnswer::Invalid(format!(
                        "'{raw}' is not one of: {}",
                        choices.join(", ")
                    ))
                }
            }
        }
    }

    /// Truthiness used by bare-name `when` predicates.
    pub fn is_truthy(&self) -> bool {
        match self {
            AnswerValue::Bool(value) => *value,
            AnswerValue::Str(value) | AnswerValue::Choice(value) => !value.is_empty(),
            AnswerValue::Path(value) => !value.as_os_str().is_empty(),
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerValue::Str(value) | AnswerValue::Choice(value) => write!(f, "{value}"),
            AnswerValue::Bool(value) => write!(f, "{value}"),
            AnswerValue::Path(value) => write!(f, "{}", value.display()),
        }
    }
}

/// Explicit parse outcome for a raw answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAnswer {
    Valid(AnswerValue),
    Invalid(String),
}

impl ParsedAnswer {
    fn into_result(self, name: &str) -> Result<AnswerValue> {
        match self {
            ParsedAnswer::Valid(value) => Ok(value),
            ParsedAnswer::Invalid(reason) => Err(Error::validation(name, reason)),
        }
    }
}

/// Output of reconciliation: every resolved answer plus the bookkeeping
/// needed to derive the durable subset.
#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    answers: BTreeMap<String, AnswerValue>,
    hidden: BTreeSet<String>,
    secret: BTreeSet<String>,
}

impl Reconciled {
    /// All resolved answers, including hidden and secret ones.
    pub fn answers(&self) -> &BTreeMap<String, AnswerValue> {
        &self.answers
    }

    pub fn get(&self, name: &str) -> Option<&AnswerValue> {
        self.answers.get(name)
    }

    /// Answers that may be persisted to the registry: everything except
    /// hidden and secret-marked entries.
    pub fn answers_to_remember(&self) -> BTreeMap<String, AnswerValue> {
        self.answers
            .iter()
            .filter(|(name, _)| !self.hidden.contains(*name) && !self.secret.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Secret answers that must be routed to the credential vault.
    pub fn secrets(&self) -> BTreeMap<String, AnswerValue> {
        self.answers
            .iter()
            .filter(|(name, _)| self.secret.contains(*name) && !self.hidden.contains(*name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }
}

/// Resolve a questionnaire in a single forward pass.
///
/// For each question, in declared order:
/// 1. evaluate its `when` predicate against already-resolved answers;
///    hidden questions keep their default for context only
/// 2. take an explicitly provided value if present (fail fast on invalid)
/// 3. else take the default when `use_defaults` is set (fail if none)
/// 4. else delegate to the interactive prompt
pub fn reconcile(
    questions: &[QuestionSpec],
    provided: &BTreeMap<String, String>,
    use_defaults: bool,
    prompt: &dyn Prompt,
) -> Result<Reconciled> {
    let mut out = Reconciled::default();

    for question in questions {
        let visible = match &question.when {
            Some(predicate) => eval_when(predicate, &out.answers)?,
            None => true,
        };

        if question.secret {
            out.secret.insert(question.name.clone());
        }

        if !visible {
            out.hidden.insert(question.name.clone());
            // Retain the default so later predicates can still reference it.
            if let Some(default) = &question.default {
                out.answers.insert(question.name.clone(), default.clone());
            }
            continue;
        }

        let value = if let Some(raw) = provided.get(&question.name) {
            AnswerValue::parse(raw, question.kind, &question.choices)
                .into_result(&question.name)?
        } else if use_defaults {
            question.default.clone().ok_or_else(|| {
                Error::validation(&question.name, "required and has no default")
            })?
        } else {
            let raw = prompt.ask(question)?;
            AnswerValue::parse(&raw, question.kind, &question.choices)
                .into_result(&question.name)?
        };

        out.answers.insert(question.name.clone(), value);
    }

    Ok(out)
}

/// Evaluate a visibility predicate against resolved answers.
///
/// Supported forms: `name == 'literal'`, `name != 'literal'`, `name`,
/// `!name`. Unresolved names evaluate as absent (falsy).
fn eval_when(expr: &str, context: &BTreeMap<String, AnswerValue>) -> Result<bool> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(Error::validation("when", "empty predicate"));
    }

    if let Some((name, literal)) = split_comparison(expr, "==") {
        let matches = context
            .get(name)
            .map(|value| value.to_string() == literal)
            .unwrap_or(false);
        return Ok(matches);
    }

    if let Some((name, literal)) = split_comparison(expr, "!=") {
        let matches = context
            .get(name)
            .map(|value| value.to_string() != literal)
            // An unresolved name is not equal to any literal.
            .unwrap_or(true);
        return Ok(matches);
    }

    if let Some(name) = expr.strip_prefix('!') {
        let truthy = context
            .get(name.trim())
            .map(AnswerValue::is_truthy)
            .unwrap_or(false);
        return Ok(!truthy);
    }

    if expr.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Ok(context
            .get(expr)
            .map(AnswerValue::is_truthy)
            .unwrap_or(false));
    }

    Err(Error::validation(
        "when",
        format!("unsupported predicate: {expr}"),
    ))
}

fn split_comparison<'a>(expr: &'a str, op: &str) -> Option<(&'a str, String)> {
    let (lhs, rhs) = expr.split_once(op)?;
    let name = lhs.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let rhs = rhs.trim();
    let literal = rhs
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| rhs.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(rhs);
    Some((name, literal.to_string()))
}

/// Derive a short identifier from a repository URL or path.
pub(crate) fn repo_slug(repository: &str) -> String {
    let trimmed = repository
        .trim_end_matches('/')
        .trim_end_matches(".git");
    let raw = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);

    let mut slug = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            'a'..='z' | '0'..='9' | '-' | '_' | '.' => slug.push(ch),
            'A'..='Z' => slug.push(ch.to_ascii_lowercase()),
            _ => slug.push('-'),
        }
    }

    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug
    }
}

/// The built-in questionnaire driven by `wpm add`.
///
/// When the repository is already known (positional argument or `--data`),
/// it seeds defaults for the id and destination so quiet mode can resolve
/// the whole set without prompting.
pub fn product_questions(repository: Option<&str>) -> Vec<QuestionSpec> {
    let slug = repository.map(repo_slug);

    let mut vcs_repo =
        QuestionSpec::new("vcs_repo", QuestionKind::Str).help("Git URL of the product repository");
    if let Some(repo) = repository {
        vcs_repo = vcs_repo.default_value(AnswerValue::Str(repo.to_string()));
    }

    let mut id = QuestionSpec::new("id", QuestionKind::Str).help("Unique product id");
    if let Some(slug) = &slug {
        id = id.default_value(AnswerValue::Str(slug.clone()));
    }

    let mut dst_path = QuestionSpec::new("dst_path", QuestionKind::Path)
        .help("Destination directory, relative to the workspace root");
    if let Some(slug) = &slug {
        dst_path = dst_path.default_value(AnswerValue::Path(PathBuf::from(format!(
            "products/{slug}"
        ))));
    }

    vec![
        vcs_repo,
        id,
        dst_path,
        QuestionSpec::new("vcs_ref", QuestionKind::Str)
            .help("Branch, tag, or commit to install")
            .default_value(AnswerValue::Str("main".to_string())),
        QuestionSpec::new("vcs_auth_type", QuestionKind::Choice)
            .help("How to authenticate against the repository")
            .choices(["skip", "token", "sshkey"])
            .default_value(AnswerValue::Choice("skip".to_string())),
        QuestionSpec::new("vcs_auth_token", QuestionKind::Str)
            .help("HTTPS auth token")
            .secret()
            .when("vcs_auth_type == 'token'"),
        QuestionSpec::new("vcs_auth_sshkeypath", QuestionKind::Path)
            .help("Absolute path to the SSH private key")
            .secret()
            .when("vcs_auth_type == 'sshkey'"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Prompt stub that replays queued raw answers.
    struct ScriptedPrompt {
        answers: std::cell::RefCell<Vec<String>>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: std::cell::RefCell::new(
                    answers.iter().rev().map(|s| s.to_string()).collect(),
                ),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn ask(&self, question: &QuestionSpec) -> Result<String> {
            self.answers
                .borrow_mut()
                .pop()
                .ok_or_else(|| Error::validation(&question.name, "no scripted answer left"))
        }

        fn confirm(&self, _message: &str, default: bool) -> Result<bool> {
            Ok(default)
        }

        fn select(&self, message: &str, _options: &[String]) -> Result<String> {
            Err(Error::validation(message, "select not scripted"))
        }
    }

    fn no_prompt() -> ScriptedPrompt {
        ScriptedPrompt::new(&[])
    }

    fn sample_questions() -> Vec<QuestionSpec> {
        vec![
            QuestionSpec::new("name", QuestionKind::Str)
                .default_value(AnswerValue::Str("A".to_string())),
            QuestionSpec::new("extra", QuestionKind::Str)
                .default_value(AnswerValue::Str("more".to_string()))
                .when("name == 'A'"),
        ]
    }

    #[test]
    fn defaults_mode_resolves_dependent_question() {
        let reconciled = reconcile(
            &sample_questions(),
            &BTreeMap::new(),
            true,
            &no_prompt(),
        )
        .unwrap();

        assert_eq!(
            reconciled.get("name"),
            Some(&AnswerValue::Str("A".to_string()))
        );
        assert_eq!(
            reconciled.get("extra"),
            Some(&AnswerValue::Str("more".to_string()))
        );
        assert!(reconciled.answers_to_remember().contains_key("extra"));
    }

    #[test]
    fn explicit_value_hides_dependent_question() {
        let provided = BTreeMap::from([("name".to_string(), "B".to_string())]);
        let reconciled = reconcile(&sample_questions(), &provided, true, &no_prompt()).unwrap();

        assert_eq!(
            reconciled.get("name"),
            Some(&AnswerValue::Str("B".to_string()))
        );
        assert!(reconciled.is_hidden("extra"));
        assert!(!reconciled.answers_to_remember().contains_key("extra"));
        // The default is still retained for context.
        assert_eq!(
            reconciled.get("extra"),
            Some(&AnswerValue::Str("more".to_string()))
        );
    }

    #[test]
    fn hidden_question_without_default_is_omitted() {
        let questions = vec![
            QuestionSpec::new("name", QuestionKind::Str)
                .default_value(AnswerValue::Str("B".to_string())),
            QuestionSpec::new("extra", QuestionKind::Str).when("name == 'A'"),
        ];

        let reconciled = reconcile(&questions, &BTreeMap::new(), true, &no_prompt()).unwrap();
        assert!(reconciled.get("extra").is_none());
        assert!(reconciled.is_hidden("extra"));
    }

    #[test]
    fn invalid_explicit_value_fails_fast() {
        let questions = vec![QuestionSpec::new("enabled", QuestionKind::Bool)];
        let provided = BTreeMap::from([("enabled".to_string(), "maybe".to_string())]);

        let err = reconcile(&questions, &provided, true, &no_prompt()).unwrap_err();
        assert!(matches!(err, Error::Validation { ref name, .. } if name == "enabled"));
    }

    #[test]
    fn missing_default_in_defaults_mode_fails() {
        let questions = vec![QuestionSpec::new("id", QuestionKind::Str)];
        let err = reconcile(&questions, &BTreeMap::new(), true, &no_prompt()).unwrap_err();
        assert!(matches!(err, Error::Validation { ref name, .. } if name == "id"));
    }

    #[test]
    fn interactive_answers_are_parsed_and_recorded() {
        let questions = vec![
            QuestionSpec::new("name", QuestionKind::Str),
            QuestionSpec::new("enabled", QuestionKind::Bool),
        ];
        let prompt = ScriptedPrompt::new(&["demo", "yes"]);

        let reconciled = reconcile(&questions, &BTreeMap::new(), false, &prompt).unwrap();
        assert_eq!(
            reconciled.get("name"),
            Some(&AnswerValue::Str("demo".to_string()))
        );
        assert_eq!(reconciled.get("enabled"), Some(&AnswerValue::Bool(true)));
    }

    #[test]
    fn secrets_are_split_from_remembered_answers() {
        let provided = BTreeMap::from([
            ("vcs_repo".to_string(), "https://example.com/acme.git".to_string()),
            ("vcs_auth_type".to_string(), "token".to_string()),
            ("vcs_auth_token".to_string(), "t0ps3cret".to_string()),
        ]);
        let questions = product_questions(Some("https://example.com/acme.git"));

        let reconciled = reconcile(&questions, &provided, true, &no_prompt()).unwrap();

        let remembered = reconciled.answers_to_remember();
        assert!(!remembered.contains_key("vcs_auth_token"));
        assert_eq!(
            remembered.get("vcs_auth_type"),
            Some(&AnswerValue::Choice("token".to_string()))
        );

        let secrets = reconciled.secrets();
        assert_eq!(
            secrets.get("vcs_auth_token"),
            Some(&AnswerValue::Str("t0ps3cret".to_string()))
        );
        assert!(!secrets.contains_key("vcs_auth_sshkeypath"));
    }

    #[rstest]
    #[case("yes", Some(true))]
    #[case("TRUE", Some(true))]
    #[case("0", Some(false))]
    #[case("no", Some(false))]
    #[case("maybe", None)]
    fn bool_parsing(#[case] raw: &str, #[case] expected: Option<bool>) {
        let parsed = AnswerValue::parse(raw, QuestionKind::Bool, &[]);
        match expected {
            Some(value) => assert_eq!(parsed, ParsedAnswer::Valid(AnswerValue::Bool(value))),
            None => assert!(matches!(parsed, ParsedAnswer::Invalid(_))),
        }
    }

    #[test]
    fn choice_parsing_validates_against_choices() {
        let choices = vec!["skip".to_string(), "token".to_string()];
        assert_eq!(
            AnswerValue::parse("token", QuestionKind::Choice, &choices),
            ParsedAnswer::Valid(AnswerValue::Choice("token".to_string()))
        );
        assert!(matches!(
            AnswerValue::parse("oauth", QuestionKind::Choice, &choices),
            ParsedAnswer::Invalid(_)
        ));
    }

    #[rstest]
    #[case("name == 'A'", true)]
    #[case("name == \"B\"", false)]
    #[case("name != 'B'", true)]
    #[case("missing == 'A'", false)]
    #[case("missing != 'A'", true)]
    #[case("name", true)]
    #[case("!name", false)]
    #[case("missing", false)]
    fn when_predicates(#[case] expr: &str, #[case] expected: bool) {
        let context = BTreeMap::from([("name".to_string(), AnswerValue::Str("A".to_string()))]);
        assert_eq!(eval_when(expr, &context).unwrap(), expected);
    }

    #[test]
    fn unsupported_predicate_is_a_validation_error() {
        assert!(eval_when("name ~= 'A'", &BTreeMap::new()).is_err());
    }

    #[rstest]
    #[case("https://github.com/acme/Dashboard.git", "dashboard")]
    #[case("https://example.com/acme/api/", "api")]
    #[case("git@github.com:acme/worker.git", "worker")]
    #[case("/srv/templates/base", "base")]
    fn repo_slugs(#[case] repository: &str, #[case] expected: &str) {
        assert_eq!(repo_slug(repository), expected);
    }
}
