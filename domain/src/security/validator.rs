//! Injection validator.
//!
//! Decides whether substituting a caller-supplied value into one placeholder
//! of a command template is safe. The decision is an ordered list of checks
//! sharing one signature; the first rejection wins and nothing later runs.
//!
//! | # | check | applies to |
//! |---|-------|------------|
//! | 1 | control characters | all |
//! | 2 | path traversal / absolute path / sensitive file | local execution or path parameters |
//! | 3 | response file `@path` | commands that expand response files |
//! | 4 | argument injection | arguments at the start of a word |
//! | 5 | SSRF | URL-shaped values |
//! | 6 | unquoted metacharacters | unquoted, shell or interpreter |
//! | 7 | quote breakout | quoted arguments |
//! | 8 | interpreter patterns | interpreters |
//! | 9 | script position | inline program text |
//!
//! Percent-decoded forms of the value are computed once up front and used
//! by the path and SSRF checks.
//!
//! The validator is pure: it never executes the value, performs no I/O and
//! holds no mutable state, so one instance can be shared across threads.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::command::{CommandProfile, InterpreterKind, Invocation, classify};
use super::env::{check_env_value, check_leading_flag};
use super::interpreter::find_pattern;
use super::path::{check_path, decoded_forms};
use super::quote::{QuoteContext, scan_to};
use super::url::{StaticUrlOracle, UrlSafetyOracle, url_candidate};
use super::verdict::{RejectKind, Rejection, Verdict};

/// Values longer than this are refused without inspection.
pub const MAX_VALUE_LEN: usize = 64 * 1024;

/// Characters a shell or interpreter re-parses in an unquoted word.
const UNQUOTED_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '\'', '"', '\\', '(', ')', '<', '>', '\n', '\t', ' ', '*', '?', '[',
    ']', '{', '}', '~',
];

const DOUBLE_QUOTE_BREAKOUT: &[char] = &['"', '`', '$', '\\'];

/// Shell builtins whose operands are run or re-parsed as commands.
const COMMAND_RUNNERS: &[&str] = &["eval", "exec", "command", "builtin", "source", "."];

/// Where the substituted value ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamRole {
    Argument,
    Environment,
}

/// Where the command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTarget {
    #[default]
    Local,
    Container,
}

/// Static facts about one placeholder, derived from configuration only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionSite {
    pub context: QuoteContext,
    pub profile: CommandProfile,
    pub role: ParamRole,
    pub target: ExecutionTarget,
    /// The argument is inline program text (`-c`, `-e`, awk program).
    pub script_position: bool,
    /// Nothing but quotes precedes the placeholder in its word.
    pub at_word_start: bool,
    /// The placeholder's word is the command name of a shell simple command.
    pub command_word: bool,
    /// The parameter is declared as a filesystem path.
    pub path_argument: bool,
    /// The placeholder sits inside a Python f-string literal.
    pub format_literal: bool,
    /// Environment value that the argument templates also expand.
    pub forwarded_to_args: bool,
}

impl SubstitutionSite {
    /// A placeholder in an argument, at the start of its word.
    pub fn argument(context: QuoteContext, profile: CommandProfile) -> Self {
        Self {
            context,
            profile,
            role: ParamRole::Argument,
            target: ExecutionTarget::Local,
            script_position: false,
            at_word_start: true,
            command_word: false,
            path_argument: false,
            format_literal: false,
            forwarded_to_args: false,
        }
    }

    /// A placeholder in an environment variable template.
    pub fn environment(profile: CommandProfile) -> Self {
        Self {
            role: ParamRole::Environment,
            at_word_start: false,
            ..Self::argument(QuoteContext::Unquoted, profile)
        }
    }

    /// Derive the site of the placeholder at byte `offset` of argument
    /// template `arg_index` of `invocation`.
    pub fn locate(template: &str, offset: usize, invocation: &Invocation, arg_index: usize) -> Self {
        let scan = scan_to(template, offset);
        let profile = invocation.profile.clone();
        let format_literal = scan.context != QuoteContext::Unquoted
            && profile
                .interpreter_kinds()
                .any(|k| k == InterpreterKind::Python)
            && scan
                .opened_at
                .is_some_and(|q| has_format_prefix(&template[..q]));

        Self {
            context: scan.context,
            at_word_start: scan.at_word_start,
            command_word: scan.at_command_word
                || scan.command_name.as_deref().is_some_and(runs_operands),
            script_position: invocation.is_script_argument(arg_index),
            format_literal,
            ..Self::argument(scan.context, profile)
        }
    }

    pub fn with_target(mut self, target: ExecutionTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_script_position(mut self, script_position: bool) -> Self {
        self.script_position = script_position;
        self
    }

    pub fn with_word_start(mut self, at_word_start: bool) -> Self {
        self.at_word_start = at_word_start;
        self
    }

    pub fn with_command_word(mut self, command_word: bool) -> Self {
        self.command_word = command_word;
        self
    }

    pub fn with_path_argument(mut self, path_argument: bool) -> Self {
        self.path_argument = path_argument;
        self
    }

    pub fn with_format_literal(mut self, format_literal: bool) -> Self {
        self.format_literal = format_literal;
        self
    }

    pub fn with_forwarded_to_args(mut self, forwarded: bool) -> Self {
        self.forwarded_to_args = forwarded;
        self
    }

    fn is_argument(&self) -> bool {
        self.role == ParamRole::Argument
    }

    fn reparses(&self) -> bool {
        self.profile.is_shell || self.profile.is_interpreter()
    }
}

/// False only for a plain binary that reads its operands as data.
fn runs_operands(name: &str) -> bool {
    COMMAND_RUNNERS.contains(&name) || name.contains('$') || !classify(name).is_plain()
}

/// `f'`, `rf"`, `Fr'` ... string prefixes.
fn has_format_prefix(before_quote: &str) -> bool {
    let prefix: String = before_quote
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    prefix.len() <= 2
        && prefix.contains('f')
        && prefix.chars().all(|c| matches!(c, 'f' | 'r'))
}

struct Candidate<'a> {
    value: &'a str,
    forms: Vec<String>,
    site: &'a SubstitutionSite,
    oracle: &'a dyn UrlSafetyOracle,
}

type Check = fn(&Candidate<'_>) -> Result<(), Rejection>;

/// The checks in the order they run.
const CHECKS: &[(&str, Check)] = &[
    ("control_characters", check_control_characters),
    ("path", check_path_shape),
    ("response_file", check_response_file),
    ("argument_injection", check_argument_injection),
    ("ssrf", check_ssrf),
    ("unquoted_metacharacters", check_unquoted_metacharacters),
    ("quote_breakout", check_quote_breakout),
    ("interpreter_patterns", check_interpreter_patterns),
    ("script_position", check_script_position),
];

/// Validates substitutions against a [`SubstitutionSite`].
#[derive(Clone)]
pub struct InjectionValidator {
    oracle: Arc<dyn UrlSafetyOracle>,
}

impl fmt::Debug for InjectionValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionValidator")
            .field("checks", &Self::check_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for InjectionValidator {
    fn default() -> Self {
        Self::new(Arc::new(StaticUrlOracle::default()))
    }
}

impl InjectionValidator {
    pub fn new(oracle: Arc<dyn UrlSafetyOracle>) -> Self {
        Self { oracle }
    }

    /// Names of the checks in execution order.
    pub fn check_names() -> impl Iterator<Item = &'static str> {
        CHECKS.iter().map(|(name, _)| *name)
    }

    pub fn validate(&self, value: &str, site: &SubstitutionSite) -> Verdict {
        if value.len() > MAX_VALUE_LEN {
            return Verdict::Reject(Rejection::new(
                RejectKind::SecurityRisk,
                format!("value exceeds {} bytes", MAX_VALUE_LEN),
            ));
        }
        let candidate = Candidate {
            value,
            forms: decoded_forms(value),
            site,
            oracle: self.oracle.as_ref(),
        };
        for (_, check) in CHECKS {
            if let Err(rejection) = check(&candidate) {
                return Verdict::Reject(rejection);
            }
        }
        Verdict::Allow
    }
}

fn check_control_characters(c: &Candidate<'_>) -> Result<(), Rejection> {
    if !c.site.is_argument() {
        return check_env_value(c.value);
    }
    let split_on_tab = c.site.context == QuoteContext::Unquoted && c.site.reparses();
    match c.value.chars().find(|ch| {
        (ch.is_control() && (*ch != '\t' || split_on_tab)) || matches!(ch, '\u{2028}' | '\u{2029}')
    }) {
        Some(ch) => Err(Rejection::new(
            RejectKind::ControlCharacter,
            format!("value contains {:?}", ch),
        )),
        None => Ok(()),
    }
}

fn check_path_shape(c: &Candidate<'_>) -> Result<(), Rejection> {
    if !c.site.is_argument() && !c.site.forwarded_to_args {
        return Ok(());
    }
    let container = c.site.target == ExecutionTarget::Container;
    if container && !c.site.path_argument {
        return Ok(());
    }
    check_path(c.value, &c.forms, container)
}

fn check_response_file(c: &Candidate<'_>) -> Result<(), Rejection> {
    if !c.site.is_argument() || !c.site.profile.supports_response_files {
        return Ok(());
    }
    let Some(path) = c.value.strip_prefix('@') else {
        return Ok(());
    };
    let container = c.site.target == ExecutionTarget::Container;
    check_path(path, &decoded_forms(path), container).map_err(|r| Rejection {
        kind: r.kind,
        detail: format!("{} in response file argument", r.detail),
    })
}

fn check_argument_injection(c: &Candidate<'_>) -> Result<(), Rejection> {
    match c.site.role {
        ParamRole::Environment if c.site.forwarded_to_args => check_leading_flag(c.value),
        ParamRole::Environment => Ok(()),
        ParamRole::Argument => {
            if !c.site.at_word_start {
                return Ok(());
            }
            let Some(first) = c.value.chars().next().filter(|ch| matches!(ch, '-' | '+')) else {
                return Ok(());
            };
            if is_numeric(&c.value[1..]) {
                return Ok(());
            }
            Err(Rejection::new(
                RejectKind::ArgumentInjection,
                format!("value starts with '{}' and would be read as an option", first),
            ))
        }
    }
}

/// Unsigned decimal number: `10`, `10.5`, `.5`, `1e3`.
fn is_numeric(rest: &str) -> bool {
    rest.starts_with(|ch: char| ch.is_ascii_digit() || ch == '.')
        && rest.parse::<f64>().is_ok_and(f64::is_finite)
}

fn check_ssrf(c: &Candidate<'_>) -> Result<(), Rejection> {
    for form in &c.forms {
        if let Some(url) = url_candidate(form) {
            c.oracle
                .check(&url)
                .map_err(|reason| Rejection::new(RejectKind::Ssrf, reason))?;
        }
    }
    Ok(())
}

fn check_unquoted_metacharacters(c: &Candidate<'_>) -> Result<(), Rejection> {
    if !c.site.is_argument() || c.site.context != QuoteContext::Unquoted || !c.site.reparses() {
        return Ok(());
    }
    match c.value.chars().find(|ch| UNQUOTED_METACHARACTERS.contains(ch)) {
        Some(ch) => Err(Rejection::new(
            RejectKind::ShellInjection,
            format!(
                "character {:?} is not allowed in an unquoted argument to '{}'",
                ch, c.site.profile.name
            ),
        )),
        None => Ok(()),
    }
}

fn check_quote_breakout(c: &Candidate<'_>) -> Result<(), Rejection> {
    if !c.site.is_argument() {
        return Ok(());
    }
    let found = match c.site.context {
        QuoteContext::Unquoted => None,
        QuoteContext::SingleQuoted => c.value.chars().find(|ch| *ch == '\''),
        QuoteContext::DoubleQuoted => c.value.chars().find(|ch| DOUBLE_QUOTE_BREAKOUT.contains(ch)),
    };
    match found {
        Some(ch) => Err(Rejection::new(
            RejectKind::ShellInjection,
            format!("character {:?} breaks out of the {} context", ch, c.site.context),
        )),
        None => Ok(()),
    }
}

fn check_interpreter_patterns(c: &Candidate<'_>) -> Result<(), Rejection> {
    if !c.site.is_argument() {
        return Ok(());
    }
    for kind in c.site.profile.interpreter_kinds().filter(|k| k.is_scripting()) {
        if let Some(found) = find_pattern(kind, c.value) {
            return Err(Rejection::new(RejectKind::InterpreterInjection(kind), found));
        }
        if c.site.script_position
            && let Some(ch) = c.value.chars().find(|ch| matches!(ch, '\'' | '"'))
        {
            return Err(Rejection::new(
                RejectKind::InterpreterInjection(kind),
                format!("{:?} would close the enclosing string literal", ch),
            ));
        }
        // A backslash escapes the closing quote of the literal, letting the
        // next placeholder in the same script land outside it.
        if c.site.script_position && c.value.contains('\\') {
            return Err(Rejection::new(
                RejectKind::InterpreterInjection(kind),
                "a backslash would escape the end of the enclosing string literal",
            ));
        }
        if kind == InterpreterKind::Python
            && c.site.format_literal
            && c.value.contains(['{', '}'])
        {
            return Err(Rejection::new(
                RejectKind::InterpreterInjection(kind),
                "braces inside an f-string are evaluated",
            ));
        }
    }
    Ok(())
}

fn check_script_position(c: &Candidate<'_>) -> Result<(), Rejection> {
    if !c.site.is_argument() || !c.site.script_position {
        return Ok(());
    }
    // Single quotes make the value a string literal, except where the shell
    // runs the quoted word itself as a command.
    let literal = c.site.context == QuoteContext::SingleQuoted
        && !(c.site.profile.is_shell && c.site.command_word);
    if !literal {
        return Err(Rejection::new(
            RejectKind::SecurityRisk,
            "template substitution is not allowed in interpreter script position",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::command::{classify, classify_invocation};
    use crate::security::url::SsrfPolicy;

    fn validator() -> InjectionValidator {
        InjectionValidator::default()
    }

    fn site(context: QuoteContext, command: &str) -> SubstitutionSite {
        SubstitutionSite::argument(context, classify(command))
    }

    fn detail(verdict: Verdict) -> String {
        match verdict {
            Verdict::Allow => panic!("expected rejection"),
            Verdict::Reject(r) => r.detail,
        }
    }

    /// Validate `value` for the first placeholder in `args`.
    fn check_template(command: &str, args: &[&str], value: &str) -> Verdict {
        let invocation = classify_invocation(command, args);
        let (index, offset) = args
            .iter()
            .enumerate()
            .find_map(|(i, a)| a.find("{{").map(|o| (i, o)))
            .expect("placeholder");
        let site = SubstitutionSite::locate(args[index], offset, &invocation, index);
        validator().validate(value, &site)
    }

    /// First rejection among every placeholder of `args`, filled from
    /// `params`; missing parameters render empty.
    fn check_all(command: &str, args: &[&str], params: &[(&str, &str)]) -> Option<Rejection> {
        let invocation = classify_invocation(command, args);
        for (index, arg) in args.iter().enumerate() {
            let template = crate::tool::ArgumentTemplate::parse(*arg).unwrap();
            for (name, offset) in template.placeholders() {
                let value = params.iter().find(|(n, _)| *n == name).map_or("", |(_, v)| *v);
                let site = SubstitutionSite::locate(arg, offset, &invocation, index);
                if let Verdict::Reject(r) = validator().validate(value, &site) {
                    return Some(r);
                }
            }
        }
        None
    }

    #[test]
    fn test_check_order_is_fixed() {
        let names: Vec<_> = InjectionValidator::check_names().collect();
        assert_eq!(names.first(), Some(&"control_characters"));
        assert_eq!(names.last(), Some(&"script_position"));
        assert_eq!(names.len(), 9);
    }

    #[test]
    fn test_plain_binary_allows_metacharacters() {
        for value in ["Law & Order", "a;b", "$(id)", "x | y", "`id`"] {
            assert!(
                validator().validate(value, &site(QuoteContext::Unquoted, "echo")).is_allowed(),
                "{value}"
            );
        }
    }

    #[test]
    fn test_shell_rejects_unquoted_metacharacters() {
        let v = check_template("bash", &["-c", "{{msg}}"], "echo hi; rm -rf /");
        assert!(detail(v).contains("shell injection detected"));
        for value in ["a;b", "a|b", "a&b", "`id`", "$(id)"] {
            let v = validator().validate(value, &site(QuoteContext::Unquoted, "sh"));
            assert!(detail(v).contains("shell injection detected"), "{value}");
        }
    }

    #[test]
    fn test_interpreter_rejects_unquoted_metacharacters() {
        let v = validator().validate("a;b", &site(QuoteContext::Unquoted, "python3"));
        assert!(detail(v).contains("shell injection detected"));
    }

    #[test]
    fn test_single_quoted_breakout() {
        assert!(check_template("echo", &["'{{msg}}'"], "Law & Order").is_allowed());
        let v = check_template("echo", &["'{{msg}}'"], "foo'bar");
        assert!(detail(v).contains("shell injection detected"));
    }

    #[test]
    fn test_double_quoted_breakout() {
        for value in ["a\"b", "`id`", "$HOME", "a\\b"] {
            let v = validator().validate(value, &site(QuoteContext::DoubleQuoted, "sh"));
            assert!(detail(v).contains("shell injection detected"), "{value}");
        }
        assert!(
            validator()
                .validate("it's fine", &site(QuoteContext::DoubleQuoted, "sh"))
                .is_allowed()
        );
    }

    #[test]
    fn test_argument_injection_numeric_exception() {
        let s = site(QuoteContext::Unquoted, "ls");
        assert!(detail(validator().validate("-la", &s)).contains("argument injection detected"));
        assert!(detail(validator().validate("--help", &s)).contains("argument injection detected"));
        assert!(detail(validator().validate("-inf", &s)).contains("argument injection detected"));
        assert!(detail(validator().validate("+x", &s)).contains("argument injection detected"));
        assert!(validator().validate("-10", &s).is_allowed());
        assert!(validator().validate("+10.5", &s).is_allowed());
        assert!(validator().validate("-.5", &s).is_allowed());
    }

    #[test]
    fn test_argument_injection_only_at_word_start() {
        assert!(check_template("grep", &["--regexp={{p}}"], "-v").is_allowed());
        let v = check_template("grep", &["'{{p}}'"], "-v");
        assert!(detail(v).contains("argument injection detected"));
    }

    #[test]
    fn test_path_traversal_encodings() {
        let s = site(QuoteContext::Unquoted, "cat");
        for value in ["..", "../foo", "%2e%2e", "%252e%252e"] {
            let v = validator().validate(value, &s);
            assert!(detail(v).contains("path traversal attempt detected"), "{value}");
        }
    }

    #[test]
    fn test_absolute_path_local_vs_container() {
        let local = site(QuoteContext::Unquoted, "cat");
        let v = validator().validate("/etc/passwd", &local);
        assert!(detail(v).contains("absolute path detected"));

        let container = local
            .clone()
            .with_target(ExecutionTarget::Container)
            .with_path_argument(true);
        assert!(validator().validate("/etc/passwd", &container).is_allowed());
        let v = validator().validate("../etc/passwd", &container);
        assert!(detail(v).contains("path traversal attempt detected"));
    }

    #[test]
    fn test_sensitive_file_blocked_locally() {
        let v = validator().validate("config/.env", &site(QuoteContext::Unquoted, "cat"));
        assert!(detail(v).contains("sensitive file"));
    }

    #[test]
    fn test_response_files() {
        for command in ["gcc", "curl"] {
            let s = site(QuoteContext::Unquoted, command);
            let v = validator().validate("@/etc/secret", &s);
            assert!(detail(v).contains("absolute path detected"), "{command}");
            let v = validator().validate("@../secret.txt", &s);
            assert!(detail(v).contains("path traversal attempt detected"), "{command}");
            assert!(validator().validate("@myhandle", &s).is_allowed(), "{command}");
        }
        // Commands that do not read response files take '@' literally.
        assert!(
            validator()
                .validate("@/etc/secret", &site(QuoteContext::Unquoted, "echo"))
                .is_allowed()
        );
    }

    #[test]
    fn test_ssrf_blocked() {
        let s = site(QuoteContext::Unquoted, "wget");
        for value in [
            "http://169.254.169.254/latest/meta-data",
            "http://localhost:8080/admin",
            "127.0.0.1",
            "gopher://example.com/",
            "http%3A%2F%2F127.0.0.1%2F",
        ] {
            let v = validator().validate(value, &s);
            assert!(detail(v).contains("SSRF attempt blocked"), "{value}");
        }
        assert!(validator().validate("https://example.com/page", &s).is_allowed());
    }

    #[test]
    fn test_ssrf_oracle_policy_is_used() {
        let oracle = StaticUrlOracle::new(SsrfPolicy {
            allow_loopback: true,
            ..SsrfPolicy::default()
        });
        let validator = InjectionValidator::new(Arc::new(oracle));
        let s = site(QuoteContext::Unquoted, "wget");
        assert!(validator.validate("http://127.0.0.1:3000/", &s).is_allowed());
    }

    #[test]
    fn test_interpreter_interpolation_inside_quotes() {
        let v = validator().validate(
            "#{system('echo pwned')}",
            &site(QuoteContext::DoubleQuoted, "ruby"),
        );
        assert!(detail(v).contains("ruby interpolation injection detected"));

        let v = validator().validate(
            "@{[system('echo x')]}",
            &site(QuoteContext::SingleQuoted, "perl"),
        );
        assert!(!v.is_allowed());
        let v = validator().validate(
            "@{[ system \"id\" ]}",
            &site(QuoteContext::SingleQuoted, "perl"),
        );
        assert!(detail(v).contains("perl interpolation injection detected"));

        let v = validator().validate(
            "BEGIN{print \"x\" | \"cat\"}",
            &site(QuoteContext::SingleQuoted, "awk"),
        );
        assert!(detail(v).contains("awk interpolation injection detected"));
    }

    #[test]
    fn test_interpreter_behind_wrapper() {
        let v = check_template("env", &["ruby", "script.rb", "\"{{x}}\""], "#{`id`}");
        assert!(!v.is_allowed());
        let v = check_template("nice", &["-n", "5", "perl", "x.pl", "'{{x}}'"], "qx{id}");
        assert!(detail(v).contains("perl interpolation injection detected"));
    }

    #[test]
    fn test_script_position_strict() {
        let v = check_template("python3", &["-c", "{{code}}"], "print(1)");
        assert!(!v.is_allowed());
        let v = check_template("python3", &["-c", "{{code}}"], "hello");
        assert!(detail(v).contains("template substitution is not allowed in interpreter script position"));
        let v = check_template("ruby", &["-e", "puts \"{{x}}\""], "hello");
        assert!(detail(v).contains("security risk"));
    }

    #[test]
    fn test_script_position_single_quoted_literal() {
        let args = ["-c", "print('{{x}}')"];
        assert!(check_template("python3", &args, "hello world").is_allowed());
        let v = check_template("python3", &args, "a\"b");
        assert!(detail(v).contains("python interpolation injection detected"));
        let v = check_template("python3", &args, "x'); import os; ('");
        assert!(!v.is_allowed());
    }

    #[test]
    fn test_backslash_cannot_escape_script_literal() {
        let payload = "\");__loader__.load_module(chr(111)+chr(115)).system(chr(105)+chr(100));#";
        let args = ["-c", "print('{{a}}', '{{b}}')"];
        let r = check_all("python3", &args, &[("a", "x\\"), ("b", payload)]).unwrap();
        assert_eq!(r.kind, RejectKind::InterpreterInjection(InterpreterKind::Python));
        assert!(r.detail.contains("backslash"));
        let r = check_all("python3", &args, &[("a", "x\\"), ("b", "plain")]).unwrap();
        assert!(r.detail.contains("backslash"));

        let ruby = ["-e", "puts '{{a}}' + '{{b}}'"];
        let r = check_all("ruby", &ruby, &[("a", "x\\"), ("b", "+ `id` + ")]).unwrap();
        assert!(r.detail.contains("ruby interpolation injection detected"));
        assert!(check_all("ruby", &ruby, &[("a", "hello"), ("b", "world")]).is_none());
    }

    #[test]
    fn test_single_quoted_shell_command_word() {
        let v = check_template("bash", &["-c", "'{{x}}'"], "reboot");
        assert!(detail(v).contains("template substitution is not allowed in interpreter script position"));
        let v = check_template("sh", &["-c", "echo ok; '{{x}}' now"], "reboot");
        assert!(!v.is_allowed());
        let v = check_template("bash", &["-c", "eval '{{x}}'"], "reboot");
        assert!(!v.is_allowed());
        let v = check_template("bash", &["-c", "sh -c '{{x}}'"], "reboot");
        assert!(!v.is_allowed());

        assert!(check_template("bash", &["-c", "echo '{{x}}'"], "hello").is_allowed());
        assert!(check_template("sh", &["-c", "printf '%s\\n' '{{x}}'"], "reboot").is_allowed());
    }

    #[test]
    fn test_schemeless_internal_hosts_blocked() {
        for value in [
            "localhost:8080/admin",
            "127.1",
            "0x7f000001",
            "2130706433",
            "metadata.google.internal/computeMetadata/v1/",
        ] {
            let v = check_template("curl", &["{{u}}"], value);
            assert!(detail(v).contains("SSRF attempt blocked"), "{value}");
        }
        for value in ["example.com/x", "notes.txt", "5", "0.5"] {
            assert!(check_template("curl", &["{{u}}"], value).is_allowed(), "{value}");
        }
    }

    #[test]
    fn test_python_format_string_braces() {
        let args = ["-c", "print(f'{{x}}')"];
        let v = check_template("python3", &args, "{x}");
        assert!(detail(v).contains("python interpolation injection detected"));
        assert!(check_template("python3", &["-c", "print('{{x}}')"], "{x}").is_allowed());
    }

    #[test]
    fn test_format_prefix_detection() {
        assert!(has_format_prefix("print(f"));
        assert!(has_format_prefix("x = rf"));
        assert!(has_format_prefix("Fr"));
        assert!(!has_format_prefix("print("));
        assert!(!has_format_prefix("elif"));
    }

    #[test]
    fn test_control_characters() {
        let v = validator().validate("a\nb", &site(QuoteContext::SingleQuoted, "echo"));
        assert!(detail(v).contains("control character detected"));
        let v = validator().validate("a\tb", &site(QuoteContext::Unquoted, "sh"));
        assert!(detail(v).contains("control character detected"));
        assert!(
            validator()
                .validate("a\tb", &site(QuoteContext::Unquoted, "echo"))
                .is_allowed()
        );
    }

    #[test]
    fn test_environment_role() {
        let profile = classify("bash");
        let s = SubstitutionSite::environment(profile.clone());
        assert!(validator().validate("plain value; with $meta", &s).is_allowed());
        assert!(validator().validate("--flag", &s).is_allowed());
        let v = validator().validate("LD_PRELOAD=/tmp/x.so", &s);
        assert!(detail(v).contains("environment variable injection detected"));
        let v = validator().validate("a\rb", &s);
        assert!(detail(v).contains("control character detected"));

        let forwarded = SubstitutionSite::environment(profile).with_forwarded_to_args(true);
        let v = validator().validate("--flag", &forwarded);
        assert!(detail(v).contains("argument injection detected"));
    }

    #[test]
    fn test_environment_values_skip_path_shape() {
        let profile = classify("printenv");
        let env = SubstitutionSite::environment(profile.clone());
        assert!(validator().validate("/opt/data", &env).is_allowed());
        assert!(validator().validate("../shared", &env).is_allowed());

        let forwarded = SubstitutionSite::environment(profile).with_forwarded_to_args(true);
        let v = validator().validate("/opt/data", &forwarded);
        assert!(detail(v).contains("absolute path detected"));
        let v = validator().validate("/opt/data", &site(QuoteContext::Unquoted, "printenv"));
        assert!(detail(v).contains("absolute path detected"));
    }

    #[test]
    fn test_oversized_value() {
        let big = "a".repeat(MAX_VALUE_LEN + 1);
        let v = validator().validate(&big, &site(QuoteContext::Unquoted, "echo"));
        assert!(detail(v).contains("security risk"));
    }

    #[test]
    fn test_opaque_command_is_strictest() {
        let v = check_template("{{cmd}}", &["{{x}}"], "hello world");
        assert!(!v.is_allowed());
    }
}
