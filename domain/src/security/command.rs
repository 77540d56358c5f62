//! Command classifier.
//!
//! Maps an executable name to a [`CommandProfile`] and, for a full
//! invocation (`command` plus configured argument templates), resolves
//! wrapper commands and finds the argument slots that hold inline program
//! text.
//!
//! Wrappers (`env`, `nice`, `sudo`, ...) are followed up to
//! [`MAX_WRAPPER_DEPTH`] levels. Anything the classifier cannot resolve
//! statically, such as a placeholder in command position or `env -S`,
//! yields an opaque profile that downstream checks treat as the most
//! restrictive case.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::tables::{
    INTERPRETERS, RESPONSE_FILE_COMMANDS, SED_SANDBOX_FLAG, SHELL_COMMANDS, ScriptSpec, WRAPPERS,
    WrapperSpec, script_spec,
};
use super::verdict::{RejectKind, Rejection};

/// Wrapper recursion stops after this many levels.
pub const MAX_WRAPPER_DEPTH: usize = 3;

/// Language family of a scripting interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterKind {
    None,
    Ruby,
    Python,
    Perl,
    Php,
    Awk,
    Node,
    Elixir,
    Lisp,
    Jvm,
    Lua,
    Compiler,
    Other,
}

impl InterpreterKind {
    /// Lower-case language name used in rejection details.
    pub fn language(&self) -> &'static str {
        match self {
            InterpreterKind::None => "none",
            InterpreterKind::Ruby => "ruby",
            InterpreterKind::Python => "python",
            InterpreterKind::Perl => "perl",
            InterpreterKind::Php => "php",
            InterpreterKind::Awk => "awk",
            InterpreterKind::Node => "node",
            InterpreterKind::Elixir => "elixir",
            InterpreterKind::Lisp => "lisp",
            InterpreterKind::Jvm => "jvm",
            InterpreterKind::Lua => "lua",
            InterpreterKind::Compiler => "compiler",
            InterpreterKind::Other => "interpreter",
        }
    }

    /// True for kinds that evaluate program text at runtime.
    pub fn is_scripting(&self) -> bool {
        !matches!(self, InterpreterKind::None | InterpreterKind::Compiler)
    }
}

/// Classification of an executable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandProfile {
    /// Normalized executable name.
    pub name: String,
    pub is_shell: bool,
    pub interpreter_kind: InterpreterKind,
    pub supports_response_files: bool,
    pub is_wrapper: bool,
    /// Further interpreters found behind wrappers or inside shell scripts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embedded_interpreters: Vec<InterpreterKind>,
}

impl CommandProfile {
    /// Profile for a command that could not be resolved statically.
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_shell: true,
            interpreter_kind: InterpreterKind::Other,
            supports_response_files: true,
            is_wrapper: false,
            embedded_interpreters: Vec::new(),
        }
    }

    /// A binary that receives its arguments through argv and never re-parses
    /// them as code.
    pub fn is_plain(&self) -> bool {
        !self.is_shell && !self.is_interpreter() && !self.is_wrapper
    }

    pub fn is_interpreter(&self) -> bool {
        self.interpreter_kinds().any(|k| k.is_scripting())
    }

    /// Every interpreter kind this profile may hand values to.
    pub fn interpreter_kinds(&self) -> impl Iterator<Item = InterpreterKind> + '_ {
        std::iter::once(self.interpreter_kind)
            .chain(self.embedded_interpreters.iter().copied())
            .filter(|k| *k != InterpreterKind::None)
    }

    /// Combine with another profile, keeping the more restrictive value of
    /// every field. `name` and `is_wrapper` are left unchanged.
    pub fn restrict(mut self, other: &CommandProfile) -> Self {
        self.is_shell |= other.is_shell;
        self.supports_response_files |= other.supports_response_files;
        for kind in other.interpreter_kinds() {
            self.add_interpreter(kind);
        }
        self
    }

    fn add_interpreter(&mut self, kind: InterpreterKind) {
        if self.interpreter_kind == kind || self.embedded_interpreters.contains(&kind) {
            return;
        }
        if matches!(
            self.interpreter_kind,
            InterpreterKind::None | InterpreterKind::Compiler
        ) && kind.is_scripting()
        {
            let previous = std::mem::replace(&mut self.interpreter_kind, kind);
            if previous != InterpreterKind::None {
                self.embedded_interpreters.push(previous);
            }
        } else {
            self.embedded_interpreters.push(kind);
        }
    }
}

/// Normalize an executable name: strip directories and Windows extensions,
/// lower-case, then strip a trailing version suffix (`python3.11` -> `python`,
/// `gcc-12` -> `gcc`).
pub fn normalize(executable: &str) -> String {
    let base = executable
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(executable)
        .to_ascii_lowercase();

    let base = [".exe", ".cmd", ".bat", ".com"]
        .iter()
        .find_map(|ext| base.strip_suffix(ext))
        .map(str::to_string)
        .unwrap_or(base);

    let stripped = base.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    if stripped.len() == base.len() {
        return base;
    }
    let stripped = stripped.trim_end_matches(['-', '_']);
    if stripped.is_empty() || !base[stripped.len()..].chars().any(|c| c.is_ascii_digit()) {
        return base;
    }
    stripped.to_string()
}

/// Classify a single executable name.
pub fn classify(executable: &str) -> CommandProfile {
    let name = normalize(executable);
    let is_wrapper = WRAPPERS.contains_key(name.as_str());
    let interpreter_kind = INTERPRETERS
        .get(name.as_str())
        .copied()
        .unwrap_or(InterpreterKind::None);

    CommandProfile {
        is_shell: SHELL_COMMANDS.contains(name.as_str()) || is_wrapper,
        interpreter_kind,
        supports_response_files: RESPONSE_FILE_COMMANDS.contains(name.as_str()),
        is_wrapper,
        embedded_interpreters: Vec::new(),
        name,
    }
}

/// Classification of a complete invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Merged profile of the command and everything it wraps.
    pub profile: CommandProfile,
    /// Normalized name of the command that finally runs.
    pub effective: String,
    /// Wrapper commands in the order they were peeled off.
    pub wrappers: Vec<String>,
    /// Set when some part of the invocation could not be resolved.
    pub opaque: bool,
    script_args: BTreeSet<usize>,
}

impl Invocation {
    /// True when argument `index` is inline program text.
    pub fn is_script_argument(&self, index: usize) -> bool {
        self.script_args.contains(&index)
    }

    pub fn script_arguments(&self) -> impl Iterator<Item = usize> + '_ {
        self.script_args.iter().copied()
    }

    /// Sandbox flag to prepend to the arguments, if the effective command
    /// needs one.
    ///
    /// `sed` runs with `--sandbox` so its `e`, `r` and `w` commands are
    /// refused. Behind a wrapper the flag cannot be placed reliably, so the
    /// invocation is refused instead.
    pub fn sandbox_flag(&self) -> Result<Option<&'static str>, Rejection> {
        if self.effective != "sed" {
            return Ok(None);
        }
        match self.wrappers.last() {
            Some(wrapper) => Err(Rejection::new(
                RejectKind::SecurityRisk,
                format!(
                    "sed tool detected behind wrapper \"{}\"; execution blocked for security \
                     (sandbox cannot be enforced)",
                    wrapper
                ),
            )),
            None => Ok(Some(SED_SANDBOX_FLAG)),
        }
    }
}

/// Classify `command` together with its configured argument templates.
pub fn classify_invocation<S: AsRef<str>>(command: &str, args: &[S]) -> Invocation {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
    resolve(command, &args, 0, 0)
}

fn resolve(command: &str, args: &[&str], offset: usize, depth: usize) -> Invocation {
    if is_unresolvable_name(command) {
        return opaque_from(normalize(command), Vec::new(), offset, args.len());
    }

    let profile = classify(command);

    if let Some(spec) = WRAPPERS.get(profile.name.as_str()) {
        if depth >= MAX_WRAPPER_DEPTH {
            return opaque_from(profile.name, Vec::new(), offset, args.len());
        }
        return match wrapped_target(spec, args) {
            WrappedTarget::Absent => Invocation {
                effective: profile.name.clone(),
                profile,
                wrappers: Vec::new(),
                opaque: false,
                script_args: BTreeSet::new(),
            },
            WrappedTarget::Opaque(from) => opaque_from(
                profile.name.clone(),
                vec![profile.name],
                offset + from,
                args.len() - from,
            ),
            WrappedTarget::Found(i) => {
                let inner = resolve(args[i], &args[i + 1..], offset + i + 1, depth + 1);
                let mut wrappers = vec![profile.name.clone()];
                wrappers.extend(inner.wrappers.iter().cloned());
                let mut merged = profile.restrict(&inner.profile);
                merged.name = inner.profile.name.clone();
                Invocation {
                    profile: merged,
                    effective: inner.effective,
                    wrappers,
                    opaque: inner.opaque,
                    script_args: inner.script_args,
                }
            }
        };
    }

    let mut invocation = Invocation {
        effective: profile.name.clone(),
        profile,
        wrappers: Vec::new(),
        opaque: false,
        script_args: BTreeSet::new(),
    };

    let Some(spec) = script_spec(&invocation.effective) else {
        return invocation;
    };

    for pos in script_positions(spec, args) {
        invocation.script_args.insert(offset + pos);

        if depth >= MAX_WRAPPER_DEPTH {
            invocation.opaque = true;
            continue;
        }

        if spec.inline_is_command {
            let inner = resolve(args[pos], &args[pos + 1..], offset + pos + 1, depth + 1);
            invocation.profile = invocation.profile.restrict(&inner.profile);
            invocation.opaque |= inner.opaque;
            invocation.script_args.extend(inner.script_args);
        } else if invocation.profile.is_shell {
            for words in script_commands(args[pos]) {
                let Some((first, rest)) = words.split_first() else {
                    continue;
                };
                let inner = resolve(first, &rest.iter().map(String::as_str).collect::<Vec<_>>(), 0, depth + 1);
                invocation.profile = invocation.profile.restrict(&inner.profile);
                invocation.opaque |= inner.opaque;
            }
        }
    }

    invocation
}

fn opaque_from(name: String, wrappers: Vec<String>, from: usize, count: usize) -> Invocation {
    Invocation {
        profile: CommandProfile::opaque(name.clone()),
        effective: name,
        wrappers,
        opaque: true,
        script_args: (from..from + count).collect(),
    }
}

/// A command word that cannot be classified from the template alone.
fn is_unresolvable_name(word: &str) -> bool {
    let trimmed = word.trim();
    trimmed.is_empty()
        || trimmed.contains("{{")
        || trimmed.contains('$')
        || trimmed.contains('`')
        || trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
}

enum WrappedTarget {
    /// The wrapper runs nothing (`env` alone prints the environment).
    Absent,
    /// The wrapped command starts at this index.
    Found(usize),
    /// Cannot be determined; everything from this index on is suspect.
    Opaque(usize),
}

fn wrapped_target(spec: &WrapperSpec, args: &[&str]) -> WrappedTarget {
    let mut i = 0;
    let mut operands = 0;
    let mut end_of_flags = false;

    while i < args.len() {
        let tok = args[i];
        if tok.contains("{{") {
            return WrappedTarget::Opaque(i);
        }
        if !end_of_flags && tok == "--" {
            end_of_flags = true;
            i += 1;
            continue;
        }
        if !end_of_flags && tok.starts_with('-') && tok.len() > 1 {
            let flag = tok.split('=').next().unwrap_or(tok);
            if spec.opaque_flags.contains(&flag) {
                return WrappedTarget::Opaque(i);
            }
            if spec.value_flags.contains(&tok) {
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if spec.assignments && is_assignment(tok) {
            i += 1;
            continue;
        }
        if operands < spec.operands {
            operands += 1;
            i += 1;
            continue;
        }
        return pick_target(args, i);
    }
    WrappedTarget::Absent
}

/// Choose the wrapped command starting at `i`. When the token there is an
/// ordinary binary, a later shell or interpreter token is preferred: an
/// unrecognized value flag may have shifted the real command further right.
fn pick_target(args: &[&str], i: usize) -> WrappedTarget {
    if is_unresolvable_name(args[i]) {
        return WrappedTarget::Opaque(i);
    }
    if !classify(args[i]).is_plain() {
        return WrappedTarget::Found(i);
    }
    for (j, tok) in args.iter().enumerate().skip(i + 1) {
        if tok.contains("{{") {
            break;
        }
        if !tok.starts_with('-') && !classify(tok).is_plain() {
            return WrappedTarget::Found(j);
        }
    }
    WrappedTarget::Found(i)
}

fn is_assignment(tok: &str) -> bool {
    match tok.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Which tokens an inline flag marks as program text.
#[derive(Default)]
struct InlineMatch {
    /// The program text is attached to the flag token (`-cprint(1)`).
    this: bool,
    /// The program text is the following token.
    next: bool,
}

fn match_inline(spec: &ScriptSpec, tok: &str) -> Option<InlineMatch> {
    for flag in spec.inline_flags {
        if tok == *flag {
            return Some(InlineMatch { this: false, next: true });
        }
        let is_short = flag.len() == 2 && flag.starts_with('-');
        if !is_short {
            if tok.starts_with(&format!("{}=", flag)) {
                return Some(InlineMatch { this: true, next: false });
            }
            continue;
        }
        if !tok.starts_with('-') || tok.starts_with("--") || tok.len() <= 2 {
            continue;
        }
        let letter = flag.as_bytes()[1] as char;
        let body = &tok[1..];
        let cluster = body.chars().all(|c| c.is_ascii_alphabetic()) && body.contains(letter);
        let attached = tok.starts_with(*flag);
        if cluster || attached {
            // `-lc` is a cluster, `-cprint` carries the program. `-cx` can be
            // read both ways, so both tokens are marked.
            return Some(InlineMatch {
                this: attached && !body.ends_with(letter),
                next: cluster,
            });
        }
    }
    None
}

fn is_flag(spec: &ScriptSpec, tok: &str) -> bool {
    tok.len() > 1 && (tok.starts_with('-') || (spec.ignore_case && tok.starts_with('/')))
}

fn script_positions(spec: &ScriptSpec, args: &[&str]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut operands = 0;
    let mut file_given = false;
    let mut inline_given = false;
    let mut end_of_flags = false;
    let mut i = 0;

    while i < args.len() {
        let raw = args[i];
        let tok = if spec.ignore_case {
            raw.to_ascii_lowercase()
        } else {
            raw.to_string()
        };

        if !end_of_flags && tok == "--" {
            end_of_flags = true;
            i += 1;
            continue;
        }

        if !end_of_flags && let Some(m) = match_inline(spec, &tok) {
            inline_given = true;
            if m.this {
                positions.push(i);
            }
            let script_from = if m.next { i + 1 } else { i };
            if m.next && script_from < args.len() {
                positions.push(script_from);
            }
            if spec.rest_is_script {
                positions.extend(script_from + 1..args.len());
                break;
            }
            i = script_from + 1;
            continue;
        }

        if !end_of_flags && is_flag(spec, &tok) {
            if spec.file_flags.contains(&tok.as_str()) {
                file_given = true;
                i += 2;
            } else if spec.file_flags.iter().any(|f| f.len() == 2 && tok.starts_with(f)) {
                file_given = true;
                i += 1;
            } else if spec.value_flags.contains(&tok.as_str()) {
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }

        if spec.implicit_program && !file_given && !inline_given && operands == 0 {
            positions.push(i);
        }
        if let Some(n) = spec.script_after_operands
            && operands >= n
        {
            positions.push(i);
        }
        operands += 1;
        i += 1;
    }

    positions
}

/// Split shell program text into simple commands and return the words of
/// each, with quotes removed and leading assignments and keywords dropped.
fn script_commands(script: &str) -> Vec<Vec<String>> {
    const KEYWORDS: &[&str] = &[
        "if", "then", "else", "elif", "do", "while", "until", "for", "!", "{", "time",
    ];

    let mut commands = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = script.chars();

    fn finish_word(word: &mut String, in_word: &mut bool, words: &mut Vec<String>) {
        if *in_word {
            words.push(std::mem::take(word));
            *in_word = false;
        }
    }

    while let Some(c) = chars.next() {
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    word.push(c);
                }
            }
            Some(_) => match c {
                '"' => quote = None,
                '\\' => {
                    if let Some(next) = chars.next() {
                        word.push(next);
                    }
                }
                _ => word.push(c),
            },
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_word = true;
                }
                '\\' => {
                    in_word = true;
                    if let Some(next) = chars.next() {
                        word.push(next);
                    }
                }
                ' ' | '\t' => finish_word(&mut word, &mut in_word, &mut words),
                ';' | '|' | '&' | '\n' | '(' | ')' | '`' => {
                    finish_word(&mut word, &mut in_word, &mut words);
                    if !words.is_empty() {
                        commands.push(std::mem::take(&mut words));
                    }
                }
                _ => {
                    in_word = true;
                    word.push(c);
                }
            },
        }
    }
    finish_word(&mut word, &mut in_word, &mut words);
    if !words.is_empty() {
        commands.push(words);
    }

    commands
        .into_iter()
        .map(|cmd| {
            cmd.into_iter()
                .skip_while(|w| is_assignment(w) || KEYWORDS.contains(&w.as_str()))
                .collect::<Vec<_>>()
        })
        .filter(|cmd| !cmd.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_path_and_version() {
        assert_eq!(normalize("/usr/bin/python3.11"), "python");
        assert_eq!(normalize("python3"), "python");
        assert_eq!(normalize("C:\\Windows\\System32\\cmd.exe"), "cmd");
        assert_eq!(normalize("gcc-12"), "gcc");
        assert_eq!(normalize("Ruby"), "ruby");
        assert_eq!(normalize("lua5.4"), "lua");
        assert_eq!(normalize("g++"), "g++");
        assert_eq!(normalize("7z"), "7z");
    }

    #[test]
    fn test_classify_stable_under_version_suffix() {
        assert_eq!(classify("python3.12"), classify("python3"));
        assert_eq!(classify("python3"), classify("python"));
    }

    #[test]
    fn test_classify_categories() {
        let sh = classify("/bin/bash");
        assert!(sh.is_shell);
        assert_eq!(sh.interpreter_kind, InterpreterKind::None);

        let ruby = classify("ruby");
        assert_eq!(ruby.interpreter_kind, InterpreterKind::Ruby);
        assert!(ruby.is_interpreter());

        let gcc = classify("gcc");
        assert!(gcc.supports_response_files);
        assert!(!gcc.is_interpreter());

        let curl = classify("curl");
        assert!(curl.supports_response_files);
        assert!(curl.is_plain());

        let echo = classify("echo");
        assert!(echo.is_plain());

        let env = classify("env");
        assert!(env.is_wrapper);
        assert!(env.is_shell);
    }

    #[test]
    fn test_shell_dash_c_marks_script_argument() {
        let inv = classify_invocation("sh", &["-c", "echo {{msg}}"]);
        assert!(inv.is_script_argument(1));
        assert!(!inv.is_script_argument(0));

        let inv = classify_invocation("bash", &["-lc", "echo hi", "arg0"]);
        assert!(inv.is_script_argument(1));
        assert!(!inv.is_script_argument(2));

        let inv = classify_invocation("bash", &["script.sh", "{{x}}"]);
        assert_eq!(inv.script_arguments().count(), 0);
    }

    #[test]
    fn test_interpreter_inline_flags() {
        assert!(classify_invocation("python3", &["-c", "print(1)"]).is_script_argument(1));
        assert!(classify_invocation("perl", &["-ne", "print"]).is_script_argument(1));
        assert!(classify_invocation("ruby", &["-e", "puts 1"]).is_script_argument(1));
        assert!(classify_invocation("node", &["--eval=1+1"]).is_script_argument(0));
        assert!(classify_invocation("python", &["-cprint(1)"]).is_script_argument(0));
        assert!(!classify_invocation("python", &["script.py", "{{x}}"]).is_script_argument(1));
    }

    #[test]
    fn test_awk_implicit_program() {
        let inv = classify_invocation("awk", &["-F", ":", "{print $1}", "{{file}}"]);
        assert!(inv.is_script_argument(2));
        assert!(!inv.is_script_argument(3));

        let inv = classify_invocation("awk", &["-f", "prog.awk", "{{file}}"]);
        assert_eq!(inv.script_arguments().count(), 0);
    }

    #[test]
    fn test_cmd_rest_is_script() {
        let inv = classify_invocation("cmd.exe", &["/C", "echo", "{{x}}"]);
        assert!(inv.is_script_argument(1));
        assert!(inv.is_script_argument(2));
    }

    #[test]
    fn test_wrapper_resolves_interpreter() {
        let inv = classify_invocation("env", &["FOO=bar", "python3", "-c", "print('{{x}}')"]);
        assert_eq!(inv.effective, "python");
        assert_eq!(inv.wrappers, vec!["env".to_string()]);
        assert_eq!(inv.profile.interpreter_kind, InterpreterKind::Python);
        assert!(inv.profile.is_shell);
        assert!(inv.is_script_argument(3));
    }

    #[test]
    fn test_nested_wrappers() {
        let inv = classify_invocation("sudo", &["-u", "app", "nice", "-n", "5", "ruby", "-e", "x"]);
        assert_eq!(inv.effective, "ruby");
        assert_eq!(inv.wrappers, vec!["sudo".to_string(), "nice".to_string()]);
        assert!(inv.is_script_argument(7));
    }

    #[test]
    fn test_wrapper_depth_limit_is_fail_closed() {
        let inv = classify_invocation("env", &["env", "env", "env", "python", "-c", "x"]);
        assert!(inv.opaque);
        assert!(inv.profile.is_shell);
    }

    #[test]
    fn test_placeholder_in_command_position_is_opaque() {
        let inv = classify_invocation("env", &["{{cmd}}", "{{arg}}"]);
        assert!(inv.opaque);
        assert!(inv.is_script_argument(0));
        assert!(inv.is_script_argument(1));
    }

    #[test]
    fn test_env_split_string_is_opaque() {
        let inv = classify_invocation("env", &["-S", "python -c {{x}}"]);
        assert!(inv.opaque);
        assert!(inv.is_script_argument(1));
    }

    #[test]
    fn test_unknown_value_flag_does_not_hide_interpreter() {
        let inv = classify_invocation("timeout", &["--preserve-status", "--foreground", "10", "mytool", "python", "-c", "x"]);
        assert_eq!(inv.effective, "python");
    }

    #[test]
    fn test_shell_script_embedded_interpreter() {
        let inv = classify_invocation("sh", &["-c", "awk '{{script}}'"]);
        assert!(inv.profile.is_shell);
        assert_eq!(inv.profile.interpreter_kind, InterpreterKind::Awk);

        let inv = classify_invocation("bash", &["-c", "cat x | python3 -c '{{y}}'"]);
        assert!(inv.profile.interpreter_kinds().any(|k| k == InterpreterKind::Python));
    }

    #[test]
    fn test_find_exec_classifies_command() {
        let inv = classify_invocation("find", &[".", "-exec", "perl", "-e", "{{x}}", ";"]);
        assert!(inv.is_script_argument(2));
        assert!(inv.is_script_argument(4));
        assert!(inv.profile.interpreter_kinds().any(|k| k == InterpreterKind::Perl));
    }

    #[test]
    fn test_sed_sandbox_flag() {
        let direct = classify_invocation("sed", &["-e", "s/a/b/", "{{file}}"]);
        assert_eq!(direct.sandbox_flag().unwrap(), Some("--sandbox"));

        let wrapped = classify_invocation("env", &["sed", "-e", "s/a/b/", "{{file}}"]);
        let err = wrapped.sandbox_flag().unwrap_err();
        assert!(err.detail.contains("sed tool detected behind wrapper \"env\""));
        assert!(err.detail.contains("sandbox"));

        let plain = classify_invocation("echo", &["{{x}}"]);
        assert_eq!(plain.sandbox_flag().unwrap(), None);
    }

    #[test]
    fn test_restrict_keeps_all_interpreters() {
        let merged = classify("ruby").restrict(&classify("perl"));
        assert_eq!(merged.interpreter_kind, InterpreterKind::Ruby);
        assert_eq!(merged.embedded_interpreters, vec![InterpreterKind::Perl]);
    }
}
