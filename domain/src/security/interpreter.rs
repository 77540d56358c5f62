//! Interpreter-level injection patterns.
//!
//! Shell quoting only protects a value until the shell hands it to the
//! interpreter. Ruby still expands `#{}` inside a string the shell treated
//! as single-quoted, Perl still runs `@{[ ]}`, AWK still pipes to commands.
//! These checks therefore run in every quoting context.
//!
//! Matching happens on a normalized copy of the value: lower-cased, with
//! whitespace runs collapsed to one space and whitespace before `(`
//! removed, so `system  (` and `SYSTEM\t(` both match `system(`.

use super::command::InterpreterKind;

/// Substrings rejected for each interpreter family.
fn patterns(kind: InterpreterKind) -> &'static [&'static str] {
    match kind {
        InterpreterKind::Ruby => &[
            "#{", "`", "%x(", "%x{", "%x[", "%x<", "%x|", "system(", "exec(", "spawn(", "eval(",
            "io.popen", "kernel.",
        ],
        InterpreterKind::Elixir => &[
            "#{", "`", "system.cmd", "system.shell", ":os.cmd", "port.open", "code.eval",
        ],
        InterpreterKind::Perl => &[
            "@{[", "${\\", "%x(", "`", "system(", "exec(", "eval(", "readpipe(",
        ],
        InterpreterKind::Php => &[
            "${", "{$", "`", "system(", "exec(", "passthru(", "shell_exec(", "popen(",
            "proc_open(", "pcntl_exec(", "eval(", "assert(", "include", "require",
        ],
        InterpreterKind::Python => &[
            "__import__(", "import ", "os.system(", "os.popen(", "subprocess", "exec(", "eval(",
            "compile(", "open(", "getattr(", "__builtins__", "__class__", "__globals__",
        ],
        InterpreterKind::Awk => &["system(", "getline", "|&", "print>", "printf>"],
        InterpreterKind::Node => &[
            "`", "${", "require(", "child_process", "import(", "eval(", "function(",
            "process.binding", "process.mainmodule", "deno.run", "deno.command", "bun.spawn",
        ],
        InterpreterKind::Lua => &[
            "os.execute(", "io.popen(", "loadstring(", "load(", "dofile(", "require(",
            "os.remove(",
        ],
        InterpreterKind::Lisp => &[
            "run-program", "uiop:", "sb-ext:", "ext:shell", "#.", "(shell", "(load", "(eval",
            "shell-command", "call-process",
        ],
        InterpreterKind::Jvm => &[
            "${", "runtime.getruntime", "processbuilder", ".execute(", "class.forname",
            "scriptengine",
        ],
        InterpreterKind::Other => &[
            "`", "$(", "exec ", "exec(", "system(", "open(", "do shell script",
        ],
        InterpreterKind::None | InterpreterKind::Compiler => &[],
    }
}

/// Lower-case, collapse whitespace runs to one space and drop whitespace
/// that directly precedes `(`.
pub fn normalize_for_matching(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for c in value.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && c != '(' && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.extend(c.to_lowercase());
    }
    if pending_space && !out.is_empty() {
        out.push(' ');
    }
    out
}

/// Find the first dangerous pattern for `kind` in `value`.
pub fn find_pattern(kind: InterpreterKind, value: &str) -> Option<String> {
    let normalized = normalize_for_matching(value);

    if let Some(p) = patterns(kind).iter().find(|p| normalized.contains(**p)) {
        return Some(format!("found '{}'", p));
    }

    match kind {
        InterpreterKind::Ruby | InterpreterKind::Perl => {
            if normalized.contains("open(") && normalized.contains('|') {
                return Some("found 'open(' with a pipe".to_string());
            }
            if kind == InterpreterKind::Perl && has_quote_operator(&normalized, "qx") {
                return Some("found 'qx' quote operator".to_string());
            }
        }
        InterpreterKind::Awk => {
            if pipe_to_command(&normalized) {
                return Some("found pipe to a command".to_string());
            }
            if redirect_to_file(&normalized) {
                return Some("found output redirection".to_string());
            }
        }
        _ => {}
    }
    None
}

/// `qx` followed by a delimiter: `qx(`, `qx{`, `qx/`, `qx!`, `qx '...'`.
fn has_quote_operator(normalized: &str, op: &str) -> bool {
    normalized.match_indices(op).any(|(i, _)| {
        let before_ok = normalized[..i]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric() && c != '_');
        let after = normalized[i + op.len()..].trim_start();
        let after_ok = after
            .chars()
            .next()
            .is_some_and(|c| !c.is_alphanumeric() && c != '_' && c != ',' && c != ';');
        before_ok && after_ok
    })
}

/// `| "cmd"` or `| cmd` in AWK program text.
fn pipe_to_command(normalized: &str) -> bool {
    normalized.match_indices('|').any(|(i, _)| {
        let rest = normalized[i + 1..].trim_start();
        if rest.starts_with('|') || normalized[..i].ends_with('|') {
            return false;
        }
        rest.starts_with('"') || rest.starts_with('\'') || rest.starts_with("getline")
    })
}

/// `print > "file"` style redirections.
fn redirect_to_file(normalized: &str) -> bool {
    normalized.match_indices('>').any(|(i, _)| {
        let rest = normalized[i + 1..].trim_start_matches('>').trim_start();
        rest.starts_with('"')
    })
}
