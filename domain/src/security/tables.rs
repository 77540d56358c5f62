//! Static rule tables for command classification.
//!
//! Initialized once on first use and never mutated afterwards, so concurrent
//! readers need no synchronization.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use super::command::InterpreterKind;

/// Shells and commands that can run arbitrary shell commands on their own
/// (editors and pagers with `!cmd` escapes, `find -exec`, `ssh`, `sed`'s `e`).
pub(crate) static SHELL_COMMANDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // POSIX and friends
        "sh", "bash", "rbash", "dash", "ash", "zsh", "ksh", "mksh", "pdksh", "fish", "csh",
        "tcsh", "yash", "su",
        // Windows
        "cmd", "powershell", "pwsh",
        // Commands with shell escapes
        "vi", "vim", "nvim", "ex", "view", "less", "more", "man", "find", "ssh", "sed",
        "expect", "script", "ed", "gdb", "tmux", "screen",
    ]
    .into_iter()
    .collect()
});

/// Scripting interpreters keyed to their language family.
pub(crate) static INTERPRETERS: LazyLock<HashMap<&'static str, InterpreterKind>> =
    LazyLock::new(|| {
        use InterpreterKind::*;
        [
            ("ruby", Ruby),
            ("irb", Ruby),
            ("jruby", Ruby),
            ("python", Python),
            ("pythonw", Python),
            ("pypy", Python),
            ("ipython", Python),
            ("perl", Perl),
            ("php", Php),
            ("php-cgi", Php),
            ("node", Node),
            ("nodejs", Node),
            ("deno", Node),
            ("bun", Node),
            ("awk", Awk),
            ("gawk", Awk),
            ("mawk", Awk),
            ("nawk", Awk),
            ("busybox-awk", Awk),
            ("elixir", Elixir),
            ("iex", Elixir),
            ("erl", Elixir),
            ("escript", Elixir),
            ("sbcl", Lisp),
            ("clisp", Lisp),
            ("ecl", Lisp),
            ("guile", Lisp),
            ("racket", Lisp),
            ("clojure", Lisp),
            ("clj", Lisp),
            ("emacs", Lisp),
            ("java", Jvm),
            ("jshell", Jvm),
            ("groovy", Jvm),
            ("scala", Jvm),
            ("kotlin", Jvm),
            ("jrunscript", Jvm),
            ("jjs", Jvm),
            ("lua", Lua),
            ("luajit", Lua),
            ("texlua", Lua),
            ("gcc", Compiler),
            ("g++", Compiler),
            ("cc", Compiler),
            ("c++", Compiler),
            ("clang", Compiler),
            ("clang++", Compiler),
            ("rustc", Compiler),
            ("javac", Compiler),
            ("tclsh", Other),
            ("wish", Other),
            ("rscript", Other),
            ("r", Other),
            ("julia", Other),
            ("osascript", Other),
            ("dc", Other),
            ("bc", Other),
        ]
        .into_iter()
        .collect()
    });

/// Commands that expand `@file` arguments into additional arguments.
pub(crate) static RESPONSE_FILE_COMMANDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "gcc", "g++", "cc", "c++", "clang", "clang++", "ld", "lld", "rustc", "javac", "java",
        "curl", "cl", "link", "nvcc",
    ]
    .into_iter()
    .collect()
});

/// How a wrapper command locates the command it re-launches.
pub(crate) struct WrapperSpec {
    /// Flags that consume the next token as their value.
    pub value_flags: &'static [&'static str],
    /// Flags whose presence makes the wrapped command impossible to resolve
    /// statically (`env -S`, `sudo -s`).
    pub opaque_flags: &'static [&'static str],
    /// Positional operands that precede the wrapped command.
    pub operands: usize,
    /// Whether `NAME=value` tokens may precede the wrapped command.
    pub assignments: bool,
}

const fn wrapper(
    value_flags: &'static [&'static str],
    opaque_flags: &'static [&'static str],
    operands: usize,
    assignments: bool,
) -> WrapperSpec {
    WrapperSpec {
        value_flags,
        opaque_flags,
        operands,
        assignments,
    }
}

pub(crate) static WRAPPERS: LazyLock<HashMap<&'static str, WrapperSpec>> = LazyLock::new(|| {
    [
        (
            "env",
            wrapper(&["-u", "--unset", "-C", "--chdir"], &["-S", "--split-string"], 0, true),
        ),
        ("nice", wrapper(&["-n", "--adjustment"], &[], 0, false)),
        ("nohup", wrapper(&[], &[], 0, false)),
        (
            "sudo",
            wrapper(
                &["-u", "-g", "-C", "-D", "-h", "-p", "-U", "-r", "-t", "-T", "-R"],
                &["-s", "-i", "--shell", "--login", "-e", "--edit"],
                0,
                true,
            ),
        ),
        ("doas", wrapper(&["-u", "-C"], &["-s"], 0, false)),
        (
            "timeout",
            wrapper(&["-s", "--signal", "-k", "--kill-after"], &[], 1, false),
        ),
        ("time", wrapper(&["-f", "--format", "-o", "--output"], &[], 0, false)),
        ("stdbuf", wrapper(&["-i", "-o", "-e"], &[], 0, false)),
        ("ionice", wrapper(&["-c", "-n", "-p", "-P", "-u"], &[], 0, false)),
        ("chrt", wrapper(&[], &[], 1, false)),
        ("taskset", wrapper(&[], &[], 1, false)),
        ("chroot", wrapper(&["--userspec", "--groups"], &[], 1, false)),
        ("setsid", wrapper(&[], &[], 0, false)),
        ("flock", wrapper(&["-w", "--timeout", "-E", "--conflict-exit-code"], &["-c", "--command"], 1, false)),
        (
            "xargs",
            wrapper(
                &["-I", "-n", "-L", "-P", "-s", "-d", "-E", "-a", "--max-args", "--max-procs"],
                &[],
                0,
                false,
            ),
        ),
        ("exec", wrapper(&["-a"], &[], 0, false)),
        ("command", wrapper(&[], &[], 0, false)),
        ("builtin", wrapper(&[], &[], 0, false)),
        ("strace", wrapper(&["-e", "-o", "-p", "-s", "-u", "-E"], &[], 0, false)),
        ("ltrace", wrapper(&["-e", "-o", "-p", "-s", "-u"], &[], 0, false)),
        ("unbuffer", wrapper(&[], &[], 0, false)),
        ("watch", wrapper(&["-n", "--interval", "-d"], &[], 0, false)),
        ("busybox", wrapper(&[], &[], 0, false)),
        ("runuser", wrapper(&["-u", "-g", "-G"], &["-c", "--command"], 0, false)),
        ("nsenter", wrapper(&["-t", "--target"], &[], 0, false)),
        ("unshare", wrapper(&[], &[], 0, false)),
        ("firejail", wrapper(&[], &[], 0, false)),
    ]
    .into_iter()
    .collect()
});

/// Where a command reads inline program text from.
pub(crate) struct ScriptSpec {
    /// Flags whose value (next token, or attached remainder) is program text.
    pub inline_flags: &'static [&'static str],
    /// The first operand is program text unless a file flag was given
    /// (`awk`, `sed`).
    pub implicit_program: bool,
    /// Flags naming a program file, which disable `implicit_program`.
    pub file_flags: &'static [&'static str],
    /// Flags that consume the next token as a value.
    pub value_flags: &'static [&'static str],
    /// Every token after the inline flag is program text (`cmd /c`,
    /// `powershell -Command`).
    pub rest_is_script: bool,
    /// Every operand after this many leading operands is program text
    /// (`ssh host cmd...`).
    pub script_after_operands: Option<usize>,
    /// Flags are matched case-insensitively (`cmd /C`, `powershell -Command`).
    pub ignore_case: bool,
    /// The inline flag names a command to run rather than program text
    /// (`find -exec`).
    pub inline_is_command: bool,
}

const fn script(inline_flags: &'static [&'static str]) -> ScriptSpec {
    ScriptSpec {
        inline_flags,
        implicit_program: false,
        file_flags: &[],
        value_flags: &[],
        rest_is_script: false,
        script_after_operands: None,
        ignore_case: false,
        inline_is_command: false,
    }
}

pub(crate) static SCRIPT_SPECS: LazyLock<HashMap<&'static str, ScriptSpec>> = LazyLock::new(|| {
    let shell = || script(&["-c"]);
    [
        ("sh", shell()),
        ("bash", shell()),
        ("rbash", shell()),
        ("dash", shell()),
        ("ash", shell()),
        ("zsh", shell()),
        ("ksh", shell()),
        ("mksh", shell()),
        ("pdksh", shell()),
        ("fish", ScriptSpec { inline_flags: &["-c", "--command"], ..script(&[]) }),
        ("csh", shell()),
        ("tcsh", shell()),
        ("yash", shell()),
        ("su", ScriptSpec { inline_flags: &["-c", "--command"], ..script(&[]) }),
        ("cmd", ScriptSpec { inline_flags: &["/c", "/k", "/r"], rest_is_script: true, ignore_case: true, ..script(&[]) }),
        (
            "powershell",
            ScriptSpec {
                inline_flags: &["-command", "-c", "-encodedcommand", "-enc", "-e", "-ec"],
                rest_is_script: true,
                ignore_case: true,
                ..script(&[])
            },
        ),
        (
            "pwsh",
            ScriptSpec {
                inline_flags: &["-command", "-c", "-encodedcommand", "-enc", "-e", "-ec"],
                rest_is_script: true,
                ignore_case: true,
                ..script(&[])
            },
        ),
        (
            "ssh",
            ScriptSpec {
                value_flags: &[
                    "-p", "-i", "-l", "-o", "-F", "-J", "-L", "-R", "-D", "-b", "-c", "-e", "-m",
                    "-O", "-S", "-W", "-w", "-E", "-B", "-Q",
                ],
                script_after_operands: Some(1),
                ..script(&[])
            },
        ),
        ("vi", script(&["-c", "--cmd"])),
        ("vim", script(&["-c", "--cmd"])),
        ("nvim", script(&["-c", "--cmd"])),
        ("ex", script(&["-c", "--cmd"])),
        (
            "find",
            ScriptSpec {
                inline_is_command: true,
                ..script(&["-exec", "-execdir", "-ok", "-okdir"])
            },
        ),
        (
            "sed",
            ScriptSpec {
                inline_flags: &["-e", "--expression"],
                implicit_program: true,
                file_flags: &["-f", "--file"],
                value_flags: &["-l", "--line-length"],
                ..script(&[])
            },
        ),
        (
            "awk",
            ScriptSpec {
                inline_flags: &["-e", "--source"],
                implicit_program: true,
                file_flags: &["-f", "--file"],
                value_flags: &["-F", "-v", "--assign", "--field-separator"],
                ..script(&[])
            },
        ),
        ("python", script(&["-c"])),
        ("pythonw", script(&["-c"])),
        ("pypy", script(&["-c"])),
        ("ipython", script(&["-c"])),
        ("ruby", script(&["-e"])),
        ("jruby", script(&["-e"])),
        ("perl", script(&["-e", "-E"])),
        ("php", script(&["-r", "-B", "-R", "-E"])),
        ("node", script(&["-e", "--eval", "-p", "--print"])),
        ("nodejs", script(&["-e", "--eval", "-p", "--print"])),
        ("bun", script(&["-e", "--eval", "-p", "--print"])),
        ("deno", script(&["eval"])),
        ("elixir", script(&["-e", "--eval"])),
        ("iex", script(&["--eval"])),
        ("erl", script(&["-eval"])),
        ("sbcl", script(&["--eval"])),
        ("clisp", script(&["-x"])),
        ("ecl", script(&["-eval"])),
        ("guile", script(&["-c"])),
        ("racket", script(&["-e"])),
        ("clojure", script(&["-e"])),
        ("clj", script(&["-e"])),
        ("emacs", script(&["--eval"])),
        ("groovy", script(&["-e"])),
        ("scala", script(&["-e"])),
        ("jrunscript", script(&["-e"])),
        ("lua", script(&["-e"])),
        ("luajit", script(&["-e"])),
        ("texlua", script(&["-e"])),
        ("rscript", script(&["-e"])),
        ("r", script(&["-e"])),
        ("julia", script(&["-e", "--eval"])),
        ("osascript", script(&["-e"])),
        ("dc", script(&["-e"])),
    ]
    .into_iter()
    .collect()
});

/// Look up the script spec for a normalized command name.
///
/// `awk` variants share the `awk` spec.
pub(crate) fn script_spec(name: &str) -> Option<&'static ScriptSpec> {
    let key = match name {
        "gawk" | "mawk" | "nawk" | "busybox-awk" => "awk",
        other => other,
    };
    SCRIPT_SPECS.get(key)
}

/// Puts GNU sed into sandbox mode, which rejects the `e`, `r` and `w` commands.
pub(crate) const SED_SANDBOX_FLAG: &str = "--sandbox";
