//! Decide between fancy and plain output

use std::io::IsTerminal;

/// Environment variables set by common CI providers
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Set to force plain `[OK]` lines on a terminal
const PLAIN_VAR: &str = "SHELLCACHE_PLAIN";

/// How the CLI talks to the user
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
    auto_yes: bool,
}

impl UiContext {
    /// Inspect the terminal and environment
    pub fn detect() -> Self {
        Self {
            interactive: is_interactive_terminal(),
            auto_yes: false,
        }
    }

    /// Plain output, prompts answer with their default
    #[cfg(test)]
    pub(crate) fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    /// Approve every prompt without asking
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Spinners, colours and cliclack framing
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

fn is_interactive_terminal() -> bool {
    let tty = std::io::stdout().is_terminal() && std::io::stdin().is_terminal();
    interactive_from(tty, |var| std::env::var_os(var).is_some())
}

fn interactive_from(tty: bool, is_set: impl Fn(&str) -> bool) -> bool {
    tty && !is_set(PLAIN_VAR) && !CI_VARS.iter().any(|var| is_set(var))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_context() {
        let ctx = UiContext::non_interactive();
        assert!(!ctx.is_interactive());
        assert!(!ctx.use_fancy_output());
        assert!(!ctx.auto_yes());
    }

    #[test]
    fn plain_and_ci_variables_disable_fancy_output() {
        assert!(interactive_from(true, |_| false));
        assert!(!interactive_from(false, |_| false));
        assert!(!interactive_from(true, |var| var == "SHELLCACHE_PLAIN"));
        assert!(!interactive_from(true, |var| var == "GITHUB_ACTIONS"));
    }

    #[test]
    fn auto_yes_flag() {
        assert!(UiContext::non_interactive().with_auto_yes(true).auto_yes());
    }
}
