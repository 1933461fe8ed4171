//! Command templates and their expansion into concrete invocations.

use std::fmt;

/// Marker substituted by each argument value unless configured otherwise.
pub const DEFAULT_PLACEHOLDER: &str = "%%%";

/// A command and its fixed arguments, possibly containing placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<String>,
    placeholder: String,
}

impl Template {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_placeholder(tokens, DEFAULT_PLACEHOLDER)
    }

    pub fn with_placeholder<I, S>(tokens: I, placeholder: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            placeholder: placeholder.to_string(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Resolve the template against one argument value.
    ///
    /// Every occurrence of the placeholder in every token is replaced. When no
    /// token carries the placeholder the value is appended as a trailing token.
    pub fn resolve(&self, value: &str) -> Invocation {
        let mut substituted = false;
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);

        for token in &self.tokens {
            if !self.placeholder.is_empty() && token.contains(&self.placeholder) {
                tokens.push(token.replace(&self.placeholder, value));
                substituted = true;
            } else {
                tokens.push(token.clone());
            }
        }

        if !substituted {
            tokens.push(value.to_string());
        }

        Invocation { tokens }
    }

    /// The template as-is, used when there are no argument values.
    pub fn bare(&self) -> Invocation {
        Invocation {
            tokens: self.tokens.clone(),
        }
    }
}

/// A fully resolved command line, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    tokens: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The command line wrapped in double quotes, as written to stats and logs.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

/// Expand a template over the argument values, one invocation per value.
///
/// An empty argument list yields the template itself as the only invocation.
pub fn build(template: &Template, args: &[String]) -> Vec<Invocation> {
    if args.is_empty() {
        return vec![template.bare()];
    }
    args.iter().map(|value| template.resolve(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_placeholder_substituted_everywhere() {
        let template = Template::new(["cp", "%%%.txt", "backup/%%%-%%%.txt"]);
        let out = build(&template, &args(&["a"]));
        assert_eq!(out, vec![Invocation::new(["cp", "a.txt", "backup/a-a.txt"])]);
    }

    #[test]
    fn test_value_appended_without_placeholder() {
        let template = Template::new(["ls", "-l"]);
        let out = build(&template, &args(&["/tmp", "/var"]));
        assert_eq!(
            out,
            vec![
                Invocation::new(["ls", "-l", "/tmp"]),
                Invocation::new(["ls", "-l", "/var"]),
            ]
        );
    }

    #[test]
    fn test_empty_args_yield_bare_template() {
        let template = Template::new(["echo", "%%%"]);
        let out = build(&template, &[]);
        assert_eq!(out, vec![Invocation::new(["echo", "%%%"])]);
    }

    #[test]
    fn test_empty_template_degrades_to_value_only() {
        let template = Template::new(Vec::<String>::new());
        assert_eq!(build(&template, &[]), vec![Invocation::new(Vec::<String>::new())]);
        assert_eq!(build(&template, &args(&["x"])), vec![Invocation::new(["x"])]);
    }

    #[test]
    fn test_value_is_literal_not_pattern() {
        let template = Template::new(["echo", "%%%"]);
        let out = build(&template, &args(&["$1 \\0 %%%"]));
        assert_eq!(out[0].tokens()[1], "$1 \\0 %%%");
    }

    #[test]
    fn test_custom_placeholder() {
        let template = Template::with_placeholder(["echo", "{}", "%%%"], "{}");
        let out = build(&template, &args(&["v"]));
        assert_eq!(out, vec![Invocation::new(["echo", "v", "%%%"])]);
    }

    #[test]
    fn test_quoted_rendering() {
        let inv = Invocation::new(["echo", "a b"]);
        assert_eq!(inv.to_string(), "echo a b");
        assert_eq!(inv.quoted(), "\"echo a b\"");
    }

    #[test]
    fn test_order_follows_arguments() {
        let template = Template::new(["echo"]);
        let values = args(&["3", "1", "2"]);
        let rendered: Vec<String> = build(&template, &values).iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["echo 3", "echo 1", "echo 2"]);
    }
}
