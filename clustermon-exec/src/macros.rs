//! `$name$` macro resolution (spec §4.10): an ordered list of scopes,
//! each either a flat name→value mapping or a callback, walked in order
//! until one answers. `vars`-style scopes are recursive: a resolved
//! value that itself contains macros is expanded again.

use std::collections::BTreeMap;

use clustermon_types::MacroValue;

use crate::error::ExecError;

const MAX_RECURSION_DEPTH: u32 = 15;

pub trait MacroScope: Send + Sync {
    fn resolve(&self, name: &str) -> Option<MacroValue>;

    /// Whether a value from this scope may itself contain macros that
    /// should be expanded once more (true for custom-variable scopes).
    fn is_recursive(&self) -> bool {
        false
    }
}

/// A flat, precomputed name→value mapping (e.g. `host.name`, `host.state`).
pub struct MapScope(pub BTreeMap<String, MacroValue>);

impl MacroScope for MapScope {
    fn resolve(&self, name: &str) -> Option<MacroValue> {
        self.0.get(name).cloned()
    }
}

/// A custom-variable bag; marked recursive per spec §4.10.
pub struct VarsScope(pub clustermon_types::VarsBag);

impl MacroScope for VarsScope {
    fn resolve(&self, name: &str) -> Option<MacroValue> {
        let stripped = name.strip_prefix("vars.").unwrap_or(name);
        self.0.get(stripped).cloned()
    }

    fn is_recursive(&self) -> bool {
        true
    }
}

/// Ordered resolver list (spec §4.10: "Resolution walks a resolver list
/// ... in order").
pub struct Resolver {
    scopes: Vec<Box<dyn MacroScope>>,
}

impl Resolver {
    pub fn new(scopes: Vec<Box<dyn MacroScope>>) -> Self {
        Resolver { scopes }
    }

    fn lookup(&self, name: &str) -> Option<(MacroValue, bool)> {
        for scope in &self.scopes {
            if let Some(value) = scope.resolve(name) {
                return Some((value, scope.is_recursive()));
            }
        }
        None
    }

    /// Expand every `$name$` token in `input`. `$$` escapes to a literal
    /// `$`. When `strict` an unknown macro is an error; otherwise it
    /// expands to the empty string with a logged warning (spec §4.10).
    pub fn resolve_string(&self, input: &str, strict: bool) -> Result<String, ExecError> {
        self.resolve_string_at_depth(input, strict, 0)
    }

    fn resolve_string_at_depth(&self, input: &str, strict: bool, depth: u32) -> Result<String, ExecError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        loop {
            let Some(dollar) = rest.find('$') else {
                out.push_str(rest);
                break;
            };
            out.push_str(&rest[..dollar]);
            rest = &rest[dollar..];

            if let Some(after) = rest.strip_prefix("$$") {
                out.push('$');
                rest = after;
                continue;
            }

            match rest[1..].find('$') {
                Some(rel_end) => {
                    let token = &rest[1..1 + rel_end];
                    let expanded = self.expand_token(token, strict, depth)?;
                    out.push_str(&expanded);
                    rest = &rest[1 + rel_end + 1..];
                }
                None => {
                    // Unterminated '$': treat literally rather than erroring,
                    // matching plugin output that isn't macro syntax at all.
                    out.push('$');
                    rest = &rest[1..];
                }
            }
        }
        Ok(out)
    }

    fn expand_token(&self, token: &str, strict: bool, depth: u32) -> Result<String, ExecError> {
        if depth >= MAX_RECURSION_DEPTH {
            return Err(ExecError::RecursionLimit(token.to_string()));
        }
        match self.lookup(token) {
            None => {
                if strict {
                    Err(ExecError::UnknownMacro(token.to_string()))
                } else {
                    tracing::warn!(macro_name = token, "unknown macro, expanding to empty string");
                    Ok(String::new())
                }
            }
            Some((value, recursive)) => {
                let rendered = value.render();
                if recursive && rendered.contains('$') {
                    self.resolve_string_at_depth(&rendered, strict, depth + 1)
                } else {
                    Ok(rendered)
                }
            }
        }
    }

    /// Resolve an argv list. An argument that is *exactly* one macro
    /// token resolving to an array is expanded element-wise into
    /// multiple arguments (spec §4.10); all other arguments are resolved
    /// as strings.
    pub fn resolve_argv(&self, argv: &[String], strict: bool) -> Result<Vec<String>, ExecError> {
        let mut out = Vec::with_capacity(argv.len());
        for arg in argv {
            if let Some(token) = whole_token(arg) {
                if let Some((MacroValue::Array(items), _)) = self.lookup(token) {
                    for item in items {
                        out.push(item.render());
                    }
                    continue;
                }
            }
            out.push(self.resolve_string(arg, strict)?);
        }
        Ok(out)
    }
}

fn whole_token(arg: &str) -> Option<&str> {
    let rest = arg.strip_prefix('$')?;
    let inner = rest.strip_suffix('$')?;
    if inner.contains('$') {
        None
    } else {
        Some(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustermon_types::VarsBag;

    fn resolver_with(host_name: &str) -> Resolver {
        let mut map = BTreeMap::new();
        map.insert("host.name".to_string(), MacroValue::String(host_name.to_string()));
        map.insert("host.address".to_string(), MacroValue::String("10.0.0.5".to_string()));
        let mut vars = VarsBag::new();
        vars.set("retries", MacroValue::Number(3.0));
        vars.set("greeting", MacroValue::String("hi $host.name$".to_string()));
        Resolver::new(vec![Box::new(MapScope(map)), Box::new(VarsScope(vars))])
    }

    #[test]
    fn resolves_simple_macro() {
        let r = resolver_with("web1");
        assert_eq!(r.resolve_string("check $host.name$ at $host.address$", false).unwrap(), "check web1 at 10.0.0.5");
    }

    #[test]
    fn dollar_dollar_escapes_to_literal_dollar() {
        let r = resolver_with("web1");
        assert_eq!(r.resolve_string("cost: $$5", false).unwrap(), "cost: $5");
    }

    #[test]
    fn unknown_macro_is_empty_when_lenient_and_errors_when_strict() {
        let r = resolver_with("web1");
        assert_eq!(r.resolve_string("$nonexistent$", false).unwrap(), "");
        assert!(r.resolve_string("$nonexistent$", true).is_err());
    }

    #[test]
    fn vars_scope_is_recursive() {
        let r = resolver_with("web1");
        assert_eq!(r.resolve_string("$vars.greeting$", false).unwrap(), "hi web1");
    }

    #[test]
    fn array_macro_expands_element_wise_in_argv() {
        let mut map = BTreeMap::new();
        map.insert(
            "host.addresses".to_string(),
            MacroValue::Array(vec![MacroValue::String("a".into()), MacroValue::String("b".into())]),
        );
        let r = Resolver::new(vec![Box::new(MapScope(map))]);
        let argv = vec!["check_multi".to_string(), "$host.addresses$".to_string()];
        assert_eq!(r.resolve_argv(&argv, false).unwrap(), vec!["check_multi", "a", "b"]);
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let mut vars = VarsBag::new();
        vars.set("a", MacroValue::String("$vars.a$".to_string()));
        let r = Resolver::new(vec![Box::new(VarsScope(vars))]);
        assert!(r.resolve_string("$vars.a$", true).is_err());
    }
}
