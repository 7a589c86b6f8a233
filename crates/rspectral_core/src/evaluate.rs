//! Translation of guest exceptions into host diagnostics.
//!
//! An [`EvaluateError`] is captured while the engine is alive and rendered
//! after it is gone. Enrichment is best effort: whatever cannot be
//! recovered (stack, frame, source line) degrades to the plain form.

use std::fmt;

use rquickjs::convert::Coerced;
use rquickjs::{Ctx, Value};
use rspectral_node::{LOADER_FUNCTION, REQUIRE_FILENAME, Registry, UNRESOLVED_MODULE_PROPERTY};

/// One parsed line of a QuickJS `stack` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub function: String,
    /// `None` for native frames.
    pub file: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl StackFrame {
    pub fn is_native(&self) -> bool {
        self.file.is_none()
    }

    /// Whether the frame belongs to `require` or its native loader. QuickJS
    /// omits native frames from `stack`, so the `require` wrapper is usually
    /// the innermost frame of a failed import.
    pub fn is_module_loader(&self) -> bool {
        match &self.file {
            Some(file) => file == REQUIRE_FILENAME,
            None => self.function == LOADER_FUNCTION,
        }
    }
}

/// Parses the `at <function> (<location>)` lines of a QuickJS stack.
pub fn parse_stack(stack: &str) -> Vec<StackFrame> {
    stack.lines().filter_map(parse_frame).collect()
}

fn parse_frame(line: &str) -> Option<StackFrame> {
    let rest = line.trim().strip_prefix("at ")?;

    let (function, location) = match rest.rfind(" (") {
        Some(open) if rest.ends_with(')') => (&rest[..open], &rest[open + 2..rest.len() - 1]),
        _ => ("<anonymous>", rest),
    };

    if location == "native" {
        return Some(StackFrame {
            function: function.to_string(),
            file: None,
            line: None,
            column: None,
        });
    }

    // `file:line:column` or `file:line`; the file itself may contain colons.
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let head = parts.next();
    let (file, line, column) = match (head, middle, last) {
        (Some(file), Some(line), Some(column)) if is_number(line) && is_number(column) => {
            (file.to_string(), line.parse().ok(), column.parse().ok())
        }
        (head, Some(file), Some(line)) if is_number(line) => {
            let file = match head {
                Some(head) => format!("{head}:{file}"),
                None => file.to_string(),
            };
            (file, line.parse().ok(), None)
        }
        _ => (location.to_string(), None, None),
    };

    Some(StackFrame {
        function: function.to_string(),
        file: Some(file),
        line,
        column,
    })
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Detail {
    /// A host failure, rendered as its message.
    Host(String),
    /// The first frame is the module loader and a module name was recorded.
    FailedImport(String),
    /// The source line of the first frame.
    Excerpt(String),
    Plain,
}

/// A guest exception (or host failure) raised while evaluating code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluateError {
    exception: String,
    stack: String,
    detail: Detail,
}

impl EvaluateError {
    /// Wraps a failure that did not originate from a guest exception.
    pub fn host(message: impl Into<String>) -> Self {
        Self {
            exception: String::new(),
            stack: String::new(),
            detail: Detail::Host(message.into()),
        }
    }

    /// Captures `error` from the engine. A pending guest exception is
    /// taken off the context.
    pub fn capture<'js>(ctx: &Ctx<'js>, registry: &Registry, error: rquickjs::Error) -> Self {
        if !error.is_exception() {
            return Self::host(error.to_string());
        }
        let thrown = ctx.catch();
        Self::from_thrown(registry, &thrown)
    }

    /// Builds the diagnostic for a thrown guest value.
    pub fn from_thrown<'js>(registry: &Registry, thrown: &Value<'js>) -> Self {
        let exception = thrown
            .get::<Coerced<String>>()
            .map(|s| s.0)
            .unwrap_or_else(|_| "<unprintable exception>".to_string());

        let object = thrown.as_object();
        let stack: String = object
            .and_then(|o| o.get::<_, Option<String>>("stack").ok().flatten())
            .unwrap_or_default();
        let unresolved: Option<String> = object
            .and_then(|o| o.get::<_, Option<String>>(UNRESOLVED_MODULE_PROPERTY).ok().flatten());

        let detail = match parse_stack(&stack).first() {
            Some(frame) if frame.is_module_loader() => {
                match unresolved {
                    Some(name) => Detail::FailedImport(name),
                    None => Detail::Plain,
                }
            }
            Some(StackFrame {
                file: Some(file),
                line: Some(line),
                ..
            }) => registry
                .source_line(file, *line)
                .map_or(Detail::Plain, Detail::Excerpt),
            _ => Detail::Plain,
        };

        Self {
            exception,
            stack: stack.trim_end().to_string(),
            detail,
        }
    }

    /// `String(exception)`, empty for host failures.
    pub fn exception(&self) -> &str {
        &self.exception
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// The module a failed `require` could not resolve.
    pub fn unresolved_module(&self) -> Option<&str> {
        match &self.detail {
            Detail::FailedImport(name) => Some(name),
            _ => None,
        }
    }

    /// The guest source line the exception was raised on.
    pub fn source_line(&self) -> Option<&str> {
        match &self.detail {
            Detail::Excerpt(line) => Some(line),
            _ => None,
        }
    }
}

impl fmt::Display for EvaluateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Detail::Host(message) => f.write_str(message),
            Detail::FailedImport(name) => write!(
                f,
                "{}\nfailed to import '{}'\n\n{}",
                self.exception, name, self.stack
            ),
            Detail::Excerpt(line) => write!(
                f,
                "{}\n...\n{}\n...\n\n{}",
                self.exception, line, self.stack
            ),
            Detail::Plain => write!(f, "{}\n{}", self.exception, self.stack),
        }
    }
}

impl std::error::Error for EvaluateError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rquickjs::{Context, Runtime};
    use rspectral_node::SourceLoader;
    use rstest::rstest;
    use std::rc::Rc;

    #[rstest]
    #[case::with_column(
        "    at parse (./dist/built.js:12:7)",
        StackFrame { function: "parse".into(), file: Some("./dist/built.js".into()), line: Some(12), column: Some(7) }
    )]
    #[case::without_column(
        "    at <eval> (script.js:3)",
        StackFrame { function: "<eval>".into(), file: Some("script.js".into()), line: Some(3), column: None }
    )]
    #[case::native(
        "    at load (native)",
        StackFrame { function: "load".into(), file: None, line: None, column: None }
    )]
    #[case::namespaced_file(
        "    at require (node:internal/require:10:19)",
        StackFrame { function: "require".into(), file: Some("node:internal/require".into()), line: Some(10), column: Some(19) }
    )]
    #[case::no_function(
        "    at ./dist/built.js:4",
        StackFrame { function: "<anonymous>".into(), file: Some("./dist/built.js".into()), line: Some(4), column: None }
    )]
    fn test_parse_frame(#[case] line: &str, #[case] expected: StackFrame) {
        assert_eq!(parse_stack(line), vec![expected]);
    }

    #[rstest]
    #[case::require_wrapper("    at require (node:internal/require:12:18)", true)]
    #[case::native_loader("    at load (native)", true)]
    #[case::other_native("    at map (native)", false)]
    #[case::bundle("    at load (./dist/built.js:3:1)", false)]
    fn test_module_loader_frame(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(parse_stack(line)[0].is_module_loader(), expected);
    }

    #[test]
    fn test_failed_import_from_require_frame() {
        let registry = Rc::new(Registry::new(SourceLoader::none()));
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let thrown: Value = ctx
                .eval(
                    r#"(function () {
                        var e = new Error("Cannot find module 'left-pad'");
                        e.moduleName = 'left-pad';
                        e.stack = '    at require (node:internal/require:12:18)\n    at <eval> (eval_script:1:1)\n';
                        return e;
                    })()"#,
                )
                .unwrap();
            let err = EvaluateError::from_thrown(&registry, &thrown);

            assert_eq!(err.unresolved_module(), Some("left-pad"));
            assert!(err.to_string().contains("\nfailed to import 'left-pad'\n\n    at require"));
        });
    }

    #[test]
    fn test_parse_stack_skips_other_lines() {
        let frames = parse_stack("Error: boom\n    at a (x.js:1)\n\n    at b (native)\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].function, "b");
    }

    #[test]
    fn test_host_error_renders_message() {
        let err = EvaluateError::host("out of memory");
        assert_eq!(err.to_string(), "out of memory");
        assert_eq!(err.exception(), "");
    }

    fn capture_script(registry: Rc<Registry>, script: &str) -> EvaluateError {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            rspectral_node::enable(&registry, &ctx).unwrap();
            let err = ctx.eval::<(), _>(script).unwrap_err();
            EvaluateError::capture(&ctx, &registry, err)
        })
    }

    #[test]
    fn test_failed_import() {
        let registry = Rc::new(Registry::new(SourceLoader::none()));
        let err = capture_script(registry, "require('left-pad')");

        assert_eq!(err.unresolved_module(), Some("left-pad"));
        assert!(
            err.to_string()
                .starts_with("Error: Cannot find module 'left-pad'\nfailed to import 'left-pad'\n\n")
        );
    }

    #[test]
    fn test_excerpt_from_recorded_source() {
        let registry = Rc::new(Registry::new(SourceLoader::new(|name| match name {
            "./dist/built.js" => Ok(b"var ok = 1;\nthrow new Error('bundle exploded');\n".to_vec()),
            _ => Err(std::io::Error::from(std::io::ErrorKind::NotFound)),
        })));
        let err = capture_script(registry, "require('./dist/built.js')");

        assert_eq!(err.source_line(), Some("throw new Error('bundle exploded');"));
        assert!(
            err.to_string()
                .starts_with("Error: bundle exploded\n...\nthrow new Error('bundle exploded');\n...\n\n")
        );
    }

    #[test]
    fn test_plain_exception() {
        let registry = Rc::new(Registry::new(SourceLoader::none()));
        let err = capture_script(registry, "throw 'just a string'");

        assert_eq!(err.to_string(), "just a string\n");
        assert_eq!(err.unresolved_module(), None);
        assert_eq!(err.source_line(), None);
    }
}
