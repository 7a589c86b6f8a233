//! `util` shim: `format`, `inspect`, `inherits`, `deprecate`, `promisify`.

use rquickjs::convert::Coerced;
use rquickjs::function::{Opt, Rest};
use rquickjs::{Ctx, Function, Object, Value};

use crate::js;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "util";

const PROMISIFY_SOURCE: &str = r#"(function () {
    return function promisify(original) {
        return function (...args) {
            return new Promise((resolve, reject) => {
                original.call(this, ...args, (err, value) => (err ? reject(err) : resolve(value)));
            });
        };
    };
})"#;

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    js::bind_global(ctx, require, MODULE_NAME, "util")
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    exports.set(
        "format",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
            format_values(&ctx, &args.0)
        })?
        .with_name("format")?,
    )?;
    exports.set(
        "inspect",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, value: Value<'js>, _options: Opt<Value<'js>>| {
            inspect(&ctx, &value)
        })?
        .with_name("inspect")?,
    )?;
    exports.set(
        "inherits",
        Function::new(ctx.clone(), inherits)?.with_name("inherits")?,
    )?;
    exports.set(
        "deprecate",
        Function::new(ctx.clone(), |original: Function<'js>, _message: Opt<Value<'js>>| original)?
            .with_name("deprecate")?,
    )?;
    let promisify: Function = js::glue(ctx, "node:util", PROMISIFY_SOURCE, ())?;
    exports.set("promisify", promisify)?;

    Ok(())
}

fn inherits<'js>(constructor: Object<'js>, super_constructor: Object<'js>) -> rquickjs::Result<()> {
    let prototype: Object = constructor.get("prototype")?;
    let super_prototype: Object = super_constructor.get("prototype")?;
    prototype.set_prototype(Some(&super_prototype))?;
    constructor.set("super_", super_constructor)
}

/// Node's `util.format`: printf-like substitution of `%s %d %i %f %j %o
/// %O %c %%`, remaining arguments appended with spaces.
pub fn format_values<'js>(ctx: &Ctx<'js>, args: &[Value<'js>]) -> rquickjs::Result<String> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(String::new());
    };
    let mut rest = rest.iter();
    let mut out = String::new();

    if let Some(template) = first.as_string() {
        let template = template.to_string()?;
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some(spec @ ('s' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O' | 'c')) => {
                    chars.next();
                    match rest.next() {
                        Some(value) => out.push_str(&placeholder(ctx, spec, value)?),
                        None => {
                            out.push('%');
                            out.push(spec);
                        }
                    }
                }
                _ => out.push('%'),
            }
        }
    } else {
        out.push_str(&inspect(ctx, first)?);
    }

    for value in rest {
        out.push(' ');
        out.push_str(&inspect(ctx, value)?);
    }

    Ok(out)
}

fn placeholder<'js>(ctx: &Ctx<'js>, spec: char, value: &Value<'js>) -> rquickjs::Result<String> {
    Ok(match spec {
        'd' | 'f' => format_number(value.get::<Coerced<f64>>()?.0),
        'i' => format_number(value.get::<Coerced<f64>>()?.0.trunc()),
        'j' => stringify(ctx, value)?,
        'c' => String::new(),
        _ => inspect(ctx, value)?,
    })
}

/// Renders a value the way `console.log` shows it, without colors or depth
/// handling: strings raw, objects as JSON, errors with their stack.
pub fn inspect<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> rquickjs::Result<String> {
    if let Some(object) = value.as_object() {
        if value.is_function() {
            let name: Option<String> = object.get("name").ok();
            return Ok(match name.filter(|n| !n.is_empty()) {
                Some(name) => format!("[Function: {name}]"),
                None => "[Function (anonymous)]".to_string(),
            });
        }

        let stack: Option<String> = object.get("stack").ok().flatten();
        let message: Option<String> = object.get("message").ok().flatten();
        if let (Some(stack), Some(_)) = (stack, message) {
            return Ok(format!("{}\n{}", js::to_display(value)?, stack.trim_end()));
        }
        return stringify(ctx, value);
    }

    js::to_display(value)
}

fn stringify<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> rquickjs::Result<String> {
    match ctx.json_stringify(value.clone()) {
        Ok(Some(json)) => json.to_string(),
        Ok(None) => Ok("undefined".to_string()),
        Err(_) => {
            // Circular structures throw inside JSON.stringify.
            let _ = ctx.catch();
            js::to_display(value)
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
