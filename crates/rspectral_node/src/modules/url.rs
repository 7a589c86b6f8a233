//! `url` shim: a WHATWG `URL` class backed by the `url` crate, plus the
//! file URL helpers.

use std::env;

use rquickjs::convert::Coerced;
use rquickjs::function::{Opt, This};
use rquickjs::{Ctx, Exception, Function, Object};
use url::Url;

use crate::js;
use crate::posix;
use crate::registry::{Installer, NativeModule, Registry, Require};

pub const MODULE_NAME: &str = "url";

const PATH_TO_FILE_URL_SOURCE: &str = r#"(function (URL, toFileHref) {
    return function pathToFileURL(path) {
        return new URL(toFileHref(String(path)));
    };
})"#;

pub fn installer() -> Installer {
    Installer::new(install)
}

fn install<'js>(ctx: &Ctx<'js>, registry: &Registry, require: &Require<'js>) -> rquickjs::Result<()> {
    registry.register_builtin(MODULE_NAME, NativeModule::new(load));
    let exports: Object = require.require(MODULE_NAME)?;
    let url: Function = exports.get("URL")?;
    ctx.globals().set("URL", url)
}

fn load<'js>(ctx: &Ctx<'js>, module: &Object<'js>, _require: &Function<'js>) -> rquickjs::Result<()> {
    let exports = js::exports(module)?;

    let init = Function::new(
        ctx.clone(),
        |ctx: Ctx<'js>, this: This<Object<'js>>, input: Coerced<String>, base: Opt<Coerced<String>>| {
            let parsed = parse(&input.0, base.0.as_ref().map(|b| b.0.as_str()))
                .map_err(|_| Exception::throw_type(&ctx, &format!("Invalid URL: {}", input.0)))?;
            assign(&this.0, &parsed)
        },
    )?;
    let constructor = js::constructor(ctx, "URL", init)?;
    let prototype: Object = constructor.get("prototype")?;
    for name in ["toString", "toJSON"] {
        prototype.set(
            name,
            Function::new(ctx.clone(), |this: This<Object<'js>>| this.0.get::<_, String>("href"))?
                .with_name(name)?,
        )?;
    }
    exports.set("URL", constructor.clone())?;

    exports.set(
        "fileURLToPath",
        Function::new(ctx.clone(), |ctx: Ctx<'js>, url: Coerced<String>| {
            file_url_to_path(&url.0).map_err(|message| Exception::throw_type(&ctx, &message))
        })?
        .with_name("fileURLToPath")?,
    )?;

    let to_file_href = Function::new(ctx.clone(), |ctx: Ctx<'js>, path: String| {
        file_href(&path).map_err(|message| Exception::throw_type(&ctx, &message))
    })?;
    let path_to_file_url: Function = js::glue(
        ctx,
        "node:url",
        PATH_TO_FILE_URL_SOURCE,
        (constructor, to_file_href),
    )?;
    exports.set("pathToFileURL", path_to_file_url)?;

    Ok(())
}

fn parse(input: &str, base: Option<&str>) -> Result<Url, url::ParseError> {
    match base {
        Some(base) => Url::parse(base)?.join(input),
        None => Url::parse(input),
    }
}

/// Copies the WHATWG components of `url` onto a guest `URL` instance.
fn assign<'js>(target: &Object<'js>, url: &Url) -> rquickjs::Result<()> {
    let port = url.port().map(|p| p.to_string()).unwrap_or_default();
    let hostname = url.host_str().unwrap_or_default();
    let host = if port.is_empty() {
        hostname.to_string()
    } else {
        format!("{hostname}:{port}")
    };

    target.set("href", url.as_str())?;
    target.set("protocol", format!("{}:", url.scheme()))?;
    target.set("username", url.username())?;
    target.set("password", url.password().unwrap_or_default())?;
    target.set("host", host)?;
    target.set("hostname", hostname)?;
    target.set("port", port)?;
    target.set("pathname", url.path())?;
    target.set("search", url.query().map(|q| format!("?{q}")).unwrap_or_default())?;
    target.set("hash", url.fragment().map(|f| format!("#{f}")).unwrap_or_default())?;
    target.set("origin", url.origin().ascii_serialization())?;
    Ok(())
}

/// Node's `url.fileURLToPath` for POSIX hosts.
pub fn file_url_to_path(input: &str) -> Result<String, String> {
    let url = Url::parse(input).map_err(|_| format!("Invalid URL: {input}"))?;
    if url.scheme() != "file" {
        return Err("The URL must be of scheme file".to_string());
    }
    url.to_file_path()
        .map(|path| path.to_string_lossy().into_owned())
        .map_err(|()| format!("File URL host must be \"localhost\" or empty: {input}"))
}

/// The `file:` href of `path`, resolved against the host current directory.
pub fn file_href(path: &str) -> Result<String, String> {
    let absolute = if posix::is_absolute(path) {
        posix::clean(path)
    } else {
        let cwd = env::current_dir().map_err(|e| e.to_string())?;
        let cwd = cwd.to_string_lossy().into_owned();
        posix::resolve(&[cwd.as_str(), path])
    };
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| format!("Invalid path: {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::with_modules;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case::href("new URL('https://example.com:8443/a/b?x=1#top').href", "https://example.com:8443/a/b?x=1#top")]
    #[case::components(
        "var u = new URL('https://example.com:8443/a/b?x=1#top'); [u.protocol, u.host, u.hostname, u.port, u.pathname, u.search, u.hash].join(' ')",
        "https: example.com:8443 example.com 8443 /a/b ?x=1 #top"
    )]
    #[case::relative_to_base("new URL('../c', 'https://example.com/a/b/').href", "https://example.com/a/c")]
    #[case::to_string("String(new URL('file:///work/openapi.yaml'))", "file:///work/openapi.yaml")]
    #[case::json("JSON.stringify({ u: new URL('https://example.com') })", r#"{"u":"https://example.com/"}"#)]
    #[case::file_url_to_path("require('node:url').fileURLToPath('file:///work/api%20spec.yaml')", "/work/api spec.yaml")]
    #[case::file_url_object("require('url').fileURLToPath(new URL('file:///work/x.yaml'))", "/work/x.yaml")]
    #[case::path_to_file_url("require('url').pathToFileURL('/work/a b.yaml').href", "file:///work/a%20b.yaml")]
    fn test_url(#[case] script: &str, #[case] expected: &str) {
        with_modules(&[installer()], |ctx, _require| {
            let result: String = ctx.eval(script).unwrap();
            assert_eq!(result, expected);
        });
    }

    #[test]
    fn test_invalid_url_throws_type_error() {
        with_modules(&[installer()], |ctx, _require| {
            let name: String = ctx
                .eval("(function () { try { new URL('not a url'); } catch (e) { return e.name; } })()")
                .unwrap();
            assert_eq!(name, "TypeError");
        });
    }

    #[test]
    fn test_file_url_to_path_rejects_other_schemes() {
        assert_eq!(
            file_url_to_path("https://example.com/a").unwrap_err(),
            "The URL must be of scheme file"
        );
    }
}
